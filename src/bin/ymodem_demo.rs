//! Exercises the engine against a real serial port: `ymodem-demo send PORT BAUD FILE`
//! or `ymodem-demo recv PORT BAUD DEST_DIR`. Grounded on the teacher's own
//! `src/test.rs` smoke test and the original source's `YmodemFileReceive`/
//! `YmodemFileTransmit` Qt classes, translated to the pump model.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use ymodem_engine::{Config, DemoError, Decision, Engine, Event, Handler, IoTransport, Stage};

const TICK_TIMEOUT: Duration = Duration::from_millis(10);

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("ymodem-demo: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_default();
    let port_name = args.next().unwrap_or_else(|| "COM3".to_string());
    let baud: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(115200);

    let port = serialport::new(&port_name, baud)
        .timeout(TICK_TIMEOUT)
        .open()?;
    let transport = IoTransport::new(port);

    match mode.as_str() {
        "recv" => {
            let dest_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let handler = FileReceiveHandler::new(dest_dir);
            run_receive(Engine::new(transport, handler, Config::default()))
        }
        "send" => {
            let Some(path) = args.next() else {
                eprintln!("usage: ymodem-demo send <port> <baud> <file>");
                return Ok(());
            };
            let handler = FileSendHandler::open(&path)?;
            run_send(Engine::new(transport, handler, Config::default()))
        }
        other => {
            eprintln!("usage: ymodem-demo <send|recv> <port> <baud> <file|dest_dir>");
            eprintln!("unknown mode: {:?}", other);
            Ok(())
        }
    }
}

fn run_receive<T: ymodem_engine::Transport>(mut engine: Engine<T, FileReceiveHandler>) -> Result<(), DemoError> {
    info!("waiting for sender...");
    pump_to_completion(&mut engine, Engine::pump_receive);
    Ok(())
}

fn run_send<T: ymodem_engine::Transport>(mut engine: Engine<T, FileSendHandler>) -> Result<(), DemoError> {
    info!("waiting for receiver...");
    pump_to_completion(&mut engine, Engine::pump_transmit);
    Ok(())
}

fn pump_to_completion<T: ymodem_engine::Transport, H: Handler>(
    engine: &mut Engine<T, H>,
    pump: fn(&mut Engine<T, H>),
) {
    let mut started = false;
    loop {
        pump(engine);
        if engine.stage() != Stage::None {
            started = true;
        } else if started {
            break;
        }
    }
}

/// Writes incoming blocks straight to a file created from the block-0 header.
struct FileReceiveHandler {
    dest_dir: PathBuf,
    file: Option<File>,
    remaining: u64,
}

impl FileReceiveHandler {
    fn new(dest_dir: PathBuf) -> Self {
        Self { dest_dir, file: None, remaining: 0 }
    }
}

fn parse_header(payload: &[u8]) -> Option<(String, u64)> {
    let nul = payload.iter().position(|&b| b == 0)?;
    let name = String::from_utf8_lossy(&payload[..nul]).into_owned();
    if name.is_empty() {
        return None;
    }
    let rest = &payload[nul + 1..];
    let size_end = rest.iter().position(|&b| b == b' ' || b == 0).unwrap_or(rest.len());
    let size_str = String::from_utf8_lossy(&rest[..size_end]);
    let size = size_str.trim().parse().ok()?;
    Some((name, size))
}

impl Handler for FileReceiveHandler {
    fn on_event(&mut self, event: Event<'_>) -> Decision {
        match event {
            Event::Establish { payload, .. } => match parse_header(payload) {
                Some((name, size)) => match File::create(self.dest_dir.join(&name)) {
                    Ok(f) => {
                        info!("receiving {} ({} bytes)", name, size);
                        self.file = Some(f);
                        self.remaining = size;
                        Decision::Ack
                    }
                    Err(e) => {
                        warn!("failed to create {}: {}", name, e);
                        Decision::Cancel
                    }
                },
                None => {
                    warn!("malformed block-0 header");
                    Decision::Cancel
                }
            },
            Event::Transmit { payload, len } => {
                let take = (*len as u64).min(self.remaining) as usize;
                match self.file.as_mut() {
                    Some(f) if f.write_all(&payload[..take]).is_ok() => {
                        self.remaining -= take as u64;
                        Decision::Ack
                    }
                    _ => Decision::Cancel,
                }
            }
            Event::Finish => {
                info!("file received");
                Decision::Ack
            }
            Event::Abort => {
                warn!("peer cancelled the transfer");
                Decision::Cancel
            }
            Event::Timeout => {
                warn!("receive timed out");
                Decision::Cancel
            }
            Event::Error => {
                warn!("too many errors, receive failed");
                Decision::Cancel
            }
        }
    }
}

/// Streams a single file's header and contents out to the sender engine.
struct FileSendHandler {
    name: String,
    size: u64,
    file: File,
}

impl FileSendHandler {
    fn open(path: &str) -> Result<Self, DemoError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = PathBuf::from(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        Ok(Self { name, size, file })
    }
}

impl Handler for FileSendHandler {
    fn on_event(&mut self, event: Event<'_>) -> Decision {
        match event {
            Event::Establish { payload, len } => {
                let header = format!("{}\0{}", self.name, self.size);
                let bytes = header.as_bytes();
                let n = bytes.len().min(payload.len());
                payload[..n].copy_from_slice(&bytes[..n]);
                *len = payload.len();
                Decision::Ack
            }
            Event::Transmit { payload, len } => {
                let mut total = 0;
                loop {
                    match self.file.read(&mut payload[total..]) {
                        Ok(0) => break,
                        Ok(n) => total += n,
                        Err(e) => {
                            warn!("read error: {}", e);
                            return Decision::Cancel;
                        }
                    }
                    if total == payload.len() {
                        break;
                    }
                }
                *len = total;
                if total == 0 {
                    Decision::Eot
                } else {
                    Decision::Ack
                }
            }
            Event::Finish => {
                info!("send complete");
                Decision::Ack
            }
            Event::Abort => {
                warn!("peer cancelled the transfer");
                Decision::Cancel
            }
            Event::Timeout => {
                warn!("send timed out");
                Decision::Cancel
            }
            Event::Error => {
                warn!("too many errors, send failed");
                Decision::Cancel
            }
        }
    }
}
