use std::collections::VecDeque;

use ymodem_engine::{Decision, Event, Handler, Transport};

/// An in-memory `Transport` fed a fixed byte script and recording every
/// write, mirroring `awelkie-xmodem.rs`'s loopback test transport but driven
/// one pump at a time instead of on its own thread — this engine's tick
/// model depends on partial reads being observable between pumps.
pub struct ScriptedTransport {
    inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self { inbound: VecDeque::new(), outbound: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }
}

impl Transport for ScriptedTransport {
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn write_all(&mut self, buf: &[u8]) {
        self.outbound.extend_from_slice(buf);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Establish(Vec<u8>),
    Transmit(Vec<u8>),
    Finish,
    Abort,
    Timeout,
    Error,
}

/// Records every callback invocation; `decision` controls what it returns
/// for `Establish`/`Transmit`.
pub struct RecordingHandler {
    pub events: Vec<Recorded>,
    pub decision: Decision,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self { events: Vec::new(), decision: Decision::Ack }
    }
}

impl Handler for RecordingHandler {
    fn on_event(&mut self, event: Event<'_>) -> Decision {
        match event {
            Event::Establish { payload, len } => {
                self.events.push(Recorded::Establish(payload[..*len].to_vec()));
                self.decision
            }
            Event::Transmit { payload, len } => {
                self.events.push(Recorded::Transmit(payload[..*len].to_vec()));
                self.decision
            }
            Event::Finish => {
                self.events.push(Recorded::Finish);
                self.decision
            }
            Event::Abort => {
                self.events.push(Recorded::Abort);
                self.decision
            }
            Event::Timeout => {
                self.events.push(Recorded::Timeout);
                self.decision
            }
            Event::Error => {
                self.events.push(Recorded::Error);
                self.decision
            }
        }
    }
}

/// A sender-side handler that serves a fixed in-memory file.
pub struct FileHandler {
    pub header: Vec<u8>,
    pub data: Vec<u8>,
    offset: usize,
    pub finished: bool,
}

impl FileHandler {
    pub fn new(name: &str, size: usize, data: Vec<u8>) -> Self {
        Self {
            header: format!("{}\0{}", name, size).into_bytes(),
            data,
            offset: 0,
            finished: false,
        }
    }
}

impl Handler for FileHandler {
    fn on_event(&mut self, event: Event<'_>) -> Decision {
        match event {
            Event::Establish { payload, len } => {
                let n = self.header.len().min(payload.len());
                payload[..n].copy_from_slice(&self.header[..n]);
                *len = payload.len();
                Decision::Ack
            }
            Event::Transmit { payload, len } => {
                let remaining = self.data.len() - self.offset;
                let n = remaining.min(payload.len());
                payload[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
                self.offset += n;
                *len = n;
                if n == 0 {
                    Decision::Eot
                } else {
                    Decision::Ack
                }
            }
            Event::Finish => {
                self.finished = true;
                Decision::Ack
            }
            _ => Decision::Cancel,
        }
    }
}
