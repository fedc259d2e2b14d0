//! The byte-transport capability the engine consumes. Byte transport itself
//! (serial port, pipe, TCP, loopback) is out of scope for this crate — the
//! host supplies an implementation of this trait.

use std::io::{self, Read, Write};

/// A non-blocking byte read/write pair. `read_available` must return
/// immediately with however many bytes are ready (possibly zero);
/// `write_all` is assumed to enqueue without blocking.
pub trait Transport {
    /// Reads as many bytes as are immediately available, up to `buf.len()`,
    /// and returns the count. Must not block.
    fn read_available(&mut self, buf: &mut [u8]) -> usize;

    /// Writes the full contents of `buf`. The engine always calls this with
    /// a complete packet or control byte, and treats it as atomic.
    fn write_all(&mut self, buf: &[u8]);
}

/// Adapts any blocking-with-timeout `Read + Write` (e.g. a `serialport`
/// handle configured with a short read timeout) to [`Transport`] by treating
/// a timed-out/would-block read as "zero bytes available now" rather than an
/// error, the way `TGMM-xymodem.rs`'s `get_byte_timeout` does.
pub struct IoTransport<T> {
    inner: T,
}

impl<T> IoTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> Transport for IoTransport<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        let mut total = 0;
        while total < buf.len() {
            match self.inner.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if is_timeout(&e) => break,
                Err(e) => {
                    log::warn!("transport read error: {}", e);
                    break;
                }
            }
        }
        total
    }

    fn write_all(&mut self, buf: &[u8]) {
        if let Err(e) = self.inner.write_all(buf) {
            log::warn!("transport write error: {}", e);
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
