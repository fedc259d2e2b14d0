//! Error type for the demo binary's fallible setup. The engine itself is
//! infallible (§7 of SPEC_FULL.md) — `read`/`write` are best-effort and every
//! protocol-level failure is a terminal `Event`, not a `Result`.

use thiserror::Error;

/// Errors that can occur while setting up the demo transfer (opening the
/// serial port, opening the file on disk).
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to open serial port: {0}")]
    Port(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer aborted the transfer")]
    PeerAborted,

    #[error("transfer timed out")]
    TimedOut,

    #[error("too many errors, transfer failed")]
    TooManyErrors,
}
