//! The application callback contract: the engine calls into a `Handler`
//! synchronously from within `pump_receive`/`pump_transmit` to deliver
//! progress and terminal events, and to fetch or accept payload bytes.

/// An event delivered to the application. `Establish` and `Transmit` borrow
/// directly into the engine's own packet buffer so that handling them never
/// requires the engine itself to allocate.
pub enum Event<'a> {
    /// Receiver: a block-0 header has arrived and should be parsed.
    /// Sender: the engine needs the header written into `payload[..*len]`.
    Establish { payload: &'a mut [u8], len: &'a mut usize },
    /// Receiver: a data block has arrived in `payload[..*len]`.
    /// Sender: the engine needs the next data chunk written into `payload`,
    /// with `*len` set to how much was written (0 is valid for an empty file).
    Transmit { payload: &'a mut [u8], len: &'a mut usize },
    /// The transfer completed successfully.
    Finish,
    /// The peer cancelled the transfer (CAN, or 0x41/0x61).
    Abort,
    /// No progress for too many ticks.
    Timeout,
    /// Too many rejected packets in a row.
    Error,
}

/// The application's response to an [`Event`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Accept/proceed (receiver: keep the block; sender: data is ready).
    Ack,
    /// Sender only, in response to `Transmit`: no more data, begin closing.
    Eot,
    /// Refuse. Any value other than `Ack`/`Eot` is treated as this.
    Cancel,
}

/// The application side of the engine. Invoked synchronously from within a
/// pump call; implementations must not call back into `pump_receive`,
/// `pump_transmit`, or `abort` on the same engine from inside `on_event`.
pub trait Handler {
    fn on_event(&mut self, event: Event<'_>) -> Decision;
}
