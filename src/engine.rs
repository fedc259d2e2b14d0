//! The shared data model and top-level dispatch for both state machines.

use crate::consts::{Config, BUFFER_SIZE, PACKET_HEADER};
use crate::event::{Decision, Event, Handler};
use crate::frame::Framer;
use crate::packet::build_can_storm;
use crate::stage::Stage;
use crate::timing::RetryClock;
use crate::transport::Transport;
use log::{debug, info};

/// A YMODEM protocol engine. Owns its rx/tx buffers and all transfer state;
/// the host supplies a [`Transport`] and a [`Handler`] at construction and
/// then drives the engine with `pump_receive`/`pump_transmit` on a fixed
/// cadence (≈10 ms is the reference interval).
///
/// A given instance represents one role at a time: call either
/// `pump_receive` or `pump_transmit` for its whole lifetime, not both.
pub struct Engine<T, H> {
    pub(crate) transport: T,
    pub(crate) handler: H,
    pub(crate) config: Config,

    pub(crate) stage: Stage,
    pub(crate) clock: RetryClock,
    pub(crate) framer: Framer,

    /// 0 for the header block, 1 for the first data block, wrapping mod 256.
    pub(crate) block_number: u8,

    /// Sender's `Established` stage only: a first data block has been
    /// assembled into `tx` but not yet written to the transport, awaiting
    /// the receiver's confirming `C`. Replaces the original source's
    /// `stage = stage + data_count` arithmetic (see SPEC_FULL.md §4.5/§9).
    pub(crate) data_block_prepared: bool,

    pub(crate) rx: [u8; BUFFER_SIZE],
    pub(crate) tx: [u8; BUFFER_SIZE],
    /// Length of the packet/control bytes currently sitting in `tx`, so a
    /// periodic retry or NAK can retransmit it verbatim without rebuilding.
    pub(crate) tx_len: usize,
}

impl<T: Transport, H: Handler> Engine<T, H> {
    pub fn new(transport: T, handler: H, config: Config) -> Self {
        Engine {
            transport,
            handler,
            config,
            stage: Stage::None,
            clock: RetryClock::new(),
            framer: Framer::new(),
            block_number: 0,
            data_block_prepared: false,
            rx: [0u8; BUFFER_SIZE],
            tx: [0u8; BUFFER_SIZE],
            tx_len: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn block_number(&self) -> u8 {
        self.block_number
    }

    pub fn error_count(&self) -> u32 {
        self.clock.error_count()
    }

    /// Drives one tick of the receiver state machine.
    pub fn pump_receive(&mut self) {
        crate::receiver::pump(self);
    }

    /// Drives one tick of the sender state machine.
    pub fn pump_transmit(&mut self) {
        crate::sender::pump(self);
    }

    /// Resets all counters and stage, clears partial-frame state, and writes
    /// a CAN storm to the peer. Safe to call in any state, at any time
    /// between pumps.
    pub fn abort(&mut self) {
        self.reset_to_none();
        self.send_can_storm();
    }

    /// Resets counters/stage/framer without writing anything — used on
    /// `Finish` (no storm) as well as internally before a storm on `Timeout`/
    /// `Error`/refusal.
    pub(crate) fn reset_to_none(&mut self) {
        self.stage = Stage::None;
        self.clock.reset();
        self.framer.reset();
        self.block_number = 0;
        self.data_block_prepared = false;
    }

    pub(crate) fn send_can_storm(&mut self) {
        let n = build_can_storm(&mut self.tx, self.config.can_count);
        self.transport.write_all(&self.tx[..n]);
    }

    pub(crate) fn send(&mut self, len: usize) {
        self.transport.write_all(&self.tx[..len]);
    }

    pub(crate) fn send_byte(&mut self, byte: u8) {
        self.tx[0] = byte;
        self.send(1);
    }

    pub(crate) fn send_two(&mut self, first: u8, second: u8) {
        self.tx[0] = first;
        self.tx[1] = second;
        self.send(2);
    }

    /// Records that `tx[..len]` is the packet/control bytes now in flight,
    /// then writes it.
    pub(crate) fn send_tracked(&mut self, len: usize) {
        self.tx_len = len;
        self.send(len);
    }

    /// Re-sends whatever is recorded as currently in flight in `tx`,
    /// verbatim, without rebuilding it.
    pub(crate) fn retransmit(&mut self) {
        self.send(self.tx_len);
    }

    pub(crate) fn deliver(&mut self, event: Event<'_>) -> Decision {
        self.handler.on_event(event)
    }

    /// Zero-fills the payload region of `tx` (the portion after the 3-byte
    /// packet header), mirroring the reference source's `memset(..., NULL,
    /// ...)` before calling back for a block to send.
    pub(crate) fn zero_fill_tx_payload(&mut self, len: usize) {
        for b in self.tx[PACKET_HEADER..PACKET_HEADER + len].iter_mut() {
            *b = 0;
        }
    }

    pub(crate) fn abort_with_error(&mut self) {
        debug!("engine: error budget exhausted, aborting");
        self.reset_to_none();
        self.send_can_storm();
        self.deliver(Event::Error);
    }

    pub(crate) fn abort_with_timeout(&mut self) {
        debug!("engine: idle too long, timing out");
        self.reset_to_none();
        self.send_can_storm();
        self.deliver(Event::Timeout);
    }

    pub(crate) fn abort_with_peer_cancel(&mut self) {
        info!("engine: peer cancelled the transfer");
        self.reset_to_none();
        self.deliver(Event::Abort);
    }

    pub(crate) fn finish(&mut self) {
        info!("engine: transfer finished");
        self.reset_to_none();
        self.deliver(Event::Finish);
    }
}
