//! Wire-protocol constants and engine configuration.

/// Start of Header — introduces a 128-byte data/header packet.
pub const SOH: u8 = 0x01;
/// Start of Text — introduces a 1024-byte data packet (YMODEM-1K).
pub const STX: u8 = 0x02;
/// End of Transmission.
pub const EOT: u8 = 0x04;
/// Acknowledge.
pub const ACK: u8 = 0x06;
/// Not Acknowledge.
pub const NAK: u8 = 0x15;
/// Cancel.
pub const CAN: u8 = 0x18;
/// CRC-mode request / ready-for-data character.
pub const C: u8 = 0x43;
/// Alternate abort byte ('A'), treated identically to CAN.
pub const ABORT_A1: u8 = 0x41;
/// Alternate abort byte ('a'), treated identically to CAN.
pub const ABORT_A2: u8 = 0x61;

/// Payload size of a SOH (128-byte) packet.
pub const PACKET_SIZE: usize = 128;
/// Payload size of an STX (1024-byte, YMODEM-1K) packet.
pub const PACKET_1K_SIZE: usize = 1024;

/// Bytes before the payload: frame byte, seq, ~seq.
pub const PACKET_HEADER: usize = 3;
/// Bytes after the payload: CRC hi, CRC lo.
pub const PACKET_TRAILER: usize = 2;
/// Total non-payload overhead of a packet.
pub const PACKET_OVERHEAD: usize = PACKET_HEADER + PACKET_TRAILER;

/// Size of the engine's fixed rx/tx buffers: the largest packet plus overhead.
pub const BUFFER_SIZE: usize = PACKET_1K_SIZE + PACKET_OVERHEAD;

/// Tunable engine parameters. All four fields have the defaults the reference
/// implementation ships with; override only if the transport demands it.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// A repoll/retransmit fires every `time_divide + 1` idle ticks.
    pub time_divide: u32,
    /// After `time_max + 1` repoll intervals with no progress, the engine times out.
    pub time_max: u32,
    /// After this many rejected packets in a row without progress, the engine
    /// aborts with `Event::Error` instead of retrying further.
    pub error_max: u32,
    /// Number of CAN bytes written for a cancel storm.
    pub can_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            time_divide: 499,
            time_max: 5,
            error_max: 999,
            can_count: 5,
        }
    }
}
