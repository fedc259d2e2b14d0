//! The six-state progression shared by both state machines.

/// The engine's current position in a transfer. Set only by the state
/// machines themselves; read by the top-level dispatch in `Engine`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Idle. The initial state, and the state every transfer returns to on
    /// finish, timeout, error, or abort.
    None,
    /// Waiting for the peer to offer (receiver) or send (sender) the block-0 header.
    Establishing,
    /// Header exchanged; waiting for the first data block.
    Established,
    /// Data blocks are in flight.
    Transmitting,
    /// EOT has been exchanged once; waiting for the second EOT/ACK round.
    Finishing,
    /// The transfer is logically done; waiting for a terminator or next header.
    Finished,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::None
    }
}
