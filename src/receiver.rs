//! Receiver state machine: six stages, driven one tick at a time by
//! `Engine::pump_receive`. Grounded on `original_source/Ymodem.cpp`'s
//! `YmodemReceiveFileProcess`/`YmodemReceiveDataProcess`/`YmodemReceiveOverProcess`,
//! with the Finished-stage redesign documented in SPEC_FULL.md §4.4/§9.

use crate::consts::{ABORT_A1, ABORT_A2, ACK, CAN, EOT, NAK, PACKET_HEADER, PACKET_SIZE, C};
use crate::engine::Engine;
use crate::event::{Decision, Event, Handler};
use crate::frame::FrameEvent;
use crate::packet::{payload_len_for, FramedPacket};
use crate::stage::Stage;
use crate::timing::{ErrorOutcome, Idle};
use crate::transport::Transport;
use log::{debug, warn};

fn is_abort_byte(b: u8) -> bool {
    b == CAN || b == ABORT_A1 || b == ABORT_A2
}

/// Bumps the error counter; returns `true` if that overflowed and the engine
/// has already been reset and CAN-stormed as a result.
fn bump_error<T: Transport, H: Handler>(engine: &mut Engine<T, H>) -> bool {
    match engine.clock.bump_error(&engine.config) {
        ErrorOutcome::Retry => false,
        ErrorOutcome::Overflow => {
            engine.abort_with_error();
            true
        }
    }
}

pub fn pump<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.stage {
        Stage::None => on_none(engine),
        Stage::Establishing => on_establishing(engine),
        Stage::Established => on_established(engine),
        Stage::Transmitting => on_transmitting(engine),
        Stage::Finishing => on_finishing(engine),
        Stage::Finished => on_finished(engine),
    }
}

fn on_none<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    engine.clock.reset();
    engine.send_byte(C);
    engine.stage = Stage::Establishing;
}

fn on_establishing<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(C),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
                return;
            }
            warn!("receiver/establishing: unexpected control byte 0x{:02x}", b);
            if !bump_error(engine) {
                engine.send_byte(C);
            }
        }
        FrameEvent::Framed { is_stx, len } => {
            engine.clock.note_activity();
            if is_stx {
                warn!("receiver/establishing: STX where block 0 expected");
                if !bump_error(engine) {
                    engine.send_byte(C);
                }
                return;
            }
            accept_header_and_establish(engine, len);
        }
    }
}

/// Shared by `Establishing` and the Finished-stage hand-off: validates a
/// framed block-0 packet and, on an accepting callback, moves the engine
/// into `Established`.
fn accept_header_and_establish<T: Transport, H: Handler>(engine: &mut Engine<T, H>, len: usize) {
    let valid = FramedPacket::parse(&engine.rx[..len], PACKET_SIZE).is_valid_for(0);
    if !valid {
        warn!("receiver: block 0 rejected (bad crc/seq)");
        if !bump_error(engine) {
            engine.send_byte(C);
        }
        return;
    }

    let mut plen = PACKET_SIZE;
    let decision = engine.handler.on_event(Event::Establish {
        payload: &mut engine.rx[PACKET_HEADER..PACKET_HEADER + PACKET_SIZE],
        len: &mut plen,
    });
    match decision {
        Decision::Ack => {
            debug!("receiver: header accepted, moving to Established");
            engine.send_two(ACK, C);
            engine.stage = Stage::Established;
            engine.clock.reset();
        }
        _ => {
            engine.reset_to_none();
            engine.send_can_storm();
        }
    }
}

fn on_established<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(NAK),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == EOT {
                engine.send_byte(NAK);
                engine.stage = Stage::Finishing;
                engine.clock.reset();
            } else {
                warn!("receiver/established: unexpected control byte 0x{:02x}", b);
                if !bump_error(engine) {
                    engine.send_byte(NAK);
                }
            }
        }
        FrameEvent::Framed { is_stx, len } => {
            engine.clock.note_activity();
            let data_payload_len = payload_len_for(is_stx);
            let seq1_valid = FramedPacket::parse(&engine.rx[..len], data_payload_len).is_valid_for(1);
            if seq1_valid {
                let mut plen = data_payload_len;
                let decision = engine.handler.on_event(Event::Transmit {
                    payload: &mut engine.rx[PACKET_HEADER..PACKET_HEADER + data_payload_len],
                    len: &mut plen,
                });
                match decision {
                    Decision::Ack => {
                        engine.send_byte(ACK);
                        engine.block_number = 1;
                        engine.stage = Stage::Transmitting;
                        engine.clock.reset();
                    }
                    _ => {
                        engine.reset_to_none();
                        engine.send_can_storm();
                    }
                }
                return;
            }
            if !is_stx {
                let header_retransmit =
                    FramedPacket::parse(&engine.rx[..len], PACKET_SIZE).is_valid_for(0);
                if header_retransmit {
                    debug!("receiver/established: peer re-sent block 0");
                    if !bump_error(engine) {
                        engine.send_two(ACK, C);
                    }
                    return;
                }
            }
            warn!("receiver/established: block 1 rejected (bad crc/seq)");
            if !bump_error(engine) {
                engine.send_byte(NAK);
            }
        }
    }
}

fn on_transmitting<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(NAK),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == EOT {
                engine.send_byte(NAK);
                engine.stage = Stage::Finishing;
                engine.clock.reset();
            } else {
                warn!("receiver/transmitting: unexpected control byte 0x{:02x}", b);
                if !bump_error(engine) {
                    engine.send_byte(NAK);
                }
            }
        }
        FrameEvent::Framed { is_stx, len } => {
            engine.clock.note_activity();
            let payload_len = payload_len_for(is_stx);
            let current = engine.block_number;
            let next = current.wrapping_add(1);

            if FramedPacket::parse(&engine.rx[..len], payload_len).is_valid_for(next) {
                let mut plen = payload_len;
                let decision = engine.handler.on_event(Event::Transmit {
                    payload: &mut engine.rx[PACKET_HEADER..PACKET_HEADER + payload_len],
                    len: &mut plen,
                });
                match decision {
                    Decision::Ack => {
                        engine.block_number = next;
                        engine.send_byte(ACK);
                        engine.clock.reset();
                    }
                    _ => {
                        engine.reset_to_none();
                        engine.send_can_storm();
                    }
                }
                return;
            }

            if FramedPacket::parse(&engine.rx[..len], payload_len).is_valid_for(current) {
                debug!("receiver/transmitting: duplicate block {}", current);
                if !bump_error(engine) {
                    engine.send_byte(ACK);
                }
                return;
            }

            warn!("receiver/transmitting: block rejected (bad crc/seq)");
            if !bump_error(engine) {
                engine.send_byte(NAK);
            }
        }
    }
}

fn on_finishing<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(NAK),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == EOT {
                engine.send_two(ACK, C);
                engine.stage = Stage::Finished;
                engine.clock.reset();
            } else {
                warn!("receiver/finishing: unexpected control byte 0x{:02x}", b);
                if !bump_error(engine) {
                    engine.send_byte(NAK);
                }
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("receiver/finishing: unexpected packet while awaiting EOT");
            if !bump_error(engine) {
                engine.send_byte(NAK);
            }
        }
    }
}

fn on_finished<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        // Awaiting a block 0 again, same as Establishing: retry with 'C'.
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(C),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == EOT {
                // Peer retransmitted EOT because it missed our ACK+C.
                if !bump_error(engine) {
                    engine.send_two(ACK, C);
                }
            } else {
                warn!("receiver/finished: unexpected control byte 0x{:02x}", b);
                if !bump_error(engine) {
                    engine.send_byte(C);
                }
            }
        }
        FrameEvent::Framed { is_stx, len } => {
            engine.clock.note_activity();
            if is_stx || !FramedPacket::parse(&engine.rx[..len], PACKET_SIZE).is_valid_for(0) {
                warn!("receiver/finished: block 0 rejected (bad crc/seq)");
                if !bump_error(engine) {
                    engine.send_byte(C);
                }
                return;
            }

            if engine.rx[PACKET_HEADER] == 0 {
                // Terminator: end of the whole batch.
                engine.send_byte(ACK);
                engine.finish();
            } else {
                // Next file's header, carried in this same packet — deliver
                // Finish for the file just completed, then run the same
                // acceptance logic as Establishing against this packet
                // without waiting for it to arrive a second time.
                engine.block_number = 0;
                engine.handler.on_event(Event::Finish);
                accept_header_and_establish(engine, len);
            }
        }
    }
}
