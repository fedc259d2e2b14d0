//! Sender state machine: mirrors the receiver's six stages. Grounded on
//! `original_source/Ymodem.cpp`'s `YmodemSendFileProcess`/`YmodemSendDataProcess`,
//! with the `data_block_prepared` redesign documented in SPEC_FULL.md §4.5/§9.

use crate::consts::{
    ABORT_A1, ABORT_A2, ACK, CAN, EOT, NAK, PACKET_1K_SIZE, PACKET_HEADER, PACKET_SIZE, C,
};
use crate::engine::Engine;
use crate::event::{Decision, Event, Handler};
use crate::frame::FrameEvent;
use crate::packet::{build_data_packet, build_header_packet};
use crate::stage::Stage;
use crate::timing::{ErrorOutcome, Idle};
use crate::transport::Transport;
use log::{debug, warn};

fn is_abort_byte(b: u8) -> bool {
    b == CAN || b == ABORT_A1 || b == ABORT_A2
}

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
    engine.stage = Stage::Establishing;
}

fn on_establishing<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait | Idle::Repoll => {}
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == C {
                debug!("sender/establishing: got C, sending header");
                engine.zero_fill_tx_payload(PACKET_SIZE);
                let mut plen = PACKET_SIZE;
                engine.handler.on_event(Event::Establish {
                    payload: &mut engine.tx[PACKET_HEADER..PACKET_HEADER + PACKET_SIZE],
                    len: &mut plen,
                });
                let total = build_header_packet(&mut engine.tx, PACKET_SIZE);
                engine.send_tracked(total);
                engine.stage = Stage::Established;
                engine.clock.reset();
            } else {
                warn!("sender/establishing: unexpected control byte 0x{:02x}", b);
                bump_error(engine);
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("sender/establishing: unexpected packet while awaiting C");
            bump_error(engine);
        }
    }
}

fn on_established<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.retransmit(),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
                return;
            }
            match b {
                NAK => {
                    warn!("sender/established: NAK, retransmitting");
                    if !bump_error(engine) {
                        engine.retransmit();
                    }
                }
                ACK if !engine.data_block_prepared => {
                    engine.zero_fill_tx_payload(PACKET_1K_SIZE);
                    let mut plen = PACKET_1K_SIZE;
                    let decision = engine.handler.on_event(Event::Transmit {
                        payload: &mut engine.tx[PACKET_HEADER..PACKET_HEADER + PACKET_1K_SIZE],
                        len: &mut plen,
                    });
                    match decision {
                        Decision::Ack => {
                            let total = build_data_packet(&mut engine.tx, 1, plen);
                            engine.tx_len = total;
                            engine.data_block_prepared = true;
                            engine.clock.reset();
                        }
                        Decision::Eot => {
                            engine.send_byte(EOT);
                            engine.stage = Stage::Finishing;
                            engine.clock.reset();
                        }
                        Decision::Cancel => {
                            engine.reset_to_none();
                            engine.send_can_storm();
                        }
                    }
                }
                C if engine.data_block_prepared => {
                    debug!("sender/established: first data block confirmed");
                    engine.retransmit();
                    engine.block_number = 1;
                    engine.data_block_prepared = false;
                    engine.stage = Stage::Transmitting;
                    engine.clock.reset();
                }
                C => {
                    // Confirming 'C' arrived before our ACK handler queued a
                    // block — shouldn't happen over an in-order byte stream,
                    // handled defensively.
                    warn!("sender/established: C with no block prepared");
                    bump_error(engine);
                }
                ACK => {
                    // data_block_prepared is already true; a duplicate ACK.
                    debug!("sender/established: duplicate ACK, awaiting C");
                }
                _ => {
                    warn!("sender/established: unexpected control byte 0x{:02x}", b);
                    bump_error(engine);
                }
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("sender/established: unexpected packet");
            bump_error(engine);
        }
    }
}

fn on_transmitting<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.retransmit(),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
                return;
            }
            match b {
                NAK => {
                    warn!("sender/transmitting: NAK, retransmitting");
                    if !bump_error(engine) {
                        engine.retransmit();
                    }
                }
                ACK => {
                    engine.zero_fill_tx_payload(PACKET_1K_SIZE);
                    let mut plen = PACKET_1K_SIZE;
                    let decision = engine.handler.on_event(Event::Transmit {
                        payload: &mut engine.tx[PACKET_HEADER..PACKET_HEADER + PACKET_1K_SIZE],
                        len: &mut plen,
                    });
                    match decision {
                        Decision::Ack => {
                            let next = engine.block_number.wrapping_add(1);
                            let total = build_data_packet(&mut engine.tx, next, plen);
                            engine.send_tracked(total);
                            engine.block_number = next;
                            engine.clock.reset();
                        }
                        Decision::Eot => {
                            engine.send_byte(EOT);
                            engine.stage = Stage::Finishing;
                            engine.clock.reset();
                        }
                        Decision::Cancel => {
                            engine.reset_to_none();
                            engine.send_can_storm();
                        }
                    }
                }
                _ => {
                    warn!("sender/transmitting: unexpected control byte 0x{:02x}", b);
                    bump_error(engine);
                }
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("sender/transmitting: unexpected packet");
            bump_error(engine);
        }
    }
}

fn on_finishing<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.send_byte(EOT),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == NAK {
                debug!("sender/finishing: NAK'd first EOT, resending");
                engine.send_byte(EOT);
            } else if b == C {
                engine.zero_fill_tx_payload(PACKET_SIZE);
                let total = build_header_packet(&mut engine.tx, PACKET_SIZE);
                engine.send_tracked(total);
                engine.stage = Stage::Finished;
                engine.clock.reset();
            } else {
                warn!("sender/finishing: unexpected control byte 0x{:02x}", b);
                bump_error(engine);
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("sender/finishing: unexpected packet");
            bump_error(engine);
        }
    }
}

fn on_finished<T: Transport, H: Handler>(engine: &mut Engine<T, H>) {
    match engine.framer.poll(&mut engine.transport, &mut engine.rx) {
        FrameEvent::Pending => match engine.clock.tick(&engine.config) {
            Idle::Wait => {}
            Idle::Repoll => engine.retransmit(),
            Idle::TimedOut => engine.abort_with_timeout(),
        },
        FrameEvent::ControlByte(b) => {
            engine.clock.note_activity();
            if is_abort_byte(b) {
                engine.abort_with_peer_cancel();
            } else if b == ACK {
                engine.finish();
            } else if b == NAK || b == C {
                warn!("sender/finished: {:02x} awaiting ACK of terminator", b);
                if !bump_error(engine) {
                    engine.retransmit();
                }
            } else {
                warn!("sender/finished: unexpected control byte 0x{:02x}", b);
                bump_error(engine);
            }
        }
        FrameEvent::Framed { .. } => {
            engine.clock.note_activity();
            warn!("sender/finished: unexpected packet");
            bump_error(engine);
        }
    }
}
