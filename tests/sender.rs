mod common;

use common::{FileHandler, ScriptedTransport};
use ymodem_engine::consts::{ACK, CAN, EOT, NAK, PACKET_HEADER, PACKET_SIZE, SOH, STX, C};
use ymodem_engine::packet::FramedPacket;
use ymodem_engine::{Config, Engine, Stage};

fn new_sender(name: &str, size: usize, data: Vec<u8>) -> Engine<ScriptedTransport, FileHandler> {
    Engine::new(ScriptedTransport::new(), FileHandler::new(name, size, data), Config::default())
}

/// Pops the last packet the engine wrote to `outbound` and decodes it,
/// assuming it's the only thing written since the caller last checked.
fn last_packet(outbound: &[u8], payload_len: usize) -> FramedPacket<'_> {
    let total = PACKET_HEADER + payload_len + 2;
    let start = outbound.len() - total;
    FramedPacket::parse(&outbound[start..], payload_len)
}

#[test]
fn e6_send_happy_path() {
    let data = vec![0x5Au8; 700];
    let mut engine = new_sender("report.bin", 700, data.clone());

    engine.pump_transmit(); // None -> Establishing
    engine.transport_mut().feed(&[C]);
    engine.pump_transmit(); // C -> builds+sends header (SOH), Established

    assert_eq!(engine.stage(), Stage::Established);
    assert_eq!(engine.transport().outbound[0], SOH);
    let header = last_packet(&engine.transport().outbound, PACKET_SIZE);
    assert!(header.is_valid_for(0));
    assert_eq!(&header.payload[..10], b"report.bin"[..10].as_ref());

    // Receiver ACKs the header; engine prepares the first data block (STX, 700 bytes).
    engine.transport_mut().feed(&[ACK]);
    engine.pump_transmit();
    assert_eq!(engine.stage(), Stage::Established, "still waiting for confirming C");

    engine.transport_mut().feed(&[C]);
    engine.pump_transmit(); // confirming C -> writes the prepared block, Transmitting
    assert_eq!(engine.stage(), Stage::Transmitting);
    assert_eq!(engine.block_number(), 1);

    // 700 bytes is encoded as an STX (1024-byte) packet, zero-padded past 700.
    let block1_total = PACKET_HEADER + ymodem_engine::consts::PACKET_1K_SIZE + 2;
    let outbound = &engine.transport().outbound;
    assert_eq!(outbound[outbound.len() - block1_total], STX);
    let block1 = last_packet(&engine.transport().outbound, ymodem_engine::consts::PACKET_1K_SIZE);
    assert_eq!(block1.seq, 1);
    assert!(block1.is_valid_for(1));
    assert_eq!(&block1.payload[..700], data.as_slice());
    assert!(block1.payload[700..].iter().all(|&b| b == 0));

    // Receiver ACKs the only data block; no more data -> EOT.
    engine.transport_mut().feed(&[ACK]);
    engine.pump_transmit();
    assert_eq!(engine.stage(), Stage::Finishing);
    assert_eq!(*engine.transport().outbound.last().unwrap(), EOT);

    // Receiver NAKs the first EOT (per protocol), engine resends it.
    engine.transport_mut().feed(&[NAK]);
    engine.pump_transmit();
    assert_eq!(*engine.transport().outbound.last().unwrap(), EOT);
    assert_eq!(engine.stage(), Stage::Finishing);

    // Receiver finally sends C, requesting the terminator block.
    engine.transport_mut().feed(&[C]);
    engine.pump_transmit();
    assert_eq!(engine.stage(), Stage::Finished);
    let term = last_packet(&engine.transport().outbound, PACKET_SIZE);
    assert!(term.is_valid_for(0));
    assert!(term.payload.iter().all(|&b| b == 0));

    // Receiver ACKs the terminator; transfer is done.
    engine.transport_mut().feed(&[ACK]);
    engine.pump_transmit();
    assert_eq!(engine.stage(), Stage::None);
    assert!(engine.handler().finished);
}

#[test]
fn e6_sender_retransmits_on_nak() {
    let mut engine = new_sender("x.bin", 0, Vec::new());
    engine.pump_transmit();
    engine.transport_mut().feed(&[C]);
    engine.pump_transmit(); // header sent
    let sent_once = engine.transport().outbound.clone();

    engine.transport_mut().feed(&[NAK]);
    engine.pump_transmit();

    assert_eq!(engine.transport().outbound.len(), sent_once.len() * 2);
    assert_eq!(engine.transport().outbound[..sent_once.len()], engine.transport().outbound[sent_once.len()..]);
}

#[test]
fn e6_sender_aborts_on_peer_cancel() {
    let mut engine = new_sender("x.bin", 0, Vec::new());
    engine.pump_transmit();
    engine.transport_mut().feed(&[CAN]);
    engine.pump_transmit();

    assert_eq!(engine.stage(), Stage::None);
    assert!(!engine.handler().finished);
}
