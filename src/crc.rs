//! CRC16-CCITT (FALSE): poly 0x1021, init 0x0000, no reflection, no final XOR.
//!
//! This is numerically the `XMODEM` variant of the `crc16` crate, which is what
//! YMODEM-1K uses on the wire (big-endian, high byte first).

/// Computes the CRC16 of `data` the way YMODEM expects it on the wire.
pub fn crc16(data: &[u8]) -> u16 {
    crc16::State::<crc16::XMODEM>::calculate(data)
}

/// Returns true if `crc` is the CRC16 of `data`.
pub fn verify(data: &[u8], crc: u16) -> bool {
    crc16(data) == crc
}
