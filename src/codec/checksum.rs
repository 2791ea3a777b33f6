// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame checksums of the serial line encodings.

/// Modbus CRC-16 (polynomial `0xA001`, reflected, initial value `0xFFFF`).
///
/// The result is transmitted low byte first, i.e. `crc16(..).to_le_bytes()`
/// is the RTU trailer.
#[must_use]
pub fn crc16(buf: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in buf {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Longitudinal redundancy check of the ASCII encoding.
///
/// Two's complement of the 8 bit sum of all bytes.
#[must_use]
pub fn lrc(buf: &[u8]) -> u8 {
    buf.iter()
        .fold(0u8, |sum, x| sum.wrapping_add(*x))
        .wrapping_neg()
}
