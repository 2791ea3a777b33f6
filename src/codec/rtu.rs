// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use byteorder::{ByteOrder as _, LittleEndian};
use tokio::time::Instant;

use super::{
    checksum::crc16,
    serial::{Event, FrameCodec, FrameTimer},
};
use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    FrameError,
};

/// Slave address, PDU and CRC.
const MAX_FRAME_SIZE: usize = 1 + 253 + 2;

/// RTU framing: binary frames delimited by line silence, CRC-16 trailer.
///
/// A candidate frame that grows beyond the largest possible frame is
/// discarded right away as [`FrameError::InvalidChecksum`].
#[derive(Debug, Clone)]
pub struct RtuCodec {
    buf: BytesMut,
    timer: FrameTimer,
}

impl RtuCodec {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            buf: BytesMut::new(),
            timer: FrameTimer::new(timeout),
        }
    }
}

fn decode_frame(frame: Bytes) -> Result<Bytes, FrameError> {
    if frame.len() < 2 {
        return Err(FrameError::InvalidChecksum);
    }
    let body_len = frame.len() - 2;
    let crc = LittleEndian::read_u16(&frame[body_len..]);
    let expected_crc = crc16(&frame[..body_len]);
    if expected_crc != crc {
        log::debug!("CRC is not correct: 0x{crc:04X} instead of 0x{expected_crc:04X}");
        return Err(FrameError::InvalidChecksum);
    }
    Ok(frame.slice(..body_len))
}

impl FrameCodec for RtuCodec {
    fn push_bytes(&mut self, data: &[u8]) -> Option<Event> {
        log::trace!("Received {} byte(s)", data.len());
        self.buf.extend_from_slice(data);
        if self.buf.len() > MAX_FRAME_SIZE {
            log::debug!("Discarding oversized frame of {} byte(s)", self.buf.len());
            self.reset();
            return Some(Err(FrameError::InvalidChecksum).into());
        }
        self.timer.restart();
        // Frames are only inspected after the line fell silent.
        None
    }

    fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    fn expire(&mut self) -> Option<Event> {
        if !self.timer.is_pending() {
            return None;
        }
        self.timer.cancel();
        let frame = self.buf.split().freeze();
        Some(decode_frame(frame).into())
    }

    fn reset(&mut self) {
        self.timer.cancel();
        self.buf.clear();
    }

    fn encode_frame(&self, body: &[u8], dst: &mut BytesMut) {
        dst.reserve(body.len() + 2);
        dst.put_slice(body);
        dst.put_u16_le(crc16(body));
    }
}
