// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use tokio::time::Instant;

use super::{
    checksum::lrc,
    serial::{Event, FrameCodec, FrameTimer},
};
use crate::{
    bytes::{Buf as _, BufMut as _, Bytes, BytesMut},
    FrameError,
};

const START: u8 = b':';
const END: &[u8; 2] = b"\r\n";

/// Start delimiter, two digits per address/PDU/LRC byte and `CR LF`.
const MAX_FRAME_LEN: usize = 1 + 2 * (1 + 253 + 1) + 2;

/// ASCII framing: `:`, uppercase hex digits, LRC, `CR LF`.
///
/// The timer only guards frame assembly. A frame that started but never
/// completed resolves to [`FrameError::FrameTimeout`].
#[derive(Debug, Clone)]
pub struct AsciiCodec {
    buf: BytesMut,
    timer: FrameTimer,
}

impl AsciiCodec {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            buf: BytesMut::new(),
            timer: FrameTimer::new(timeout),
        }
    }
}

fn decode_frame(frame: &[u8]) -> Result<Bytes, FrameError> {
    let Some(end) = frame.iter().position(|b| *b == b'\n') else {
        return Err(FrameError::InvalidChecksum);
    };
    if end < 2 {
        return Err(FrameError::InvalidChecksum);
    }
    // Skip the start delimiter, stop before CR.
    let digits = &frame[1..end - 1];
    let mut data = hex::decode(digits).map_err(|err| {
        log::debug!("Invalid hex digits: {err}");
        FrameError::InvalidChecksum
    })?;
    let Some(trailer) = data.pop() else {
        return Err(FrameError::InvalidChecksum);
    };
    let expected_lrc = lrc(&data);
    if expected_lrc != trailer {
        log::debug!("LRC is not correct: 0x{trailer:02X} instead of 0x{expected_lrc:02X}");
        return Err(FrameError::InvalidChecksum);
    }
    Ok(data.into())
}

impl FrameCodec for AsciiCodec {
    fn push_bytes(&mut self, data: &[u8]) -> Option<Event> {
        log::trace!("Received {} byte(s)", data.len());
        self.buf.extend_from_slice(data);

        let Some(start) = self.buf.iter().position(|b| *b == START) else {
            log::trace!("No start delimiter, discarding {} byte(s)", self.buf.len());
            self.reset();
            return None;
        };
        if start > 0 {
            self.buf.advance(start);
        }
        self.timer.restart();

        if !self.buf.windows(END.len()).any(|w| w == END) {
            if self.buf.len() >= MAX_FRAME_LEN {
                log::debug!("Discarding oversized frame of {} byte(s)", self.buf.len());
                self.reset();
                return Some(Err(FrameError::InvalidChecksum).into());
            }
            // incomplete frame
            return None;
        }
        self.timer.cancel();
        let frame = self.buf.split();
        Some(decode_frame(&frame).into())
    }

    fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    fn expire(&mut self) -> Option<Event> {
        if !self.timer.is_pending() {
            return None;
        }
        self.reset();
        Some(Err(FrameError::FrameTimeout).into())
    }

    fn reset(&mut self) {
        self.timer.cancel();
        self.buf.clear();
    }

    fn encode_frame(&self, body: &[u8], dst: &mut BytesMut) {
        let mut data = Vec::with_capacity(body.len() + 1);
        data.extend_from_slice(body);
        data.push(lrc(body));
        dst.reserve(1 + data.len() * 2 + END.len());
        dst.put_u8(START);
        dst.put_slice(hex::encode_upper(data).as_bytes());
        dst.put_slice(END);
    }
}
