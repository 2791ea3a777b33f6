// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame reassembly for serial lines.
//!
//! Serial frames carry no length field. A frame codec collects inbound
//! chunks into exactly one candidate frame and decides from delimiters
//! or from a silence deadline when that frame is complete.

use std::{io, time::Duration};

use tokio::time::Instant;
use tokio_util::codec::Encoder;

use super::{
    ascii::AsciiCodec, encode_request_pdu, encode_response_result_pdu, request_pdu_size,
    response_result_pdu_size, rtu::RtuCodec,
};
use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    frame::serial::{RequestAdu, ResponseAdu},
    FrameError, Mode,
};

/// Outcome of a frame cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A checksum-verified frame body: slave address, function code and payload.
    Message(Bytes),

    /// The frame was discarded.
    Error(FrameError),
}

impl From<Result<Bytes, FrameError>> for Event {
    fn from(from: Result<Bytes, FrameError>) -> Self {
        match from {
            Ok(body) => {
                log::debug!("Frame received: {:02X?}", &body[..]);
                Self::Message(body)
            }
            Err(err) => {
                log::warn!("Frame discarded: {err}");
                Self::Error(err)
            }
        }
    }
}

/// Reassembles frames from a stream of chunks and frames outbound bodies.
///
/// A codec never blocks. Time only enters through [`deadline`](Self::deadline):
/// the owner is expected to call [`expire`](Self::expire) once that instant
/// has passed without further input.
pub trait FrameCodec {
    /// Appends an inbound chunk to the candidate frame.
    fn push_bytes(&mut self, data: &[u8]) -> Option<Event>;

    /// The instant at which the candidate frame resolves, if one is pending.
    fn deadline(&self) -> Option<Instant>;

    /// Resolves the candidate frame after its deadline elapsed.
    ///
    /// Returns `None` if no frame is pending.
    fn expire(&mut self) -> Option<Event>;

    /// Drops the candidate frame and cancels the pending deadline.
    fn reset(&mut self);

    /// Appends the checksum and delimiters for `body` to `dst`.
    fn encode_frame(&self, body: &[u8], dst: &mut BytesMut);
}

/// Single-shot, restartable silence timer.
#[derive(Debug, Clone)]
pub(crate) struct FrameTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl FrameTimer {
    pub(crate) const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Cancels the previous deadline and arms a new one.
    pub(crate) fn restart(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }

    pub(crate) const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// The frame codec selected by [`Mode`].
#[derive(Debug, Clone)]
pub enum Framing {
    Rtu(RtuCodec),
    Ascii(AsciiCodec),
}

impl Framing {
    #[must_use]
    pub fn new(mode: Mode, timeout: Duration) -> Self {
        match mode {
            Mode::Rtu => Self::Rtu(RtuCodec::new(timeout)),
            Mode::Ascii => Self::Ascii(AsciiCodec::new(timeout)),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Rtu(_) => Mode::Rtu,
            Self::Ascii(_) => Mode::Ascii,
        }
    }
}

impl FrameCodec for Framing {
    fn push_bytes(&mut self, data: &[u8]) -> Option<Event> {
        match self {
            Self::Rtu(codec) => codec.push_bytes(data),
            Self::Ascii(codec) => codec.push_bytes(data),
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Rtu(codec) => codec.deadline(),
            Self::Ascii(codec) => codec.deadline(),
        }
    }

    fn expire(&mut self) -> Option<Event> {
        match self {
            Self::Rtu(codec) => codec.expire(),
            Self::Ascii(codec) => codec.expire(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Rtu(codec) => codec.reset(),
            Self::Ascii(codec) => codec.reset(),
        }
    }

    fn encode_frame(&self, body: &[u8], dst: &mut BytesMut) {
        match self {
            Self::Rtu(codec) => codec.encode_frame(body, dst),
            Self::Ascii(codec) => codec.encode_frame(body, dst),
        }
    }
}

impl<'a> Encoder<RequestAdu<'a>> for Framing {
    type Error = io::Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> io::Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let mut body = BytesMut::with_capacity(request_pdu_size(&pdu.0)? + 1);
        body.put_u8(hdr.slave.into());
        encode_request_pdu(&mut body, &pdu.0);
        self.encode_frame(&body, buf);
        Ok(())
    }
}

impl Encoder<ResponseAdu> for Framing {
    type Error = io::Error;

    fn encode(&mut self, adu: ResponseAdu, buf: &mut BytesMut) -> io::Result<()> {
        let ResponseAdu { hdr, pdu } = adu;
        let mut body = BytesMut::with_capacity(response_result_pdu_size(&pdu.0)? + 1);
        body.put_u8(hdr.slave.into());
        encode_response_result_pdu(&mut body, &pdu.0);
        self.encode_frame(&body, buf);
        Ok(())
    }
}
