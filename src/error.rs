// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use thiserror::Error;

use crate::{bytes::Bytes, FunctionCode};

/// Failure of a single frame cycle.
///
/// The frame codec stays usable: the next byte starts a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame was assembled but the CRC-16/LRC trailer did not match,
    /// or the frame was too short or malformed to carry a trailer.
    #[error("Invalid checksum")]
    InvalidChecksum,

    /// The assembly window elapsed before the frame was complete.
    #[error("Frame timeout")]
    FrameTimeout,
}

/// The received response doesn't belong to the outstanding request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The response was sent by another slave than the request was addressed to.
    #[error("mismatching headers: {message} {frame:?}")]
    HeaderMismatch { message: String, frame: Bytes },

    /// The function code of the response doesn't match the request.
    #[error("mismatching function codes: {request} {response}")]
    FunctionCodeMismatch {
        request: FunctionCode,
        response: FunctionCode,
    },
}

/// Specific and general errors that can occur when communicating over a serial link.
#[derive(Debug, Error)]
pub enum Error {
    /// A frame could not be received.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// _Modbus_ protocol error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport or PDU encoding error.
    #[error(transparent)]
    Transport(#[from] std::io::Error),
}
