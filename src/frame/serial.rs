// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io;

use super::*;

use crate::{DataMode, ProtocolError, Result, Slave};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Header {
    pub(crate) slave: Slave,
}

/// Everything needed to match a response frame with its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestContext {
    pub(crate) function_code: FunctionCode,
    pub(crate) header: Header,
    pub(crate) quantity: Quantity,
}

impl RequestContext {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        self.function_code
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.header.slave
    }

    /// Number of coils or registers that have been requested.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }
}

/// A request addressed to a slave, i.e. the frame body without checksum.
#[derive(Debug, Clone)]
pub struct RequestAdu<'a> {
    pub(crate) hdr: Header,
    pub(crate) pdu: RequestPdu<'a>,
}

impl<'a> RequestAdu<'a> {
    #[must_use]
    pub fn new(slave: Slave, request: Request<'a>) -> Self {
        Self {
            hdr: Header { slave },
            pdu: request.into(),
        }
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.hdr.slave
    }

    #[must_use]
    pub const fn request(&self) -> &Request<'a> {
        &self.pdu.0
    }

    pub(crate) fn context(&self) -> RequestContext {
        RequestContext {
            function_code: self.pdu.0.function_code(),
            header: self.hdr,
            quantity: self.pdu.0.quantity(),
        }
    }
}

impl<'a> From<RequestAdu<'a>> for Request<'a> {
    fn from(from: RequestAdu<'a>) -> Self {
        from.pdu.into()
    }
}

impl TryFrom<Bytes> for RequestAdu<'static> {
    type Error = io::Error;

    fn try_from(frame: Bytes) -> std::result::Result<Self, Self::Error> {
        let (slave, pdu_data) = split_frame(frame)?;
        let pdu = RequestPdu::try_from(pdu_data)?;
        Ok(Self {
            hdr: Header { slave },
            pdu,
        })
    }
}

/// A response (or exception) sent by a slave, i.e. the frame body without checksum.
#[derive(Debug, Clone)]
pub struct ResponseAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: ResponsePdu,
}

impl ResponseAdu {
    #[must_use]
    pub fn new(slave: Slave, response: std::result::Result<Response, ExceptionResponse>) -> Self {
        Self {
            hdr: Header { slave },
            pdu: response.into(),
        }
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.hdr.slave
    }
}

fn split_frame(frame: Bytes) -> io::Result<(Slave, Bytes)> {
    if frame.len() < 2 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "too short"));
    }
    let slave = Slave(frame[0]);
    Ok((slave, frame.slice(1..)))
}

/// Verifies that a decoded frame answers the outstanding request and
/// decodes its PDU in the shape of `data_mode`.
pub(crate) fn decode_response(
    frame: Bytes,
    request_context: RequestContext,
    data_mode: DataMode,
) -> Result<ResponseData> {
    let RequestContext {
        function_code: req_function_code,
        header: req_hdr,
        quantity,
    } = request_context;

    let (slave, pdu_data) = split_frame(frame.clone())?;
    let rsp_hdr = Header { slave };
    if let Err(message) = verify_response_header(&req_hdr, &rsp_hdr) {
        return Err(ProtocolError::HeaderMismatch { message, frame }.into());
    }

    // Exception responses carry the request function code with the high bit set.
    if pdu_data[0] >= 0x80 {
        let ExceptionResponse {
            function,
            exception,
        } = ExceptionResponse::try_from(pdu_data)?;
        if function != req_function_code {
            return Err(ProtocolError::FunctionCodeMismatch {
                request: req_function_code,
                response: function,
            }
            .into());
        }
        return Ok(Err(exception));
    }

    let rsp_function_code = FunctionCode::new(pdu_data[0]);
    if rsp_function_code != req_function_code {
        return Err(ProtocolError::FunctionCodeMismatch {
            request: req_function_code,
            response: rsp_function_code,
        }
        .into());
    }

    let data = data_mode.decode_response(pdu_data, Some(quantity))?;
    Ok(Ok(data))
}

fn verify_response_header<H: Eq + std::fmt::Debug>(
    req_hdr: &H,
    rsp_hdr: &H,
) -> std::result::Result<(), String> {
    if req_hdr != rsp_hdr {
        return Err(format!(
            "expected/request = {req_hdr:?}, actual/response = {rsp_hdr:?}"
        ));
    }
    Ok(())
}
