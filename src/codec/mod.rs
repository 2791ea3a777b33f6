// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    convert::TryFrom,
    io::{self, BufRead as _, Cursor, Error, ErrorKind, Read as _},
};

use byteorder::{BigEndian, ReadBytesExt as _};

use crate::{
    bytes::{Buf as _, Bytes, BytesMut},
    frame::{
        Coil, ExceptionResponse, Quantity, RawResponse, RequestPdu, ResponseData, ResponsePdu,
    },
    DataMode, ExceptionCode, FunctionCode, Request, Response,
};

pub(crate) mod ascii;
pub(crate) mod checksum;
pub(crate) mod rtu;
pub(crate) mod serial;

/// Maximum request/response PDU size of a serial line frame.
const MAX_PDU_SIZE: usize = 253;

// Encoded lengths are bounded by MAX_PDU_SIZE, see `request_pdu_size`.
#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

pub(crate) fn encode_request_pdu(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::{bytes::BufMut as _, frame::Request::*};
    buf.put_u8(request.function_code().value());
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadInputRegisters(address, quantity)
        | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleCoils(address, coils) => {
            buf.put_u16(*address);
            buf.put_u16(u16_len(coils.len()));
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(buf, coils);
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
    }
}

pub(crate) fn encode_response_pdu(buf: &mut BytesMut, response: &Response) {
    use crate::{bytes::BufMut as _, frame::Response::*};
    buf.put_u8(response.function_code().value());
    match response {
        ReadCoils(coils) | ReadDiscreteInputs(coils) => {
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(buf, coils);
        }
        ReadInputRegisters(registers) | ReadHoldingRegisters(registers) => {
            buf.put_u8(u8_len(registers.len() * 2));
            for r in registers {
                buf.put_u16(*r);
            }
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleCoils(address, quantity) | WriteMultipleRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
    }
}

pub(crate) fn encode_exception_response_pdu(buf: &mut BytesMut, rsp: ExceptionResponse) {
    use crate::bytes::BufMut as _;
    debug_assert!(rsp.function.value() < 0x80);
    buf.put_u8(rsp.function.value() | 0x80);
    buf.put_u8(rsp.exception.into());
}

pub(crate) fn encode_response_result_pdu(
    buf: &mut BytesMut,
    res: &Result<Response, ExceptionResponse>,
) {
    match res {
        Ok(rsp) => encode_response_pdu(buf, rsp),
        Err(rsp) => encode_exception_response_pdu(buf, *rsp),
    }
}

fn read_u16_be(reader: &mut impl io::Read) -> io::Result<u16> {
    reader.read_u16::<BigEndian>()
}

fn check_pdu_size(bytes: &Bytes, message: &'static str) -> io::Result<()> {
    if bytes.len() > MAX_PDU_SIZE {
        return Err(Error::new(ErrorKind::InvalidData, message));
    }
    Ok(())
}

/// Splits off `byte_count` data bytes that follow the byte count field at offset 1.
fn read_counted_data(
    rdr: &mut Cursor<&Bytes>,
    bytes: &Bytes,
    byte_count: u8,
) -> io::Result<Bytes> {
    let end = 2 + usize::from(byte_count);
    if bytes.len() < end {
        return Err(Error::new(ErrorKind::InvalidData, "too short"));
    }
    rdr.consume(byte_count.into());
    Ok(bytes.slice(2..end))
}

fn read_registers(rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<u16>> {
    let byte_count = rdr.read_u8()?;
    if byte_count % 2 != 0 {
        return Err(Error::new(ErrorKind::InvalidData, "invalid quantity"));
    }
    let quantity = byte_count / 2;
    let mut data = Vec::with_capacity(quantity.into());
    for _ in 0..quantity {
        data.push(read_u16_be(rdr)?);
    }
    Ok(data)
}

fn check_consumed(rdr: &Cursor<&Bytes>, message: &'static str) -> io::Result<()> {
    // Verify that all data has been consumed and decoded.
    if rdr.has_remaining() {
        return Err(Error::new(ErrorKind::InvalidData, message));
    }
    Ok(())
}

fn invalid_function_code(fn_code: u8) -> Error {
    Error::new(
        ErrorKind::InvalidData,
        format!("invalid function code: 0x{fn_code:02X}"),
    )
}

impl TryFrom<Bytes> for Request<'static> {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Request::*;
        check_pdu_size(&bytes, "request PDU size exceeded")?;
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let req = match fn_code {
            0x01 => ReadCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x02 => ReadDiscreteInputs(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x03 => ReadHoldingRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x04 => ReadInputRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x05 => WriteSingleCoil(read_u16_be(rdr)?, coil_to_bool(read_u16_be(rdr)?)?),
            0x06 => WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x0F => {
                let address = read_u16_be(rdr)?;
                let quantity = read_u16_be(rdr)?;
                let byte_count = rdr.read_u8()?;
                if usize::from(byte_count) != packed_size(quantity.into()) {
                    return Err(Error::new(ErrorKind::InvalidData, "invalid byte count"));
                }
                if bytes.len() < 6 + usize::from(byte_count) {
                    return Err(Error::new(ErrorKind::InvalidData, "too short"));
                }
                rdr.consume(byte_count.into());
                let packed_coils = &bytes[6..6 + usize::from(byte_count)];
                WriteMultipleCoils(address, decode_packed_coils(packed_coils, quantity).into())
            }
            0x10 => {
                let address = read_u16_be(rdr)?;
                let quantity = read_u16_be(rdr)?;
                let byte_count = rdr.read_u8()?;
                if u32::from(byte_count) != u32::from(quantity) * 2 {
                    return Err(Error::new(ErrorKind::InvalidData, "invalid quantity"));
                }
                let mut data = Vec::with_capacity(quantity.into());
                for _ in 0..quantity {
                    data.push(read_u16_be(rdr)?);
                }
                WriteMultipleRegisters(address, data.into())
            }
            fn_code => {
                return Err(invalid_function_code(fn_code));
            }
        };
        check_consumed(rdr, "undecoded request data")?;
        Ok(req)
    }
}

impl TryFrom<Bytes> for RequestPdu<'static> {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let pdu = Request::try_from(bytes)?.into();
        Ok(pdu)
    }
}

impl Response {
    /// Decodes a response PDU whose requested quantity is known.
    ///
    /// Coil and discrete input values are truncated to exactly `quantity`
    /// bits, discarding the zero padding of the last byte. Register values are
    /// always sized by the embedded byte count.
    pub fn decode_with_quantity(bytes: Bytes, quantity: Quantity) -> io::Result<Self> {
        decode_response_pdu(bytes, Some(quantity))
    }
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        // Here we have no information about the exact requested quantity so we just
        // unpack the whole bytes.
        decode_response_pdu(bytes, None)
    }
}

fn decode_response_pdu(bytes: Bytes, quantity: Option<Quantity>) -> io::Result<Response> {
    use crate::frame::Response::*;
    check_pdu_size(&bytes, "response PDU size exceeded")?;
    let rdr = &mut Cursor::new(&bytes);
    let fn_code = rdr.read_u8()?;
    let rsp = match fn_code {
        0x01 | 0x02 => {
            let byte_count = rdr.read_u8()?;
            let packed_coils = read_counted_data(rdr, &bytes, byte_count)?;
            let quantity = match quantity {
                Some(quantity) if usize::from(quantity) > packed_coils.len() * 8 => {
                    return Err(Error::new(ErrorKind::InvalidData, "invalid quantity"));
                }
                Some(quantity) => quantity,
                None => u16::from(byte_count) * 8,
            };
            let coils = decode_packed_coils(&packed_coils, quantity);
            if fn_code == 0x01 {
                ReadCoils(coils)
            } else {
                ReadDiscreteInputs(coils)
            }
        }
        0x03 => ReadHoldingRegisters(read_registers(rdr)?),
        0x04 => ReadInputRegisters(read_registers(rdr)?),
        0x05 => WriteSingleCoil(read_u16_be(rdr)?, coil_to_bool(read_u16_be(rdr)?)?),
        0x06 => WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
        0x0F => WriteMultipleCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
        0x10 => WriteMultipleRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
        fn_code => {
            return Err(invalid_function_code(fn_code));
        }
    };
    check_consumed(rdr, "undecoded response data")?;
    Ok(rsp)
}

impl TryFrom<Bytes> for RawResponse {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::RawResponse::*;
        check_pdu_size(&bytes, "response PDU size exceeded")?;
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let rsp = match fn_code {
            0x01..=0x04 => {
                let byte_count = rdr.read_u8()?;
                let data = read_counted_data(rdr, &bytes, byte_count)?;
                match fn_code {
                    0x01 => ReadCoils(data),
                    0x02 => ReadDiscreteInputs(data),
                    0x03 => ReadHoldingRegisters(data),
                    _ => ReadInputRegisters(data),
                }
            }
            0x05 | 0x06 => {
                let address = read_u16_be(rdr)?;
                let mut value = [0; 2];
                rdr.read_exact(&mut value)?;
                if fn_code == 0x05 {
                    WriteSingleCoil(address, value)
                } else {
                    WriteSingleRegister(address, value)
                }
            }
            0x0F => WriteMultipleCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x10 => WriteMultipleRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            fn_code => {
                return Err(invalid_function_code(fn_code));
            }
        };
        check_consumed(rdr, "undecoded response data")?;
        Ok(rsp)
    }
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = Error;

    /// Decodes exactly two bytes: the function code with the high bit set
    /// and the exception code.
    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let [fn_err_code, exception] = bytes[..] else {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid exception response length: {}", bytes.len()),
            ));
        };
        if fn_err_code < 0x80 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Invalid exception function code",
            ));
        }
        Ok(ExceptionResponse {
            function: FunctionCode::new(fn_err_code & 0x7F),
            exception: ExceptionCode::new(exception),
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let fn_code = Cursor::new(&bytes).read_u8()?;
        let pdu = if fn_code < 0x80 {
            Response::try_from(bytes)?.into()
        } else {
            ExceptionResponse::try_from(bytes)?.into()
        };
        Ok(pdu)
    }
}

impl DataMode {
    /// Decodes a (non-exception) response PDU into the shape of this mode.
    ///
    /// `quantity` is the number of coils/registers of the outstanding request,
    /// if known. It only affects the parsed shape of bit responses.
    pub fn decode_response(
        self,
        pdu: Bytes,
        quantity: Option<Quantity>,
    ) -> io::Result<ResponseData> {
        let data = match self {
            Self::Parsed => ResponseData::Parsed(decode_response_pdu(pdu, quantity)?),
            Self::Raw => ResponseData::Raw(RawResponse::try_from(pdu)?),
        };
        Ok(data)
    }
}

fn bool_to_coil(state: bool) -> u16 {
    if state {
        0xFF00
    } else {
        0x0000
    }
}

fn coil_to_bool(coil: u16) -> io::Result<bool> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(Error::new(
            ErrorKind::InvalidData,
            format!("Invalid coil value: 0x{coil:04X}"),
        )),
    }
}

fn packed_size(bit_count: usize) -> usize {
    (bit_count + 7) / 8
}

fn packed_coils_size(coils: &[Coil]) -> usize {
    packed_size(coils.len())
}

/// Coil `n` lands in bit `n % 8` of byte `n / 8`.
fn encode_packed_coils(buf: &mut BytesMut, coils: &[Coil]) {
    use crate::bytes::BufMut as _;
    for chunk in coils.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |byte, (bit, coil)| byte | (u8::from(*coil) << bit));
        buf.put_u8(byte);
    }
}

/// Yields at most `count` bits, the caller checks that `bytes` holds enough.
fn decode_packed_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| (byte >> bit) & 0b1 == 0b1))
        .take(count.into())
        .collect()
}

/// Packs coil states LSB-first into `ceil(len / 8)` bytes.
///
/// Unused high-order bits of the last byte are zero.
#[must_use]
pub fn pack_coils(coils: &[Coil]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(packed_coils_size(coils));
    encode_packed_coils(&mut buf, coils);
    buf.to_vec()
}

/// Unpacks exactly `quantity` coil states from LSB-first packed bytes.
///
/// Fails if `packed` holds fewer than `quantity` bits.
pub fn unpack_coils(packed: &[u8], quantity: Quantity) -> io::Result<Vec<Coil>> {
    if usize::from(quantity) > packed.len() * 8 {
        return Err(Error::new(ErrorKind::InvalidData, "too short"));
    }
    Ok(decode_packed_coils(packed, quantity))
}

fn request_pdu_size(req: &Request<'_>) -> io::Result<usize> {
    use crate::frame::Request::*;
    let size = match req {
        ReadCoils(_, _)
        | ReadDiscreteInputs(_, _)
        | ReadInputRegisters(_, _)
        | ReadHoldingRegisters(_, _)
        | WriteSingleRegister(_, _)
        | WriteSingleCoil(_, _) => 5,
        WriteMultipleCoils(_, coils) => 6 + packed_coils_size(coils),
        WriteMultipleRegisters(_, data) => 6 + data.len() * 2,
    };
    if size > MAX_PDU_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "request PDU size exceeded",
        ));
    }
    Ok(size)
}

fn response_pdu_size(rsp: &Response) -> io::Result<usize> {
    use crate::frame::Response::*;
    let size = match rsp {
        ReadCoils(coils) | ReadDiscreteInputs(coils) => 2 + packed_coils_size(coils),
        WriteSingleCoil(_, _)
        | WriteMultipleCoils(_, _)
        | WriteMultipleRegisters(_, _)
        | WriteSingleRegister(_, _) => 5,
        ReadInputRegisters(data) | ReadHoldingRegisters(data) => 2 + data.len() * 2,
    };
    if size > MAX_PDU_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "response PDU size exceeded",
        ));
    }
    Ok(size)
}

fn response_result_pdu_size(res: &Result<Response, ExceptionResponse>) -> io::Result<usize> {
    match res {
        Ok(rsp) => response_pdu_size(rsp),
        Err(_) => Ok(2),
    }
}
