// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use serial_modbus::{
    Config, Error, ExceptionCode, ExceptionResponse, Protocol, Request, Response, Slave,
};
use tokio::io::{AsyncRead, AsyncWrite};

pub const DEVICE: Slave = Slave(0x11);

/// Answers every request with an exception.
pub fn exceptions(req: Request<'static>) -> Result<Response, ExceptionCode> {
    use Request::*;

    match req {
        ReadCoils(_, _) => Err(ExceptionCode::Acknowledge),
        ReadDiscreteInputs(_, _) => Err(ExceptionCode::GatewayPathUnavailable),
        WriteSingleCoil(_, _) => Err(ExceptionCode::GatewayTargetDevice),
        WriteMultipleCoils(_, _) => Err(ExceptionCode::IllegalDataAddress),
        ReadInputRegisters(_, _) => Err(ExceptionCode::IllegalDataValue),
        ReadHoldingRegisters(_, _) => Err(ExceptionCode::IllegalFunction),
        WriteSingleRegister(_, _) => Err(ExceptionCode::MemoryParityError),
        WriteMultipleRegisters(_, _) => Err(ExceptionCode::ServerDeviceBusy),
    }
}

/// Answers reads with values derived from the addresses and echoes writes.
///
/// - coils: every even address is ON
/// - discrete inputs: every address is ON
/// - holding registers: the address
/// - input registers: twice the address
pub fn values(req: Request<'static>) -> Result<Response, ExceptionCode> {
    use Request::*;

    let rsp = match req {
        ReadCoils(addr, cnt) => {
            Response::ReadCoils((addr..addr + cnt).map(|a| a % 2 == 0).collect())
        }
        ReadDiscreteInputs(_, cnt) => Response::ReadDiscreteInputs(vec![true; cnt.into()]),
        ReadHoldingRegisters(addr, cnt) => {
            Response::ReadHoldingRegisters((addr..addr + cnt).collect())
        }
        ReadInputRegisters(addr, cnt) => {
            Response::ReadInputRegisters((addr..addr + cnt).map(|a| a * 2).collect())
        }
        WriteSingleCoil(addr, coil) => Response::WriteSingleCoil(addr, coil),
        WriteSingleRegister(addr, word) => Response::WriteSingleRegister(addr, word),
        WriteMultipleCoils(addr, coils) => Response::WriteMultipleCoils(addr, coils.len() as u16),
        WriteMultipleRegisters(addr, words) => {
            Response::WriteMultipleRegisters(addr, words.len() as u16)
        }
    };
    Ok(rsp)
}

/// Emulates the slave [`DEVICE`] until the line is closed.
pub async fn serve<T, F>(transport: T, config: Config, handle: F)
where
    T: AsyncRead + AsyncWrite + Unpin,
    F: Fn(Request<'static>) -> Result<Response, ExceptionCode>,
{
    let mut protocol = Protocol::new(transport, &config);
    loop {
        let adu = match protocol.recv_request().await {
            Ok(adu) => adu,
            Err(Error::Frame(err)) => {
                log::warn!("Device dropped frame: {err}");
                continue;
            }
            Err(err) => {
                log::debug!("Device stopped: {err}");
                return;
            }
        };
        let slave = adu.slave();
        if slave != DEVICE && !slave.is_broadcast() {
            continue;
        }
        let function = adu.request().function_code();
        let rsp = handle(adu.into()).map_err(|exception| ExceptionResponse {
            function,
            exception,
        });
        if slave.is_broadcast() {
            continue;
        }
        if protocol.send_response(slave, rsp).await.is_err() {
            return;
        }
    }
}
