// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads a sensor value from a slave device.
//!
//! The serial line is emulated in memory. With a real port, pass any
//! `AsyncRead + AsyncWrite` byte stream to [`attach_slave`] instead.
//! The framing is selected by the first argument: `rtu` (default) or `ascii`.

use serial_modbus::{attach_slave, prelude::*, ExceptionCode, ExceptionResponse, Protocol};
use tokio::io::{duplex, DuplexStream};

const SENSOR: Slave = Slave(0x17);

/// A device that only knows the two registers of its sensor value.
async fn sensor(line: DuplexStream, config: Config) -> Result<(), serial_modbus::Error> {
    let mut protocol = Protocol::new(line, &config);
    loop {
        let adu = protocol.recv_request().await?;
        if adu.slave() != SENSOR {
            continue;
        }
        let response = match adu.request() {
            Request::ReadHoldingRegisters(0x082B, 2) => {
                Ok(Response::ReadHoldingRegisters(vec![0x0001, 0x86A0]))
            }
            request => Err(ExceptionResponse {
                function: request.function_code(),
                exception: ExceptionCode::IllegalDataAddress,
            }),
        };
        protocol.send_response(SENSOR, response).await?;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Mode>()?,
        None => Mode::Rtu,
    };
    let config = Config::default().with_mode(mode);

    let (line, device) = duplex(256);
    tokio::spawn(sensor(device, config.clone()));

    let mut ctx = attach_slave(line, &config, SENSOR);
    println!("Reading a sensor value over {mode}");
    let rsp = ctx.call(Request::ReadHoldingRegisters(0x082B, 2)).await??;
    println!("Sensor value is: {rsp:?}");

    println!("Reading an unknown register");
    match ctx.call(Request::ReadHoldingRegisters(0x0000, 1)).await? {
        Ok(rsp) => println!("Unexpected response: {rsp:?}"),
        Err(exception) => println!("Device answered with exception: {exception}"),
    }

    Ok(())
}
