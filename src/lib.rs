// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A pure [Rust](https://www.rust-lang.org)
//! [Modbus](https://en.wikipedia.org/wiki/Modbus) serial line library
//! based on [tokio](https://tokio.rs).
//!
//! Both serial transmission modes are supported:
//!
//! - *RTU*: binary frames with a CRC-16 trailer. Frame boundaries are
//!   inferred from line silence.
//! - *ASCII*: hex encoded frames between `:` and `CR LF` with an LRC trailer.
//!
//! The serial port itself is not opened by this library. Any
//! [`AsyncRead`](tokio::io::AsyncRead) + [`AsyncWrite`](tokio::io::AsyncWrite)
//! stream can be attached.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use serial_modbus::prelude::*;
//! use tokio::io::{AsyncRead, AsyncWrite};
//!
//! async fn read_sensor<T>(port: T) -> anyhow::Result<()>
//! where
//!     T: AsyncRead + AsyncWrite + Unpin,
//! {
//!     let config = Config::default()
//!         .with_mode(Mode::Ascii)
//!         .with_timeout(Duration::from_millis(50));
//!     let mut ctx = serial_modbus::attach_slave(port, &config, Slave(0x11));
//!     let rsp = ctx.call(Request::ReadHoldingRegisters(0x6B, 3)).await??;
//!     if let ResponseData::Parsed(Response::ReadHoldingRegisters(words)) = rsp {
//!         println!("Sensor values: {words:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub use bytes;

pub mod client;
pub mod prelude;

mod codec;
mod config;
mod error;
mod frame;
mod serial;
mod slave;

pub use self::{
    codec::{
        ascii::AsciiCodec,
        checksum::{crc16, lrc},
        pack_coils,
        rtu::RtuCodec,
        serial::{Event, FrameCodec, Framing},
        unpack_coils,
    },
    config::{Config, DataMode, Mode, ParseModeError, DEFAULT_TIMEOUT},
    error::{Error, FrameError, ProtocolError},
    frame::{
        serial::{RequestAdu, RequestContext, ResponseAdu},
        Address, Coil, ExceptionCode, ExceptionResponse, FunctionCode, Quantity, RawResponse,
        Request, Response, ResponseData, Word,
    },
    serial::{attach_slave, ClientContext, Protocol},
    slave::{Slave, SlaveContext, SlaveId},
};

/// Specialized [`std::result::Result`] type for `Modbus` client API.
///
/// This [`Result`] type contains 2 layers of errors.
///
/// 1. [`Error`]: An unexpected protocol or network error that occurred during client/server communication.
/// 2. [`ExceptionCode`]: An error occurred on the _Modbus_ server.
pub type Result<T> = std::result::Result<std::result::Result<T, ExceptionCode>, Error>;
