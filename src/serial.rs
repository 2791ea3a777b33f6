// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, io};

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Encoder as _;

use crate::{
    bytes::BytesMut,
    codec::serial::{Event, FrameCodec as _, Framing},
    config::{Config, DataMode, Mode},
    frame::{serial::*, *},
    slave::*,
    Error, Result,
};

const READ_CHUNK_SIZE: usize = 256;

/// Binds a frame codec to a byte stream, e.g. a serial port.
///
/// Only one transaction is in flight at a time: the line is half-duplex.
#[derive(Debug)]
pub struct Protocol<T> {
    transport: T,
    framing: Framing,
    data_mode: DataMode,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl<T> Protocol<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            framing: Framing::new(config.mode, config.timeout),
            data_mode: config.data_mode(),
            read_buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            write_buf: BytesMut::new(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.framing.mode()
    }

    #[must_use]
    pub const fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T> Protocol<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Waits for the next frame cycle to resolve.
    ///
    /// Inbound chunks are fed to the frame codec until it yields a decoded
    /// frame or a frame error, either on arrival of a delimiter or when the
    /// line stays silent until the codec's deadline. Returns `None` once the
    /// transport reached end-of-stream and no frame is pending.
    pub async fn next_event(&mut self) -> io::Result<Option<Event>> {
        loop {
            self.read_buf.clear();
            self.read_buf.reserve(READ_CHUNK_SIZE);
            let read = self.transport.read_buf(&mut self.read_buf);
            let res = match self.framing.deadline() {
                Some(deadline) => match tokio::time::timeout_at(deadline, read).await {
                    Ok(res) => res,
                    Err(_elapsed) => {
                        if let Some(event) = self.framing.expire() {
                            return Ok(Some(event));
                        }
                        continue;
                    }
                },
                None => read.await,
            };
            let len = match res {
                Ok(len) => len,
                Err(err) => {
                    log::debug!("Failed to read from transport: {err}");
                    // A frame interrupted by a transport failure is lost.
                    self.framing.reset();
                    return Err(err);
                }
            };
            if len == 0 {
                log::trace!("End of stream");
                // A pending frame resolves right away.
                return Ok(self.framing.expire());
            }
            log::trace!("Read chunk: {:02X?}", &self.read_buf[..]);
            if let Some(event) = self.framing.push_bytes(&self.read_buf) {
                return Ok(Some(event));
            }
        }
    }

    /// Sends a request without waiting for the response.
    ///
    /// A partially received frame is discarded first. Broadcast requests
    /// to [`Slave::broadcast()`] are only sent this way.
    pub async fn send_request(
        &mut self,
        slave: Slave,
        request: Request<'_>,
    ) -> io::Result<RequestContext> {
        let request_adu = RequestAdu::new(slave, request);
        let request_context = request_adu.context();

        self.framing.reset();
        self.write_buf.clear();
        self.framing.encode(request_adu, &mut self.write_buf)?;
        self.write_frame().await?;

        Ok(request_context)
    }

    /// Receives the response for a previously sent request.
    pub async fn recv_response(&mut self, request_context: RequestContext) -> Result<ResponseData> {
        match self.next_event().await? {
            Some(Event::Message(frame)) => {
                decode_response(frame, request_context, self.data_mode)
            }
            Some(Event::Error(err)) => Err(err.into()),
            None => Err(io::Error::from(io::ErrorKind::BrokenPipe).into()),
        }
    }

    pub async fn call(&mut self, slave: Slave, request: Request<'_>) -> Result<ResponseData> {
        if slave.is_broadcast() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "broadcast requests are not answered",
            )
            .into());
        }
        let request_context = self.send_request(slave, request).await?;
        self.recv_response(request_context).await
    }

    /// Receives the next request, acting as a slave device.
    pub async fn recv_request(&mut self) -> std::result::Result<RequestAdu<'static>, Error> {
        match self.next_event().await? {
            Some(Event::Message(frame)) => Ok(RequestAdu::try_from(frame)?),
            Some(Event::Error(err)) => Err(err.into()),
            None => Err(io::Error::from(io::ErrorKind::BrokenPipe).into()),
        }
    }

    /// Answers a request, acting as a slave device.
    pub async fn send_response(
        &mut self,
        slave: Slave,
        response: std::result::Result<Response, ExceptionResponse>,
    ) -> io::Result<()> {
        let response_adu = ResponseAdu::new(slave, response);
        self.write_buf.clear();
        self.framing.encode(response_adu, &mut self.write_buf)?;
        self.write_frame().await
    }

    async fn write_frame(&mut self) -> io::Result<()> {
        log::debug!("Send frame: {:02X?}", &self.write_buf[..]);
        self.transport.write_all(&self.write_buf).await?;
        self.transport.flush().await
    }
}

/// Create a master bound to a single slave device.
pub fn attach_slave<T>(transport: T, config: &Config, slave: Slave) -> ClientContext<T> {
    ClientContext::new(Protocol::new(transport, config), slave)
}

/// _Modbus_ serial master with a selected slave.
///
/// The slave can be switched between method calls.
#[derive(Debug)]
pub struct ClientContext<T> {
    protocol: Protocol<T>,
    slave: Slave,
}

impl<T> ClientContext<T> {
    pub const fn new(protocol: Protocol<T>, slave: Slave) -> Self {
        Self { protocol, slave }
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.slave
    }

    pub fn protocol_mut(&mut self) -> &mut Protocol<T> {
        &mut self.protocol
    }

    pub fn into_protocol(self) -> Protocol<T> {
        self.protocol
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn call(&mut self, request: Request<'_>) -> Result<ResponseData> {
        log::debug!("Call {:?}", request);
        self.protocol.call(self.slave, request).await
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send + 'static,
{
    #[must_use]
    pub fn boxed(self) -> Box<dyn crate::client::Client> {
        Box::new(self)
    }
}

impl<T> SlaveContext for ClientContext<T> {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

#[async_trait::async_trait]
impl<T> crate::client::Client for ClientContext<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, req: Request<'_>) -> Result<ResponseData> {
        self.call(req).await
    }
}
