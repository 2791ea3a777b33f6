// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII transactions against a scripted device over an in-memory line.

use std::time::Duration;

use serial_modbus::{
    bytes::Bytes, Config, Error, Event, FrameError, Mode, Protocol, RawResponse, Request,
    Response, ResponseData, Slave,
};
use tokio::{
    io::{duplex, AsyncReadExt as _, AsyncWriteExt as _, DuplexStream},
    time::{sleep, Instant},
};

const TIMEOUT: Duration = Duration::from_millis(20);

fn config() -> Config {
    Config::default().with_mode(Mode::Ascii).with_timeout(TIMEOUT)
}

/// Expects `request` on the line and answers with `response` chunks.
async fn script_device(
    mut line: DuplexStream,
    request: &'static [u8],
    response: &'static [&'static [u8]],
) {
    let mut buf = vec![0; request.len()];
    line.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, request);
    for chunk in response {
        line.write_all(chunk).await.unwrap();
        sleep(Duration::from_millis(5)).await;
    }
    // keep the line open
    let _ = line.read(&mut buf).await;
}

#[tokio::test(start_paused = true)]
async fn read_holding_registers() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":0103006B00038E\r\n",
        &[b":010306022B0000006465\r\n"],
    ));

    let mut protocol = Protocol::new(line, &config());
    let started = Instant::now();
    let rsp = protocol
        .call(Slave(0x01), Request::ReadHoldingRegisters(0x6B, 3))
        .await??;
    assert_eq!(
        rsp,
        ResponseData::Parsed(Response::ReadHoldingRegisters(vec![0x022B, 0x0000, 0x0064]))
    );
    // The end delimiter completes the frame without waiting for silence.
    assert!(started.elapsed() < TIMEOUT);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn read_holding_registers_raw() -> anyhow::Result<()> {
    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":0103006B00038E\r\n",
        &[b":010306022B0000006465\r\n"],
    ));

    let mut protocol = Protocol::new(line, &config().with_parse_slave_data(false));
    let rsp = protocol
        .call(Slave(0x01), Request::ReadHoldingRegisters(0x6B, 3))
        .await??;
    assert_eq!(
        rsp,
        ResponseData::Raw(RawResponse::ReadHoldingRegisters(Bytes::from_static(&[
            0x02, 0x2B, 0x00, 0x00, 0x00, 0x64
        ])))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn read_discrete_inputs_in_chunks_after_noise() -> anyhow::Result<()> {
    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":010200C4001623\r\n",
        &[b"\x00\xFF:0102", b"03ACDB", b"353E\r", b"\n"],
    ));

    let mut protocol = Protocol::new(line, &config());
    let rsp = protocol
        .call(Slave(0x01), Request::ReadDiscreteInputs(0xC4, 0x16))
        .await??;
    let expected = [
        0, 0, 1, 1, 0, 1, 0, 1, //
        1, 1, 0, 1, 1, 0, 1, 1, //
        1, 0, 1, 0, 1, 1,
    ]
    .map(|bit| bit == 1);
    assert_eq!(
        rsp,
        ResponseData::Parsed(Response::ReadDiscreteInputs(expected.to_vec()))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn write_single_register_raw() -> anyhow::Result<()> {
    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":010600010003F5\r\n",
        &[b":010600010003F5\r\n"],
    ));

    let mut protocol = Protocol::new(line, &config().with_parse_slave_data(false));
    let rsp = protocol
        .call(Slave(0x01), Request::WriteSingleRegister(0x01, 0x03))
        .await??;
    assert_eq!(
        rsp,
        ResponseData::Raw(RawResponse::WriteSingleRegister(0x01, [0x00, 0x03]))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalid_checksum() {
    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":010600010003F5\r\n",
        &[b":010600010003F6\r\n"],
    ));

    let mut protocol = Protocol::new(line, &config());
    let err = protocol
        .call(Slave(0x01), Request::WriteSingleRegister(0x01, 0x03))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Frame(FrameError::InvalidChecksum)));
}

#[tokio::test(start_paused = true)]
async fn frame_timeout() {
    let (line, mut device) = duplex(256);
    let mut protocol = Protocol::new(line, &config());

    device.write_all(b":").await.unwrap();
    let started = Instant::now();
    assert_eq!(
        protocol.next_event().await.unwrap(),
        Some(Event::Error(FrameError::FrameTimeout))
    );
    assert!(started.elapsed() >= TIMEOUT);

    // The buffer is empty again.
    device.write_all(b":0103006B00038E\r\n").await.unwrap();
    assert_eq!(
        protocol.next_event().await.unwrap(),
        Some(Event::Message(Bytes::from_static(&[
            0x01, 0x03, 0x00, 0x6B, 0x00, 0x03
        ])))
    );
}

#[tokio::test(start_paused = true)]
async fn frame_timeout_while_waiting_for_response() {
    let (line, device) = duplex(256);
    tokio::spawn(script_device(
        device,
        b":0103006B00038E\r\n",
        &[b":010306022B00"],
    ));

    let mut protocol = Protocol::new(line, &config());
    let err = protocol
        .call(Slave(0x01), Request::ReadHoldingRegisters(0x6B, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Frame(FrameError::FrameTimeout)));
    assert_eq!(err.to_string(), "Frame timeout");
}

#[tokio::test(start_paused = true)]
async fn garbage_without_start_delimiter_is_ignored() {
    let (line, mut device) = duplex(256);
    let mut protocol = Protocol::new(line, &config());

    device.write_all(b"0103006B00038E\r\n").await.unwrap();
    device.write_all(b":0103006B00038E\r\n").await.unwrap();
    assert_eq!(
        protocol.next_event().await.unwrap(),
        Some(Event::Message(Bytes::from_static(&[
            0x01, 0x03, 0x00, 0x6B, 0x00, 0x03
        ])))
    );
}

#[tokio::test(start_paused = true)]
async fn partial_frame_is_discarded_before_request() -> anyhow::Result<()> {
    let (line, mut device) = duplex(256);
    let mut protocol = Protocol::new(line, &config());

    // A frame that started but is still pending when the next request goes out.
    device.write_all(b":0103").await?;
    let pending = tokio::time::timeout(Duration::from_millis(5), protocol.next_event()).await;
    assert!(pending.is_err());

    tokio::spawn(script_device(
        device,
        b":0103006B00038E\r\n",
        &[b":010306022B0000006465\r\n"],
    ));
    let rsp = protocol
        .call(Slave(0x01), Request::ReadHoldingRegisters(0x6B, 3))
        .await??;
    assert_eq!(
        rsp,
        ResponseData::Parsed(Response::ReadHoldingRegisters(vec![0x022B, 0x0000, 0x0064]))
    );
    Ok(())
}
