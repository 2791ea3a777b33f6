// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session configuration.

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

/// Default silence/assembly window.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20);

/// Serial transmission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Binary frames delimited by line silence, CRC-16 checked.
    #[default]
    Rtu,

    /// Hex encoded frames delimited by `:` and `CR LF`, LRC checked.
    Ascii,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtu => f.write_str("rtu"),
            Self::Ascii => f.write_str("ascii"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transmission mode: {0:?}")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rtu") {
            Ok(Self::Rtu)
        } else if s.eq_ignore_ascii_case("ascii") {
            Ok(Self::Ascii)
        } else {
            Err(ParseModeError(s.to_owned()))
        }
    }
}

/// Shape of decoded response data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataMode {
    /// Bits and registers are unpacked into
    /// [`Response`](crate::Response) values.
    #[default]
    Parsed,

    /// The payload bytes are passed through as
    /// [`RawResponse`](crate::RawResponse) values.
    Raw,
}

/// Settings of a serial session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Config {
    /// Silence window (RTU) or frame assembly window (ASCII).
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub timeout: Duration,

    pub mode: Mode,

    /// Decode responses into values instead of passing the payload through.
    pub parse_slave_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            mode: Mode::default(),
            parse_slave_data: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_parse_slave_data(mut self, parse_slave_data: bool) -> Self {
        self.parse_slave_data = parse_slave_data;
        self
    }

    #[must_use]
    pub const fn data_mode(&self) -> DataMode {
        if self.parse_slave_data {
            DataMode::Parsed
        } else {
            DataMode::Raw
        }
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize as _, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
