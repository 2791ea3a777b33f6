// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus master seam

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{frame::*, slave::*, Result};

/// Mode independent asynchronous client trait
///
/// One call is one transaction: the request is framed and written, then the
/// matching response is awaited. Callers that share a line must serialize
/// their calls.
#[async_trait]
pub trait Client: SlaveContext + Send + Debug {
    /// Invokes a _Modbus_ function.
    async fn call(&mut self, request: Request<'_>) -> Result<ResponseData>;
}
