// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS transport trait for outbound text delivery.

use async_trait::async_trait;

use crate::error::BooklineError;
use crate::types::SmsId;

/// Adapter for an outbound SMS provider.
///
/// Callers are responsible for validating message length before sending;
/// the transport only moves bytes.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Sends `body` to the E.164 number `to`, returning the provider's
    /// message id on success.
    async fn send(&self, to: &str, body: &str) -> Result<SmsId, BooklineError>;
}
