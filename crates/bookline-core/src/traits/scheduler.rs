// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed-execution trait for follow-up scheduling.

use async_trait::async_trait;

use crate::error::BooklineError;
use crate::types::FollowUpJob;

/// Adapter for scheduling a follow-up callback at a future time.
///
/// Delivery is at-least-once; the engine's own state checks make a
/// duplicate or late firing a no-op. Implementations must treat the job's
/// `conversation_id` as an idempotency key: scheduling the same
/// conversation twice registers one callback.
#[async_trait]
pub trait FollowUpScheduler: Send + Sync {
    /// Registers `job` to fire at `job.scheduled_time`.
    async fn schedule(&self, job: &FollowUpJob) -> Result<(), BooklineError>;
}
