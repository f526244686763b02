// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable delayed execution for Bookline follow-ups.
//!
//! [`SqliteFollowUpScheduler`] persists follow-up jobs into the shared
//! database (the conversation id is the idempotency key), and
//! [`SchedulerRunner`] polls for due jobs, drives the engine's follow-up
//! transition, and re-pends failed attempts until their attempt budget is
//! spent. Delivery is at-least-once by design; the engine's conditional
//! state checks make duplicate firings harmless. The runner also owns the
//! TTL retention sweep.

pub mod runner;
pub mod schedule;

pub use runner::SchedulerRunner;
pub use schedule::SqliteFollowUpScheduler;
