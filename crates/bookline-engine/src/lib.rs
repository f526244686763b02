// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle state machine for Bookline.
//!
//! The [`LifecycleEngine`] orchestrates the automated SMS conversation
//! around a booking: record creation and the initial confirmation on
//! webhook ingestion, the delayed follow-up when the client stays quiet,
//! inbound-reply matching, and the manual operator side channel. Each
//! trigger is an independent stateless invocation; all synchronization
//! happens through the store's conditional updates.

pub mod lifecycle;
pub mod messages;

pub use lifecycle::{
    BookingOutcome, FollowUpOutcome, FollowUpSkip, InboundOutcome, LifecycleEngine,
};
