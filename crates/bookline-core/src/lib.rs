// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and domain types for the Bookline
//! conversation engine.
//!
//! Everything that crosses a crate boundary lives here: the
//! [`ConversationRecord`] and its status machine, the adapter traits for
//! storage, SMS transport, and delayed execution, and the shared
//! [`BooklineError`] type.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BooklineError;
pub use traits::{ConversationStore, FollowUpScheduler, SmsTransport};
pub use types::{
    AdminReply, ConversationCursor, ConversationFilter, ConversationId, ConversationPage,
    ConversationPatch, ConversationRecord, ConversationStatus, CreateOutcome, FollowUpJob, SmsId,
};
