// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Bookline conversation engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! operations for conversation records, the admin-reply side channel, and
//! the durable follow-up job queue. The conditional updates in
//! [`queries::conversations`] are the synchronization primitive that closes
//! the follow-up-vs-response race.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteConversationStore;
