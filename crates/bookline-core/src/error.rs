// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Bookline conversation engine.

use thiserror::Error;

/// The primary error type used across all Bookline adapter traits and core operations.
#[derive(Debug, Error)]
pub enum BooklineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// SMS transport errors (API failure, rejected destination, rate limiting).
    #[error("sms transport error: {message}")]
    Sms {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Scheduler errors (job persistence failure, runner shutdown).
    #[error("scheduler error: {message}")]
    Schedule {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
