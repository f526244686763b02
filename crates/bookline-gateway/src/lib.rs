// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP ingestion gateway for Bookline.
//!
//! Exposes the three external triggers of the conversation lifecycle as
//! HTTP endpoints (booking webhook, inbound-SMS notification, manual
//! admin reply) plus a conversation listing and a health probe. Booking
//! payloads are verified against the provider signature before any
//! parsing happens.

pub mod handlers;
pub mod server;
pub mod signature;

pub use server::{build_router, start_server, AppState};
