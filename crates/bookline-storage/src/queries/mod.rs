// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the Bookline schema.

pub mod admin_replies;
pub mod conversations;
pub mod jobs;
