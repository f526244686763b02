// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message rendering.
//!
//! Templates come from configuration and support `{client_name}`,
//! `{event_title}`, and `{event_start_time}` placeholders. Length is
//! enforced here, before any transport call.

use bookline_core::BooklineError;

/// Fallback for a missing event title.
const FALLBACK_TITLE: &str = "your appointment";
/// Fallback for a missing event start time.
const FALLBACK_START: &str = "the scheduled time";

/// Render a message template with the conversation's display values.
pub fn render(
    template: &str,
    client_name: &str,
    event_title: Option<&str>,
    event_start_time: Option<&str>,
) -> String {
    template
        .replace("{client_name}", client_name)
        .replace("{event_title}", event_title.unwrap_or(FALLBACK_TITLE))
        .replace(
            "{event_start_time}",
            event_start_time.unwrap_or(FALLBACK_START),
        )
}

/// Reject messages over the configured outbound cap.
pub fn check_length(message: &str, max_length: usize) -> Result<(), BooklineError> {
    let len = message.chars().count();
    if len > max_length {
        return Err(BooklineError::Sms {
            message: format!("message length {len} exceeds cap of {max_length} characters"),
            source: None,
        });
    }
    Ok(())
}
