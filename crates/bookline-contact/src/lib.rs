// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone normalization and booking-payload contact extraction.
//!
//! [`phone`] canonicalizes free-text phone strings into E.164 and rejects
//! implausible numbers. [`extract`] turns a booking webhook payload into a
//! normalized phone number and client display name via an ordered list of
//! extraction strategies, with a free-text regex fallback for integrations
//! that bury the number in unstructured fields.

pub mod extract;
pub mod phone;

pub use extract::{
    extract_client_name, extract_contact, extract_phone, extract_phone_deep, BookingEvent,
    BookingPayload, ContactOutcome, EventDetails, ExtractedContact, InviteeDetails,
    QuestionAnswer, DEFAULT_CLIENT_NAME,
};
pub use phone::{is_valid, normalize};
