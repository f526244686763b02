// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking-payload contact extraction.
//!
//! Phone candidates are tried through an explicit ordered strategy list:
//! the dedicated SMS reminder field, the text reminder field, the plain
//! phone field, then free-text question/answer pairs whose question
//! mentions "phone" or "mobile". The first candidate that normalizes to a
//! valid number wins. A deep fallback scans the entire serialized payload
//! with regex patterns, and only runs after every structured strategy has
//! failed, since some integrations bury the number in unstructured fields.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::phone;

/// Placeholder used when a booking carries no usable client name.
pub const DEFAULT_CLIENT_NAME: &str = "Valued Client";

/// A calendar-provider webhook envelope: `{event, payload}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookingEvent {
    /// Event kind, e.g. `invitee.created`. Anything else is ignored upstream.
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub payload: BookingPayload,
}

/// The booking payload carried by an `invitee.created` event.
///
/// Every field is optional; provider payloads vary widely and extraction
/// works off whatever is present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookingPayload {
    #[serde(default)]
    pub event: EventDetails,
    #[serde(default)]
    pub invitee: InviteeDetails,
    #[serde(default)]
    pub questions_and_answers: Vec<QuestionAnswer>,
}

/// Calendar event metadata, opaque to the engine beyond templating.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventDetails {
    #[serde(default, alias = "uuid")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Invitee contact details.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InviteeDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sms_reminder_number: Option<String>,
    #[serde(default)]
    pub text_reminder_number: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A free-text question/answer pair from the booking form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuestionAnswer {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// A successfully extracted and normalized contact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContact {
    /// E.164 phone number.
    pub phone_number: String,
    pub client_name: String,
    pub event_id: Option<String>,
    pub event_title: Option<String>,
    pub event_start_time: Option<String>,
    pub event_end_time: Option<String>,
    /// When the booking itself was created, used for conversation-id derivation.
    pub event_created_at: Option<String>,
}

/// Tagged extraction result. Malformed JSON never reaches this layer; the
/// gateway rejects it at the serde boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactOutcome {
    Extracted(ExtractedContact),
    MissingPhone,
}

/// One named phone-extraction strategy over the structured payload.
type Strategy = (&'static str, fn(&BookingPayload) -> Vec<String>);

/// Structured strategies in priority order. First valid candidate wins;
/// no merging across strategies.
const STRATEGIES: &[Strategy] = &[
    ("sms_reminder_number", |p| {
        p.invitee.sms_reminder_number.iter().cloned().collect()
    }),
    ("text_reminder_number", |p| {
        p.invitee.text_reminder_number.iter().cloned().collect()
    }),
    ("phone_number", |p| {
        p.invitee.phone_number.iter().cloned().collect()
    }),
    ("questions_and_answers", |p| {
        p.questions_and_answers
            .iter()
            .filter(|qa| {
                let q = qa.question.to_lowercase();
                q.contains("phone") || q.contains("mobile")
            })
            .map(|qa| qa.answer.clone())
            .collect()
    }),
];

/// Regex patterns for the deep free-text scan, in trial order:
/// E.164-like, US-formatted, bare 10/11-digit runs.
static DEEP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\+[0-9][0-9\-\.\s\(\)]{5,18}[0-9]").unwrap(),
        Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
        Regex::new(r"\b\d{10,11}\b").unwrap(),
    ]
});

/// Extract a phone number from the structured payload fields only.
///
/// Returns the normalized E.164 number of the first candidate that
/// validates, or `None` when every structured strategy fails.
pub fn extract_phone(payload: &BookingPayload) -> Option<String> {
    for (name, candidates) in STRATEGIES {
        for candidate in candidates(payload) {
            let normalized = phone::normalize(&candidate);
            if phone::is_valid(&normalized) {
                debug!(strategy = name, "phone extracted from structured field");
                return Some(normalized);
            }
        }
    }
    None
}

/// Extract a phone number, falling back to a regex scan over the entire
/// serialized payload when the structured fields fail.
pub fn extract_phone_deep(payload: &BookingPayload) -> Option<String> {
    if let Some(found) = extract_phone(payload) {
        return Some(found);
    }

    let haystack = serde_json::to_string(payload).unwrap_or_default();
    for pattern in DEEP_PATTERNS.iter() {
        for m in pattern.find_iter(&haystack) {
            let normalized = phone::normalize(m.as_str());
            if phone::is_valid(&normalized) {
                debug!("phone extracted from free-text payload scan");
                return Some(normalized);
            }
        }
    }
    None
}

/// Extract the client display name.
///
/// Prefers the explicit full-name field, then first+last concatenation,
/// then a name-like question/answer pair (capitalized, since free-text
/// answers arrive in whatever casing the client typed), and finally the
/// [`DEFAULT_CLIENT_NAME`] placeholder.
pub fn extract_client_name(payload: &BookingPayload) -> String {
    if let Some(name) = &payload.invitee.name {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let first = payload.invitee.first_name.as_deref().unwrap_or("").trim();
    let last = payload.invitee.last_name.as_deref().unwrap_or("").trim();
    if !first.is_empty() || !last.is_empty() {
        return format!("{first} {last}").trim().to_string();
    }

    for qa in &payload.questions_and_answers {
        if qa.question.to_lowercase().contains("name") && !qa.answer.trim().is_empty() {
            return capitalize_words(qa.answer.trim());
        }
    }

    DEFAULT_CLIENT_NAME.to_string()
}

/// Extract the full contact (phone + name + event metadata) from a webhook
/// envelope, using the deep phone fallback.
pub fn extract_contact(event: &BookingEvent) -> ContactOutcome {
    let payload = &event.payload;
    match extract_phone_deep(payload) {
        Some(phone_number) => ContactOutcome::Extracted(ExtractedContact {
            phone_number,
            client_name: extract_client_name(payload),
            event_id: payload.event.id.clone(),
            event_title: payload.event.title.clone(),
            event_start_time: payload.event.start_time.clone(),
            event_end_time: payload.event.end_time.clone(),
            event_created_at: payload.event.created_at.clone(),
        }),
        None => ContactOutcome::MissingPhone,
    }
}

/// Capitalize the first letter of each whitespace-separated word.
fn capitalize_words(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with_invitee(invitee: InviteeDetails) -> BookingPayload {
        BookingPayload {
            invitee,
            ..Default::default()
        }
    }

    #[test]
    fn sms_reminder_number_has_highest_priority() {
        let payload = payload_with_invitee(InviteeDetails {
            sms_reminder_number: Some("+1-234-567-8900".into()),
            phone_number: Some("+15550001111".into()),
            ..Default::default()
        });
        assert_eq!(extract_phone(&payload).as_deref(), Some("+12345678900"));
    }

    #[test]
    fn invalid_higher_priority_candidate_falls_through() {
        let payload = payload_with_invitee(InviteeDetails {
            sms_reminder_number: Some("n/a".into()),
            text_reminder_number: Some("555-123-4567".into()),
            ..Default::default()
        });
        assert_eq!(extract_phone(&payload).as_deref(), Some("+15551234567"));
    }

    #[test]
    fn question_answer_pairs_are_matched_case_insensitively() {
        let payload = BookingPayload {
            questions_and_answers: vec![
                QuestionAnswer {
                    question: "Anything to add?".into(),
                    answer: "no".into(),
                },
                QuestionAnswer {
                    question: "Best Mobile number to reach you".into(),
                    answer: "(555) 987-6543".into(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(extract_phone(&payload).as_deref(), Some("+15559876543"));
    }

    #[test]
    fn no_structured_candidate_returns_none() {
        let payload = BookingPayload::default();
        assert!(extract_phone(&payload).is_none());
    }

    #[test]
    fn deep_scan_finds_number_buried_in_free_text() {
        let payload = BookingPayload {
            questions_and_answers: vec![QuestionAnswer {
                question: "Notes".into(),
                answer: "call me at 555-123-4567 after 5pm".into(),
            }],
            ..Default::default()
        };
        // The question does not mention phone/mobile, so the structured
        // strategies fail and the regex fallback must find it.
        assert!(extract_phone(&payload).is_none());
        assert_eq!(extract_phone_deep(&payload).as_deref(), Some("+15551234567"));
    }

    #[test]
    fn deep_scan_prefers_e164_pattern() {
        let payload = BookingPayload {
            questions_and_answers: vec![QuestionAnswer {
                question: "Notes".into(),
                answer: "primary +44 7911 123456, backup 555-123-4567".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            extract_phone_deep(&payload).as_deref(),
            Some("+447911123456")
        );
    }

    #[test]
    fn full_name_field_wins() {
        let payload = payload_with_invitee(InviteeDetails {
            name: Some("John Doe".into()),
            first_name: Some("Jane".into()),
            last_name: Some("Smith".into()),
            ..Default::default()
        });
        assert_eq!(extract_client_name(&payload), "John Doe");
    }

    #[test]
    fn first_last_concatenation_trims() {
        let payload = payload_with_invitee(InviteeDetails {
            first_name: Some("  Jane ".into()),
            last_name: Some(" Smith ".into()),
            ..Default::default()
        });
        assert_eq!(extract_client_name(&payload), "Jane Smith");
    }

    #[test]
    fn first_name_only_has_no_trailing_space() {
        let payload = payload_with_invitee(InviteeDetails {
            first_name: Some("Jane".into()),
            ..Default::default()
        });
        assert_eq!(extract_client_name(&payload), "Jane");
    }

    #[test]
    fn scanned_name_is_capitalized() {
        let payload = BookingPayload {
            questions_and_answers: vec![QuestionAnswer {
                question: "Your name".into(),
                answer: "john doe".into(),
            }],
            ..Default::default()
        };
        assert_eq!(extract_client_name(&payload), "John Doe");
    }

    #[test]
    fn missing_everything_falls_back_to_placeholder() {
        assert_eq!(
            extract_client_name(&BookingPayload::default()),
            DEFAULT_CLIENT_NAME
        );
    }

    #[test]
    fn extract_contact_carries_event_metadata() {
        let event = BookingEvent {
            event: "invitee.created".into(),
            payload: BookingPayload {
                event: EventDetails {
                    id: Some("evt-42".into()),
                    title: Some("Consultation".into()),
                    start_time: Some("2026-03-01T15:00:00Z".into()),
                    end_time: Some("2026-03-01T15:30:00Z".into()),
                    created_at: Some("2026-02-28T09:00:00Z".into()),
                },
                invitee: InviteeDetails {
                    name: Some("John Doe".into()),
                    sms_reminder_number: Some("+1-234-567-8900".into()),
                    ..Default::default()
                },
                questions_and_answers: vec![],
            },
        };
        match extract_contact(&event) {
            ContactOutcome::Extracted(contact) => {
                assert_eq!(contact.phone_number, "+12345678900");
                assert_eq!(contact.client_name, "John Doe");
                assert_eq!(contact.event_id.as_deref(), Some("evt-42"));
                assert_eq!(contact.event_title.as_deref(), Some("Consultation"));
            }
            other => panic!("expected extraction, got {other:?}"),
        }
    }

    #[test]
    fn extract_contact_reports_missing_phone() {
        let event = BookingEvent {
            event: "invitee.created".into(),
            payload: BookingPayload {
                invitee: InviteeDetails {
                    name: Some("John Doe".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        };
        assert_eq!(extract_contact(&event), ContactOutcome::MissingPhone);
    }

    #[test]
    fn uuid_alias_for_event_id_deserializes() {
        let json = r#"{
            "event": {"uuid": "evt-alias", "name": "Intro Call"},
            "invitee": {"phone_number": "5551234567"}
        }"#;
        let payload: BookingPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.event.id.as_deref(), Some("evt-alias"));
        assert_eq!(payload.event.title.as_deref(), Some("Intro Call"));
        assert_eq!(extract_phone(&payload).as_deref(), Some("+15551234567"));
    }
}
