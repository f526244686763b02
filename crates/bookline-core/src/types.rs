// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Bookline crates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

/// Conversation records expire this many days after creation.
pub const CONVERSATION_TTL_DAYS: i64 = 90;

/// Upper bound on stored inbound response text and outbound message bodies.
pub const MAX_SMS_LENGTH: usize = 1600;

/// Identifier of a conversation, unique together with the phone number.
///
/// The id is derived deterministically from the booking (creation
/// timestamp + event id hash) so that redelivered webhooks map to the
/// same conversation, and it sorts lexicographically in time order so
/// "latest conversation for a phone number" is a plain descending scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Derive a conversation id from the booking creation time and a stable seed
    /// (normally the calendar event id).
    ///
    /// Layout: 13-digit zero-padded unix milliseconds, a dash, and the first
    /// 8 hex chars of SHA-256 over the seed. Zero padding keeps lexicographic
    /// order equal to chronological order.
    pub fn derive(created_at: DateTime<Utc>, seed: &str) -> Self {
        let millis = created_at.timestamp_millis().max(0);
        let digest = Sha256::digest(seed.as_bytes());
        Self(format!("{millis:013}-{}", hex::encode(&digest[..4])))
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned to an outbound SMS by the transport provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmsId(pub String);

/// Lifecycle status of a conversation.
///
/// `ClientResponded` is reachable from any non-terminal state. `Completed`
/// is terminal and reserved for external closure; the engine never sets it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    InitialSent,
    AwaitingResponse,
    FollowUpScheduled,
    FollowUpSent,
    ClientResponded,
    Completed,
}

impl ConversationStatus {
    /// Statuses from which a follow-up send still makes sense.
    pub fn accepts_follow_up(self) -> bool {
        matches!(
            self,
            Self::AwaitingResponse | Self::InitialSent | Self::FollowUpScheduled
        )
    }

    /// Statuses in which an inbound client reply is recorded by the engine.
    pub fn accepts_response(self) -> bool {
        matches!(
            self,
            Self::AwaitingResponse
                | Self::InitialSent
                | Self::FollowUpScheduled
                | Self::FollowUpSent
        )
    }
}

/// Durable record of one automated SMS conversation tied to one booking.
///
/// Keyed by `(phone_number, conversation_id)`. Both key fields are immutable
/// once created; all mutation happens through the store's conditional update
/// operations so concurrent triggers cannot clobber each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// E.164 phone number of the client (partition key).
    pub phone_number: String,
    /// Time-ordered conversation id (sort key).
    pub conversation_id: ConversationId,
    /// Client display name; extraction supplies a placeholder when the
    /// booking carries no usable name.
    pub client_name: String,
    /// Calendar event id, opaque to the engine.
    pub event_id: Option<String>,
    /// Event title used in message templates.
    pub event_title: Option<String>,
    /// ISO-8601 event start, opaque beyond templating.
    pub event_start_time: Option<String>,
    /// ISO-8601 event end, opaque beyond templating.
    pub event_end_time: Option<String>,
    /// Whether the initial confirmation was successfully handed to the transport.
    pub initial_message_sent: bool,
    /// When the initial message was sent.
    pub initial_message_sent_at: Option<String>,
    /// Whether the follow-up was successfully handed to the transport.
    pub follow_up_sent: bool,
    /// When the follow-up was sent.
    pub follow_up_sent_at: Option<String>,
    /// Whether the client has replied.
    pub client_responded: bool,
    /// When the client replied.
    pub client_response_at: Option<String>,
    /// The client's reply text, truncated to [`MAX_SMS_LENGTH`].
    pub client_response_text: Option<String>,
    /// Current lifecycle status.
    pub status: ConversationStatus,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation; refreshed on every write.
    pub updated_at: String,
    /// Absolute expiry, unix epoch seconds. Fixed at creation.
    pub ttl: i64,
}

impl ConversationRecord {
    /// Build a fresh record in `AWAITING_RESPONSE` with nothing sent yet.
    ///
    /// `ttl` is fixed at `now` + [`CONVERSATION_TTL_DAYS`].
    pub fn new(
        phone_number: String,
        conversation_id: ConversationId,
        client_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        let created_at = format_iso(now);
        Self {
            phone_number,
            conversation_id,
            client_name,
            event_id: None,
            event_title: None,
            event_start_time: None,
            event_end_time: None,
            initial_message_sent: false,
            initial_message_sent_at: None,
            follow_up_sent: false,
            follow_up_sent_at: None,
            client_responded: false,
            client_response_at: None,
            client_response_text: None,
            status: ConversationStatus::AwaitingResponse,
            created_at: created_at.clone(),
            updated_at: created_at,
            ttl: (now + Duration::days(CONVERSATION_TTL_DAYS)).timestamp(),
        }
    }
}

/// A manual message a human operator sent into a conversation thread.
///
/// Admin replies are an append-only side channel; they never alter the
/// automated state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminReply {
    pub phone_number: String,
    pub conversation_id: ConversationId,
    pub message: String,
    /// ISO-8601 send timestamp.
    pub sent_at: String,
    /// Operator identifier.
    pub sent_by: String,
}

/// Payload carried by a scheduled follow-up callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpJob {
    pub phone_number: String,
    pub conversation_id: ConversationId,
    pub client_name: String,
    /// ISO-8601 time the follow-up should fire.
    pub scheduled_time: String,
}

/// Result of a conditional conversation create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The record was inserted.
    Created,
    /// A record with the same key already existed; nothing was written.
    AlreadyExists,
}

/// Partial update applied to a conversation record.
///
/// Field sets are idempotent (safe to retry); `updated_at` is refreshed by
/// the store on every application regardless of which fields are present.
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub status: Option<ConversationStatus>,
    pub client_name: Option<String>,
    pub initial_message_sent: Option<bool>,
    pub initial_message_sent_at: Option<String>,
}

/// Keyset cursor into a conversation listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationCursor {
    pub conversation_id: ConversationId,
    pub phone_number: String,
}

/// Filter and pagination for conversation listings.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
    pub cursor: Option<ConversationCursor>,
    pub limit: Option<u32>,
}

/// One page of a conversation listing.
#[derive(Debug, Clone)]
pub struct ConversationPage {
    pub items: Vec<ConversationRecord>,
    /// Cursor for the next page, `None` when exhausted.
    pub next_cursor: Option<ConversationCursor>,
}

/// Format a timestamp the way all Bookline records store time:
/// ISO-8601 UTC with millisecond precision and a `Z` suffix.
pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Current time in the canonical record format.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}
