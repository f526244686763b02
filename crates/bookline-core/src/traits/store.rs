// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable conversation store trait.

use async_trait::async_trait;

use crate::error::BooklineError;
use crate::types::{
    AdminReply, ConversationFilter, ConversationId, ConversationPage, ConversationPatch,
    ConversationRecord, CreateOutcome,
};

/// Adapter for the durable conversation record store.
///
/// All operations are scoped to a single `(phone_number, conversation_id)`
/// key; no cross-record locking exists or is needed. The conditional
/// operations ([`claim_follow_up`](Self::claim_follow_up),
/// [`record_response`](Self::record_response)) are the synchronization
/// primitive between the follow-up timer and the inbound-reply handler:
/// both race on the same record and whichever write lands first wins.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Inserts a new record. Returns [`CreateOutcome::AlreadyExists`]
    /// without writing anything when the key is already present, making
    /// webhook redelivery a no-op.
    async fn create(&self, record: &ConversationRecord) -> Result<CreateOutcome, BooklineError>;

    /// Fetches one record by key.
    async fn get(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, BooklineError>;

    /// Fetches the most recent conversation for a phone number
    /// (conversation ids are time-ordered, so this is a descending scan,
    /// limit 1).
    async fn get_latest(
        &self,
        phone_number: &str,
    ) -> Result<Option<ConversationRecord>, BooklineError>;

    /// Applies a partial update. Always refreshes `updated_at`; field sets
    /// are idempotent and safe to retry.
    async fn update(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        patch: ConversationPatch,
    ) -> Result<(), BooklineError>;

    /// Atomically claims the follow-up send: sets `follow_up_sent`,
    /// `follow_up_sent_at`, and `status = FOLLOW_UP_SENT` only while the
    /// client has not responded, no follow-up was sent, and the status
    /// still accepts one. Returns `true` iff this call won the claim.
    async fn claim_follow_up(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        now: &str,
    ) -> Result<bool, BooklineError>;

    /// Compensates a claimed follow-up whose transport send failed, so the
    /// scheduler's retry is not starved by the already-set flag. Only
    /// reverts if the client still has not responded.
    async fn release_follow_up(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<(), BooklineError>;

    /// Atomically records an inbound client reply: sets `client_responded`,
    /// `client_response_at`, `client_response_text`, and
    /// `status = CLIENT_RESPONDED`, gated on `client_responded` still being
    /// false and the status accepting a response. Returns `true` iff the
    /// response was recorded by this call.
    async fn record_response(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        text: &str,
        now: &str,
    ) -> Result<bool, BooklineError>;

    /// Appends a manual operator reply to the conversation's side channel.
    /// Never touches status or the automated flags.
    async fn append_admin_reply(&self, reply: &AdminReply) -> Result<(), BooklineError>;

    /// Lists the admin replies of one conversation in send order.
    async fn list_admin_replies(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<Vec<AdminReply>, BooklineError>;

    /// Lists conversations, newest first, with optional status filter and
    /// keyset pagination.
    async fn list(&self, filter: ConversationFilter) -> Result<ConversationPage, BooklineError>;

    /// Deletes conversations (and their admin replies) whose `ttl` is at or
    /// before `now_epoch`. Returns the number of conversations removed.
    async fn purge_expired(&self, now_epoch: i64) -> Result<u64, BooklineError>;
}
