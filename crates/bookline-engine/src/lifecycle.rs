// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation lifecycle state machine.
//!
//! Three external triggers drive a conversation: a verified booking
//! webhook, a scheduled follow-up callback, and an inbound SMS
//! notification. Every trigger may be delivered more than once, so each
//! transition below is idempotent: redelivery no-ops on the store's
//! conditional writes instead of double-sending.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use bookline_config::model::BooklineConfig;
use bookline_contact::{extract_contact, BookingEvent, ContactOutcome};
use bookline_core::types::{format_iso, now_iso};
use bookline_core::{
    AdminReply, BooklineError, ConversationId, ConversationPatch, ConversationRecord,
    ConversationStore, CreateOutcome, FollowUpJob, FollowUpScheduler, SmsTransport,
};

use crate::messages;

/// The booking event kind this engine processes. Anything else is
/// acknowledged and ignored.
const BOOKING_EVENT_KIND: &str = "invitee.created";

/// Result of processing a booking webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    /// A new conversation was created and the confirmation sent.
    Created { conversation_id: ConversationId },
    /// The conversation already existed (webhook redelivery); nothing sent.
    Duplicate { conversation_id: ConversationId },
    /// The event kind is not of interest; acknowledged and ignored.
    IgnoredEvent,
    /// No phone number could be extracted; no record was created.
    MissingPhone,
}

/// Result of a follow-up firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpOutcome {
    /// The follow-up was sent.
    Sent,
    /// The follow-up was skipped; skips are successes, not errors.
    Skipped(FollowUpSkip),
}

/// Why a follow-up firing was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpSkip {
    /// The conversation no longer exists (purged).
    NotFound,
    /// The client already responded.
    AlreadyResponded,
    /// A follow-up was already sent (idempotent retry).
    AlreadySent,
    /// The conversation moved past the point where a follow-up makes sense.
    StatusPastFollowUp,
    /// The conditional claim lost against a concurrent write.
    LostRace,
}

/// Result of processing one inbound SMS notification.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// The reply was recorded and the conversation closed as responded.
    Recorded { conversation_id: ConversationId },
    /// No conversation exists for the originating number.
    NoConversation,
    /// The conversation was already responded/completed; the message is
    /// dropped from automated processing (admin side channel only).
    AlreadyClosed,
}

/// Orchestrates the conversation lifecycle over injected adapters.
///
/// Holds no conversation state of its own: every invocation reads current
/// state from the store and advances it with conditional writes, so the
/// engine runs correctly as concurrent stateless invocations.
pub struct LifecycleEngine {
    store: Arc<dyn ConversationStore>,
    transport: Arc<dyn SmsTransport>,
    scheduler: Arc<dyn FollowUpScheduler>,
    initial_template: String,
    follow_up_template: String,
    follow_up_delay: Duration,
    max_message_length: usize,
}

impl LifecycleEngine {
    /// Create an engine over the given adapters and configuration.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        transport: Arc<dyn SmsTransport>,
        scheduler: Arc<dyn FollowUpScheduler>,
        config: &BooklineConfig,
    ) -> Self {
        Self {
            store,
            transport,
            scheduler,
            initial_template: config.messages.initial_template.clone(),
            follow_up_template: config.messages.follow_up_template.clone(),
            follow_up_delay: Duration::minutes(config.follow_up.delay_minutes as i64),
            max_message_length: config.sms.max_message_length,
        }
    }

    /// Transition 1: a verified booking webhook arrived.
    ///
    /// Creates the conversation record, sends the initial confirmation,
    /// and schedules the follow-up. A transport failure is surfaced to the
    /// caller but the record stays in place with `initial_message_sent =
    /// false` -- an intentional partial-failure state for operator
    /// recovery, not a rollback. A scheduling failure is logged and
    /// swallowed; the follow-up is best-effort.
    pub async fn handle_booking(
        &self,
        event: &BookingEvent,
    ) -> Result<BookingOutcome, BooklineError> {
        if event.event != BOOKING_EVENT_KIND {
            debug!(kind = %event.event, "ignoring booking event of no interest");
            return Ok(BookingOutcome::IgnoredEvent);
        }

        let contact = match extract_contact(event) {
            ContactOutcome::Extracted(contact) => contact,
            ContactOutcome::MissingPhone => {
                warn!("booking payload has no extractable phone number");
                return Ok(BookingOutcome::MissingPhone);
            }
        };

        let booked_at = booking_instant(&contact.event_created_at, &contact.event_start_time);
        let seed = contact
            .event_id
            .clone()
            .unwrap_or_else(|| contact.phone_number.clone());
        let conversation_id = ConversationId::derive(booked_at, &seed);

        let now = Utc::now();
        let mut record = ConversationRecord::new(
            contact.phone_number.clone(),
            conversation_id.clone(),
            contact.client_name.clone(),
            now,
        );
        record.event_id = contact.event_id.clone();
        record.event_title = contact.event_title.clone();
        record.event_start_time = contact.event_start_time.clone();
        record.event_end_time = contact.event_end_time.clone();

        match self.store.create(&record).await? {
            CreateOutcome::Created => {}
            CreateOutcome::AlreadyExists => {
                info!(
                    phone = %contact.phone_number,
                    conversation = %conversation_id,
                    "booking already recorded, skipping"
                );
                return Ok(BookingOutcome::Duplicate { conversation_id });
            }
        }

        let body = messages::render(
            &self.initial_template,
            &contact.client_name,
            contact.event_title.as_deref(),
            contact.event_start_time.as_deref(),
        );
        messages::check_length(&body, self.max_message_length)?;

        // From here on the record exists. A failed send leaves it behind
        // with initial_message_sent = false so an operator can recover.
        self.transport.send(&contact.phone_number, &body).await?;

        let sent_at = now_iso();
        self.store
            .update(
                &contact.phone_number,
                &conversation_id,
                ConversationPatch {
                    initial_message_sent: Some(true),
                    initial_message_sent_at: Some(sent_at.clone()),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            phone = %contact.phone_number,
            conversation = %conversation_id,
            "conversation created, confirmation sent"
        );

        let job = FollowUpJob {
            phone_number: contact.phone_number.clone(),
            conversation_id: conversation_id.clone(),
            client_name: contact.client_name.clone(),
            scheduled_time: format_iso(Utc::now() + self.follow_up_delay),
        };
        if let Err(e) = self.scheduler.schedule(&job).await {
            warn!(
                conversation = %conversation_id,
                error = %e,
                "follow-up scheduling failed; continuing without it"
            );
        }

        Ok(BookingOutcome::Created { conversation_id })
    }

    /// Transition 2: a scheduled follow-up fired.
    ///
    /// The pre-checks below are advisory fast paths; the conditional claim
    /// is what actually arbitrates against a concurrently arriving reply.
    /// A transport failure releases the claim and propagates, so the
    /// scheduler's retry policy re-attempts -- a silently dropped
    /// follow-up is a business-visible miss.
    pub async fn handle_follow_up(
        &self,
        job: &FollowUpJob,
    ) -> Result<FollowUpOutcome, BooklineError> {
        let record = match self
            .store
            .get(&job.phone_number, &job.conversation_id)
            .await?
        {
            Some(record) => record,
            None => {
                debug!(conversation = %job.conversation_id, "follow-up: conversation not found");
                return Ok(FollowUpOutcome::Skipped(FollowUpSkip::NotFound));
            }
        };

        if record.client_responded {
            debug!(conversation = %job.conversation_id, "follow-up: client already responded");
            return Ok(FollowUpOutcome::Skipped(FollowUpSkip::AlreadyResponded));
        }
        if record.follow_up_sent {
            debug!(conversation = %job.conversation_id, "follow-up: already sent");
            return Ok(FollowUpOutcome::Skipped(FollowUpSkip::AlreadySent));
        }
        if !record.status.accepts_follow_up() {
            debug!(
                conversation = %job.conversation_id,
                status = %record.status,
                "follow-up: conversation moved past follow-up"
            );
            return Ok(FollowUpOutcome::Skipped(FollowUpSkip::StatusPastFollowUp));
        }

        let body = messages::render(
            &self.follow_up_template,
            &record.client_name,
            record.event_title.as_deref(),
            record.event_start_time.as_deref(),
        );
        messages::check_length(&body, self.max_message_length)?;

        // Claim before sending: a reply recorded at any point before this
        // write makes the claim lose and the follow-up a no-op.
        let claimed = self
            .store
            .claim_follow_up(&job.phone_number, &job.conversation_id, &now_iso())
            .await?;
        if !claimed {
            debug!(conversation = %job.conversation_id, "follow-up: lost claim to concurrent write");
            return Ok(FollowUpOutcome::Skipped(FollowUpSkip::LostRace));
        }

        if let Err(e) = self.transport.send(&job.phone_number, &body).await {
            // Give the claim back so the retry is not starved by the flag.
            self.store
                .release_follow_up(&job.phone_number, &job.conversation_id)
                .await?;
            return Err(e);
        }

        info!(
            phone = %job.phone_number,
            conversation = %job.conversation_id,
            "follow-up sent"
        );
        Ok(FollowUpOutcome::Sent)
    }

    /// Transition 3: an inbound SMS notification arrived.
    ///
    /// One provider delivery may fan out to several notifications; each is
    /// processed independently through this method and redelivery no-ops
    /// on the conditional write.
    pub async fn handle_inbound_sms(
        &self,
        from: &str,
        body: &str,
    ) -> Result<InboundOutcome, BooklineError> {
        let phone = bookline_contact::phone::normalize(from);
        if !bookline_contact::phone::is_valid(&phone) {
            warn!(from, "inbound sms with implausible origination number");
            return Ok(InboundOutcome::NoConversation);
        }

        let record = match self.store.get_latest(&phone).await? {
            Some(record) => record,
            None => {
                debug!(phone = %phone, "inbound sms with no matching conversation");
                return Ok(InboundOutcome::NoConversation);
            }
        };

        if !record.status.accepts_response() {
            debug!(
                conversation = %record.conversation_id,
                status = %record.status,
                "inbound sms on closed conversation dropped from automated processing"
            );
            return Ok(InboundOutcome::AlreadyClosed);
        }

        let recorded = self
            .store
            .record_response(&phone, &record.conversation_id, body, &now_iso())
            .await?;
        if !recorded {
            return Ok(InboundOutcome::AlreadyClosed);
        }

        info!(
            phone = %phone,
            conversation = %record.conversation_id,
            "client response recorded"
        );
        Ok(InboundOutcome::Recorded {
            conversation_id: record.conversation_id,
        })
    }

    /// Manual operator reply into a conversation thread.
    ///
    /// Sends, then appends to the admin side channel. Deliberately never
    /// reads or writes conversation status, so it cannot interfere with
    /// the automated race between the follow-up and an inbound reply.
    pub async fn send_manual_reply(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        message: &str,
        sent_by: &str,
    ) -> Result<AdminReply, BooklineError> {
        messages::check_length(message, self.max_message_length)?;

        self.transport.send(phone_number, message).await?;

        let reply = AdminReply {
            phone_number: phone_number.to_string(),
            conversation_id: conversation_id.clone(),
            message: message.to_string(),
            sent_at: now_iso(),
            sent_by: sent_by.to_string(),
        };
        self.store.append_admin_reply(&reply).await?;

        info!(
            phone = %phone_number,
            conversation = %conversation_id,
            sent_by,
            "manual reply sent"
        );
        Ok(reply)
    }
}

/// The instant the booking happened, used to derive the conversation id.
///
/// Prefers the payload's own creation timestamp, then the event start, so
/// a redelivered webhook derives the same id. Wall clock is the last
/// resort for payloads carrying no timestamps at all.
fn booking_instant(
    event_created_at: &Option<String>,
    event_start_time: &Option<String>,
) -> DateTime<Utc> {
    parse_iso(event_created_at.as_deref())
        .or_else(|| parse_iso(event_start_time.as_deref()))
        .unwrap_or_else(Utc::now)
}

fn parse_iso(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn booking_instant_prefers_created_at() {
        let created = Some("2026-02-28T09:00:00Z".to_string());
        let start = Some("2026-03-01T15:00:00Z".to_string());
        let instant = booking_instant(&created, &start);
        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn booking_instant_falls_back_to_start_time() {
        let start = Some("2026-03-01T15:00:00Z".to_string());
        let instant = booking_instant(&None, &start);
        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn parse_iso_handles_offsets() {
        let parsed = parse_iso(Some("2026-03-01T10:00:00-05:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap());
        assert!(parse_iso(Some("not a date")).is_none());
        assert!(parse_iso(None).is_none());
    }
}
