// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /webhooks/booking, POST /webhooks/sms, POST /admin/replies,
//! GET /admin/conversations, GET /health.

use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use bookline_core::{
    ConversationCursor, ConversationFilter, ConversationId, ConversationRecord,
    ConversationStatus,
};
use bookline_engine::{BookingOutcome, InboundOutcome};

use crate::server::AppState;
use crate::signature;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Response body for POST /webhooks/booking.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Outcome: `created`, `duplicate`, or `ignored`.
    pub status: String,
    /// Conversation id, when one exists for this booking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// One inbound SMS notification. Provider deliveries use `From`/`Body`
/// capitalization; both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundNotification {
    #[serde(alias = "From")]
    pub from: String,
    #[serde(alias = "Body")]
    pub body: String,
    #[serde(default, alias = "MessageSid")]
    pub message_id: Option<String>,
}

/// An inbound SMS delivery: a single notification or a batch. Each
/// notification is processed independently and idempotently.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InboundDelivery {
    Batch {
        notifications: Vec<InboundNotification>,
    },
    Single(InboundNotification),
}

/// Response body for POST /webhooks/sms: per-notification outcome tally.
#[derive(Debug, Default, Serialize)]
pub struct InboundResponse {
    pub processed: usize,
    pub recorded: usize,
    pub no_conversation: usize,
    pub already_closed: usize,
    pub failed: usize,
}

/// Request body for POST /admin/replies.
#[derive(Debug, Deserialize)]
pub struct AdminReplyRequest {
    pub phone_number: String,
    pub conversation_id: String,
    pub message: String,
    #[serde(default = "default_sent_by")]
    pub sent_by: String,
}

fn default_sent_by() -> String {
    "operator".to_string()
}

/// Response body for POST /admin/replies.
#[derive(Debug, Serialize)]
pub struct AdminReplyResponse {
    pub sent_at: String,
}

/// Query parameters for GET /admin/conversations.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Optional status filter, e.g. `AWAITING_RESPONSE`.
    pub status: Option<String>,
    /// Keyset cursor: conversation id of the last item of the prior page.
    pub cursor_id: Option<String>,
    /// Keyset cursor: phone number of the last item of the prior page.
    pub cursor_phone: Option<String>,
    pub limit: Option<u32>,
}

/// Response body for GET /admin/conversations.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub conversations: Vec<ConversationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<ConversationCursor>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /webhooks/booking
///
/// Signature is verified over the raw body before any JSON parsing.
/// Responses: 200 on success/duplicate/ignored, 400 on malformed payload
/// or missing phone, 401 on signature failure, 500 on downstream send
/// failure (the record survives for operator recovery).
pub async fn post_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature_header = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !signature::verify(signature_header, &body, state.signing_secret.as_deref()) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid webhook signature");
    }

    let event = match serde_json::from_slice::<bookline_contact::BookingEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "malformed booking payload");
            return error_response(StatusCode::BAD_REQUEST, "malformed booking payload");
        }
    };

    let request_id = uuid::Uuid::new_v4();
    match state.engine.handle_booking(&event).await {
        Ok(BookingOutcome::Created { conversation_id }) => (
            StatusCode::OK,
            Json(BookingResponse {
                status: "created".into(),
                conversation_id: Some(conversation_id.to_string()),
            }),
        )
            .into_response(),
        Ok(BookingOutcome::Duplicate { conversation_id }) => (
            StatusCode::OK,
            Json(BookingResponse {
                status: "duplicate".into(),
                conversation_id: Some(conversation_id.to_string()),
            }),
        )
            .into_response(),
        Ok(BookingOutcome::IgnoredEvent) => (
            StatusCode::OK,
            Json(BookingResponse {
                status: "ignored".into(),
                conversation_id: None,
            }),
        )
            .into_response(),
        Ok(BookingOutcome::MissingPhone) => {
            error_response(StatusCode::BAD_REQUEST, "no extractable phone number")
        }
        Err(e) => {
            error!(%request_id, error = %e, "booking processing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("booking processing failed (request {request_id})"),
            )
        }
    }
}

/// POST /webhooks/sms
///
/// Accepts a single notification or a batched delivery; every notification
/// is processed independently, and per-notification failures are tallied
/// rather than failing the delivery. Always 200 so the provider does not
/// redeliver a batch whose items were each handled.
pub async fn post_inbound_sms(
    State(state): State<AppState>,
    Json(delivery): Json<InboundDelivery>,
) -> Response {
    let notifications = match delivery {
        InboundDelivery::Batch { notifications } => notifications,
        InboundDelivery::Single(notification) => vec![notification],
    };

    let mut tally = InboundResponse {
        processed: notifications.len(),
        ..Default::default()
    };
    for notification in &notifications {
        match state
            .engine
            .handle_inbound_sms(&notification.from, &notification.body)
            .await
        {
            Ok(InboundOutcome::Recorded { .. }) => tally.recorded += 1,
            Ok(InboundOutcome::NoConversation) => tally.no_conversation += 1,
            Ok(InboundOutcome::AlreadyClosed) => tally.already_closed += 1,
            Err(e) => {
                // The store-update is idempotent; the provider's redelivery
                // of this notification will retry it.
                warn!(
                    from = %notification.from,
                    message_id = notification.message_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "inbound notification failed"
                );
                tally.failed += 1;
            }
        }
    }

    (StatusCode::OK, Json(tally)).into_response()
}

/// POST /admin/replies
///
/// Manual operator message into an existing thread. Does not touch the
/// automated state machine.
pub async fn post_admin_reply(
    State(state): State<AppState>,
    Json(request): Json<AdminReplyRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    if request.message.chars().count() > state.max_message_length {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("message exceeds {} characters", state.max_message_length),
        );
    }

    let conversation_id = ConversationId(request.conversation_id);
    match state
        .engine
        .send_manual_reply(
            &request.phone_number,
            &conversation_id,
            &request.message,
            &request.sent_by,
        )
        .await
    {
        Ok(reply) => (
            StatusCode::OK,
            Json(AdminReplyResponse {
                sent_at: reply.sent_at,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(conversation = %conversation_id, error = %e, "manual reply failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "manual reply failed")
        }
    }
}

/// GET /admin/conversations
///
/// Newest-first listing with optional status filter and keyset pagination.
pub async fn get_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match ConversationStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown status `{raw}`"),
                );
            }
        },
    };

    let cursor = match (params.cursor_id, params.cursor_phone) {
        (None, None) => None,
        (Some(id), Some(phone)) => Some(ConversationCursor {
            conversation_id: ConversationId(id),
            phone_number: phone,
        }),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "cursor_id and cursor_phone must be provided together",
            );
        }
    };

    let filter = ConversationFilter {
        status,
        cursor,
        limit: params.limit,
    };
    match state.store.list(filter).await {
        Ok(page) => (
            StatusCode::OK,
            Json(ListResponse {
                conversations: page.items,
                next_cursor: page.next_cursor,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "conversation listing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "listing failed")
        }
    }
}

/// GET /health
///
/// Unauthenticated liveness probe.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_delivery_accepts_single_notification() {
        let json = r#"{"From": "+15551234567", "Body": "yes", "MessageSid": "SM1"}"#;
        let delivery: InboundDelivery = serde_json::from_str(json).unwrap();
        match delivery {
            InboundDelivery::Single(n) => {
                assert_eq!(n.from, "+15551234567");
                assert_eq!(n.body, "yes");
                assert_eq!(n.message_id.as_deref(), Some("SM1"));
            }
            other => panic!("expected single, got {other:?}"),
        }
    }

    #[test]
    fn inbound_delivery_accepts_batch() {
        let json = r#"{"notifications": [
            {"from": "+15551234567", "body": "yes"},
            {"from": "+15559876543", "body": "no"}
        ]}"#;
        let delivery: InboundDelivery = serde_json::from_str(json).unwrap();
        match delivery {
            InboundDelivery::Batch { notifications } => assert_eq!(notifications.len(), 2),
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn admin_reply_request_defaults_sent_by() {
        let json = r#"{
            "phone_number": "+15551234567",
            "conversation_id": "0001-abcd",
            "message": "hello"
        }"#;
        let request: AdminReplyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.sent_by, "operator");
    }

    #[test]
    fn booking_response_omits_absent_conversation_id() {
        let response = BookingResponse {
            status: "ignored".into(),
            conversation_id: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("conversation_id"));
    }
}
