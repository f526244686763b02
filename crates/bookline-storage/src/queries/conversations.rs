// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation record operations.
//!
//! The claim/record operations here are single conditional UPDATEs; they
//! are the compare-and-swap that arbitrates the race between the follow-up
//! timer and the inbound-reply handler. Callers branch on the returned row
//! count, never on a previously read copy of the record.

use std::str::FromStr;

use bookline_core::{
    ConversationCursor, ConversationFilter, ConversationId, ConversationPage, ConversationPatch,
    ConversationRecord, ConversationStatus, CreateOutcome,
};
use bookline_core::BooklineError;
use rusqlite::{params, Row};

use crate::database::Database;

const RECORD_COLUMNS: &str = "phone_number, conversation_id, client_name, event_id, event_title,
     event_start_time, event_end_time, initial_message_sent, initial_message_sent_at,
     follow_up_sent, follow_up_sent_at, client_responded, client_response_at,
     client_response_text, status, created_at, updated_at, ttl";

/// Default and maximum page sizes for listings.
const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

fn row_to_record(row: &Row<'_>) -> Result<ConversationRecord, rusqlite::Error> {
    let status_raw: String = row.get(14)?;
    let status = ConversationStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ConversationRecord {
        phone_number: row.get(0)?,
        conversation_id: ConversationId(row.get(1)?),
        client_name: row.get(2)?,
        event_id: row.get(3)?,
        event_title: row.get(4)?,
        event_start_time: row.get(5)?,
        event_end_time: row.get(6)?,
        initial_message_sent: row.get(7)?,
        initial_message_sent_at: row.get(8)?,
        follow_up_sent: row.get(9)?,
        follow_up_sent_at: row.get(10)?,
        client_responded: row.get(11)?,
        client_response_at: row.get(12)?,
        client_response_text: row.get(13)?,
        status,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
        ttl: row.get(17)?,
    })
}

/// Insert a new conversation record if its key is free.
///
/// Returns [`CreateOutcome::AlreadyExists`] without touching the existing
/// row, making webhook redelivery a no-op.
pub async fn create(
    db: &Database,
    record: &ConversationRecord,
) -> Result<CreateOutcome, BooklineError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO conversations (phone_number, conversation_id, client_name,
                     event_id, event_title, event_start_time, event_end_time,
                     initial_message_sent, initial_message_sent_at,
                     follow_up_sent, follow_up_sent_at,
                     client_responded, client_response_at, client_response_text,
                     status, created_at, updated_at, ttl)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18)
                 ON CONFLICT (phone_number, conversation_id) DO NOTHING",
                params![
                    record.phone_number,
                    record.conversation_id.0,
                    record.client_name,
                    record.event_id,
                    record.event_title,
                    record.event_start_time,
                    record.event_end_time,
                    record.initial_message_sent,
                    record.initial_message_sent_at,
                    record.follow_up_sent,
                    record.follow_up_sent_at,
                    record.client_responded,
                    record.client_response_at,
                    record.client_response_text,
                    record.status.to_string(),
                    record.created_at,
                    record.updated_at,
                    record.ttl,
                ],
            )?;
            Ok(if changed == 0 {
                CreateOutcome::AlreadyExists
            } else {
                CreateOutcome::Created
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get one conversation by its full key.
pub async fn get(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
) -> Result<Option<ConversationRecord>, BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM conversations
                 WHERE phone_number = ?1 AND conversation_id = ?2"
            ))?;
            let result = stmt.query_row(params![phone_number, conversation_id], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the most recent conversation for a phone number.
///
/// Conversation ids are time-ordered, so this is a descending sort-key
/// scan with limit 1.
pub async fn get_latest(
    db: &Database,
    phone_number: &str,
) -> Result<Option<ConversationRecord>, BooklineError> {
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM conversations
                 WHERE phone_number = ?1
                 ORDER BY conversation_id DESC
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![phone_number], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update. `updated_at` is refreshed unconditionally;
/// absent patch fields keep their current values via COALESCE.
pub async fn update(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
    patch: ConversationPatch,
) -> Result<(), BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    let status = patch.status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET
                     status = COALESCE(?1, status),
                     client_name = COALESCE(?2, client_name),
                     initial_message_sent = COALESCE(?3, initial_message_sent),
                     initial_message_sent_at = COALESCE(?4, initial_message_sent_at),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE phone_number = ?5 AND conversation_id = ?6",
                params![
                    status,
                    patch.client_name,
                    patch.initial_message_sent,
                    patch.initial_message_sent_at,
                    phone_number,
                    conversation_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim the follow-up send.
///
/// The claim only succeeds while the client has not responded, no
/// follow-up was sent, and the status still accepts one. Returns `true`
/// iff this call flipped the flag.
pub async fn claim_follow_up(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
    now: &str,
) -> Result<bool, BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET
                     follow_up_sent = 1,
                     follow_up_sent_at = ?3,
                     status = 'FOLLOW_UP_SENT',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE phone_number = ?1 AND conversation_id = ?2
                   AND client_responded = 0
                   AND follow_up_sent = 0
                   AND status IN ('AWAITING_RESPONSE', 'INITIAL_SENT', 'FOLLOW_UP_SCHEDULED')",
                params![phone_number, conversation_id, now],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Revert a claimed follow-up whose transport send failed, so the
/// scheduler's retry can claim again. No-op once the client has responded.
pub async fn release_follow_up(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
) -> Result<(), BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET
                     follow_up_sent = 0,
                     follow_up_sent_at = NULL,
                     status = 'AWAITING_RESPONSE',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE phone_number = ?1 AND conversation_id = ?2
                   AND follow_up_sent = 1
                   AND client_responded = 0",
                params![phone_number, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically record an inbound client reply.
///
/// Gated on `client_responded` still being 0 and an active status, so
/// message-queue redelivery and late duplicates no-op. Returns `true` iff
/// the response was recorded by this call.
pub async fn record_response(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
    text: &str,
    now: &str,
) -> Result<bool, BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    let text = truncate_chars(text, bookline_core::types::MAX_SMS_LENGTH);
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET
                     client_responded = 1,
                     client_response_at = ?3,
                     client_response_text = ?4,
                     status = 'CLIENT_RESPONDED',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE phone_number = ?1 AND conversation_id = ?2
                   AND client_responded = 0
                   AND status IN ('AWAITING_RESPONSE', 'INITIAL_SENT',
                                  'FOLLOW_UP_SCHEDULED', 'FOLLOW_UP_SENT')",
                params![phone_number, conversation_id, now, text],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List conversations newest-first with optional status filter and keyset
/// pagination.
pub async fn list(
    db: &Database,
    filter: ConversationFilter,
) -> Result<ConversationPage, BooklineError> {
    let status = filter.status.map(|s| s.to_string());
    let (cursor_id, cursor_phone) = match &filter.cursor {
        Some(c) => (Some(c.conversation_id.0.clone()), Some(c.phone_number.clone())),
        None => (None, None),
    };
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE) as i64;

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM conversations
                 WHERE (?1 IS NULL OR status = ?1)
                   AND (?2 IS NULL
                        OR conversation_id < ?2
                        OR (conversation_id = ?2 AND phone_number < ?3))
                 ORDER BY conversation_id DESC, phone_number DESC
                 LIMIT ?4"
            ))?;
            // Fetch one extra row to decide whether a next page exists.
            let rows = stmt.query_map(
                params![status, cursor_id, cursor_phone, limit + 1],
                row_to_record,
            )?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            let next_cursor = if items.len() as i64 > limit {
                items.truncate(limit as usize);
                items.last().map(|r| ConversationCursor {
                    conversation_id: r.conversation_id.clone(),
                    phone_number: r.phone_number.clone(),
                })
            } else {
                None
            };
            Ok(ConversationPage { items, next_cursor })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete conversations (and their admin replies) whose TTL has passed.
/// Returns the number of conversations removed.
pub async fn purge_expired(db: &Database, now_epoch: i64) -> Result<u64, BooklineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM admin_replies WHERE (phone_number, conversation_id) IN
                     (SELECT phone_number, conversation_id FROM conversations WHERE ttl <= ?1)",
                params![now_epoch],
            )?;
            let purged = tx.execute("DELETE FROM conversations WHERE ttl <= ?1", params![now_epoch])?;
            tx.commit()?;
            Ok(purged as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::types::format_iso;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_record(phone: &str, seed: &str) -> ConversationRecord {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        ConversationRecord::new(
            phone.to_string(),
            ConversationId::derive(now, seed),
            "John Doe".to_string(),
            now,
        )
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");

        let outcome = create(&db, &record).await.unwrap();
        assert_eq!(outcome, CreateOutcome::Created);

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, record);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_create_is_reported_not_overwritten() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        let mut clobber = record.clone();
        clobber.client_name = "Someone Else".to_string();
        let outcome = create(&db, &clobber).await.unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.client_name, "John Doe");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_latest_returns_newest_conversation() {
        let (db, _dir) = setup_db().await;
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let older = ConversationRecord::new(
            "+15551234567".into(),
            ConversationId::derive(t1, "evt-old"),
            "John Doe".into(),
            t1,
        );
        let newer = ConversationRecord::new(
            "+15551234567".into(),
            ConversationId::derive(t2, "evt-new"),
            "John Doe".into(),
            t2,
        );
        create(&db, &older).await.unwrap();
        create(&db, &newer).await.unwrap();

        let latest = get_latest(&db, "+15551234567").await.unwrap().unwrap();
        assert_eq!(latest.conversation_id, newer.conversation_id);

        assert!(get_latest(&db, "+15550000000").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_patch_sets_only_given_fields() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        let sent_at = format_iso(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 5).unwrap());
        update(
            &db,
            "+15551234567",
            &record.conversation_id,
            ConversationPatch {
                initial_message_sent: Some(true),
                initial_message_sent_at: Some(sent_at.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.initial_message_sent);
        assert_eq!(fetched.initial_message_sent_at, Some(sent_at));
        // Untouched fields keep their values.
        assert_eq!(fetched.client_name, "John Doe");
        assert_eq!(fetched.status, ConversationStatus::AwaitingResponse);
        assert_ne!(fetched.updated_at, record.updated_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_follow_up_wins_once() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        let now = "2026-03-01T12:30:00.000Z";
        assert!(claim_follow_up(&db, "+15551234567", &record.conversation_id, now)
            .await
            .unwrap());
        // Second claim must lose: the flag is already set.
        assert!(!claim_follow_up(&db, "+15551234567", &record.conversation_id, now)
            .await
            .unwrap());

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.follow_up_sent);
        assert_eq!(fetched.status, ConversationStatus::FollowUpSent);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_follow_up_loses_after_response() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        assert!(record_response(
            &db,
            "+15551234567",
            &record.conversation_id,
            "yes, still good",
            "2026-03-01T12:29:00.000Z",
        )
        .await
        .unwrap());

        assert!(!claim_follow_up(
            &db,
            "+15551234567",
            &record.conversation_id,
            "2026-03-01T12:30:00.000Z",
        )
        .await
        .unwrap());

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.client_responded);
        assert!(!fetched.follow_up_sent);
        assert_eq!(fetched.status, ConversationStatus::ClientResponded);
        assert_eq!(fetched.client_response_text.as_deref(), Some("yes, still good"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_follow_up_reverts_claim() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        claim_follow_up(&db, "+15551234567", &record.conversation_id, "2026-03-01T12:30:00.000Z")
            .await
            .unwrap();
        release_follow_up(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap();

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!fetched.follow_up_sent);
        assert!(fetched.follow_up_sent_at.is_none());
        assert_eq!(fetched.status, ConversationStatus::AwaitingResponse);

        // And the next claim can win again.
        assert!(claim_follow_up(
            &db,
            "+15551234567",
            &record.conversation_id,
            "2026-03-01T12:31:00.000Z",
        )
        .await
        .unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_response_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        assert!(record_response(
            &db,
            "+15551234567",
            &record.conversation_id,
            "first reply",
            "2026-03-01T12:10:00.000Z",
        )
        .await
        .unwrap());
        // Redelivery of the same (or a later) message must not re-record.
        assert!(!record_response(
            &db,
            "+15551234567",
            &record.conversation_id,
            "second reply",
            "2026-03-01T12:11:00.000Z",
        )
        .await
        .unwrap());

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.client_response_text.as_deref(), Some("first reply"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_response_truncates_long_text() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        let long_text = "a".repeat(2000);
        record_response(
            &db,
            "+15551234567",
            &record.conversation_id,
            &long_text,
            "2026-03-01T12:10:00.000Z",
        )
        .await
        .unwrap();

        let fetched = get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.client_response_text.unwrap().chars().count(), 1600);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_status_and_paginates() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, i).unwrap();
            let record = ConversationRecord::new(
                format!("+1555123456{i}"),
                ConversationId::derive(t, &format!("evt-{i}")),
                "John Doe".into(),
                t,
            );
            create(&db, &record).await.unwrap();
        }

        let page = list(
            &db,
            ConversationFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.items.len(), 2);
        let cursor = page.next_cursor.expect("more pages expected");
        // Newest first.
        assert!(page.items[0].conversation_id > page.items[1].conversation_id);

        let rest = list(
            &db,
            ConversationFilter {
                cursor: Some(cursor),
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(rest.items.len(), 3);
        assert!(rest.next_cursor.is_none());

        let responded = list(
            &db,
            ConversationFilter {
                status: Some(ConversationStatus::ClientResponded),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(responded.items.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_expired_removes_old_conversations() {
        let (db, _dir) = setup_db().await;
        let record = make_record("+15551234567", "evt-1");
        create(&db, &record).await.unwrap();

        // Before expiry: nothing purged.
        let purged = purge_expired(&db, record.ttl - 1).await.unwrap();
        assert_eq!(purged, 0);

        // At expiry: gone.
        let purged = purge_expired(&db, record.ttl).await.unwrap();
        assert_eq!(purged, 1);
        assert!(get(&db, "+15551234567", &record.conversation_id)
            .await
            .unwrap()
            .is_none());

        db.close().await.unwrap();
    }
}
