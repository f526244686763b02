// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up job queue operations.
//!
//! Jobs are the durable half of the delayed-execution scheduler: a row per
//! scheduled follow-up, keyed by the unique conversation id so scheduling
//! the same conversation twice is a no-op. The runner claims due jobs with
//! a lease and acks or fails them; failed jobs re-pend until max_attempts.

use bookline_core::{BooklineError, ConversationId, FollowUpJob};
use rusqlite::params;

use crate::database::Database;

/// A persisted follow-up job row.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpJobRow {
    pub id: i64,
    pub conversation_id: String,
    pub phone_number: String,
    pub client_name: String,
    /// ISO-8601 time the job becomes due.
    pub fire_at: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub locked_until: Option<String>,
}

impl FollowUpJobRow {
    /// The callback payload carried by this job.
    pub fn to_job(&self) -> FollowUpJob {
        FollowUpJob {
            phone_number: self.phone_number.clone(),
            conversation_id: ConversationId(self.conversation_id.clone()),
            client_name: self.client_name.clone(),
            scheduled_time: self.fire_at.clone(),
        }
    }
}

/// Persist a follow-up job. The conversation id is the idempotency key:
/// returns `false` without writing when a job for it already exists.
pub async fn schedule(
    db: &Database,
    job: &FollowUpJob,
    max_attempts: u32,
) -> Result<bool, BooklineError> {
    let job = job.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO follow_up_jobs
                     (conversation_id, phone_number, client_name, fire_at, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (conversation_id) DO NOTHING",
                params![
                    job.conversation_id.0,
                    job.phone_number,
                    job.client_name,
                    job.scheduled_time,
                    max_attempts,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim up to `limit` due jobs, marking them "processing" with a 5-minute
/// lease. A job whose previous lease expired (runner crashed mid-flight)
/// is claimable again.
pub async fn claim_due(
    db: &Database,
    now: &str,
    limit: u32,
) -> Result<Vec<FollowUpJobRow>, BooklineError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut claimed = Vec::new();
            {
                let mut stmt = tx.prepare(
                    "SELECT id, conversation_id, phone_number, client_name, fire_at,
                            status, attempts, max_attempts, locked_until
                     FROM follow_up_jobs
                     WHERE fire_at <= ?1
                       AND (status = 'pending'
                            OR (status = 'processing' AND locked_until < ?1))
                     ORDER BY fire_at ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![now, limit], |row| {
                    Ok(FollowUpJobRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        phone_number: row.get(2)?,
                        client_name: row.get(3)?,
                        fire_at: row.get(4)?,
                        status: "processing".to_string(),
                        attempts: row.get(6)?,
                        max_attempts: row.get(7)?,
                        locked_until: row.get(8)?,
                    })
                })?;
                for row in rows {
                    claimed.push(row?);
                }
            }
            for job in &claimed {
                tx.execute(
                    "UPDATE follow_up_jobs SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![job.id],
                )?;
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful (or skipped) processing: marks the job completed.
pub async fn ack(db: &Database, id: i64) -> Result<(), BooklineError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE follow_up_jobs SET status = 'completed',
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a job attempt as failed.
///
/// Increments attempts; at max_attempts the job is parked as "failed",
/// otherwise it re-pends (with the lock cleared) for the next poll.
pub async fn fail(db: &Database, id: i64) -> Result<(), BooklineError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i64, i64) = conn.query_row(
                "SELECT attempts, max_attempts FROM follow_up_jobs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let status = if new_attempts >= max_attempts {
                "failed"
            } else {
                "pending"
            };
            conn.execute(
                "UPDATE follow_up_jobs SET status = ?1, attempts = ?2,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete terminal (completed/failed) jobs last touched before `before`.
/// Returns the number of rows removed.
pub async fn purge_terminal(db: &Database, before: &str) -> Result<u64, BooklineError> {
    let before = before.to_string();
    db.connection()
        .call(move |conn| {
            let purged = conn.execute(
                "DELETE FROM follow_up_jobs
                 WHERE status IN ('completed', 'failed') AND updated_at < ?1",
                params![before],
            )?;
            Ok(purged as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
