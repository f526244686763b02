// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin-reply side channel operations.
//!
//! Append-only: manual operator messages are recorded here and never
//! touch the conversation's automated state.

use bookline_core::{AdminReply, BooklineError, ConversationId};
use rusqlite::params;

use crate::database::Database;

/// Append a manual operator reply.
pub async fn append(db: &Database, reply: &AdminReply) -> Result<(), BooklineError> {
    let reply = reply.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO admin_replies (phone_number, conversation_id, message, sent_at, sent_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reply.phone_number,
                    reply.conversation_id.0,
                    reply.message,
                    reply.sent_at,
                    reply.sent_by,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List one conversation's admin replies in send order.
pub async fn list_for_conversation(
    db: &Database,
    phone_number: &str,
    conversation_id: &ConversationId,
) -> Result<Vec<AdminReply>, BooklineError> {
    let phone_number = phone_number.to_string();
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT phone_number, conversation_id, message, sent_at, sent_by
                 FROM admin_replies
                 WHERE phone_number = ?1 AND conversation_id = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![phone_number, conversation_id], |row| {
                Ok(AdminReply {
                    phone_number: row.get(0)?,
                    conversation_id: ConversationId(row.get(1)?),
                    message: row.get(2)?,
                    sent_at: row.get(3)?,
                    sent_by: row.get(4)?,
                })
            })?;
            let mut replies = Vec::new();
            for row in rows {
                replies.push(row?);
            }
            Ok(replies)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
