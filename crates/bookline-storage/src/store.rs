// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`ConversationStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use bookline_config::model::StorageConfig;
use bookline_core::{
    AdminReply, BooklineError, ConversationFilter, ConversationId, ConversationPage,
    ConversationPatch, ConversationRecord, ConversationStore, CreateOutcome,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. The handle is shared with the follow-up scheduler so the
/// whole service funnels writes through one connection.
pub struct SqliteConversationStore {
    db: Database,
}

impl SqliteConversationStore {
    /// Open the database at the configured path and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BooklineError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "conversation store opened");
        Ok(Self { db })
    }

    /// The underlying database handle, shared with the job scheduler.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint and close the database.
    pub async fn close(&self) -> Result<(), BooklineError> {
        self.db.close().await
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn create(&self, record: &ConversationRecord) -> Result<CreateOutcome, BooklineError> {
        queries::conversations::create(&self.db, record).await
    }

    async fn get(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, BooklineError> {
        queries::conversations::get(&self.db, phone_number, conversation_id).await
    }

    async fn get_latest(
        &self,
        phone_number: &str,
    ) -> Result<Option<ConversationRecord>, BooklineError> {
        queries::conversations::get_latest(&self.db, phone_number).await
    }

    async fn update(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        patch: ConversationPatch,
    ) -> Result<(), BooklineError> {
        queries::conversations::update(&self.db, phone_number, conversation_id, patch).await
    }

    async fn claim_follow_up(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        now: &str,
    ) -> Result<bool, BooklineError> {
        queries::conversations::claim_follow_up(&self.db, phone_number, conversation_id, now).await
    }

    async fn release_follow_up(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<(), BooklineError> {
        queries::conversations::release_follow_up(&self.db, phone_number, conversation_id).await
    }

    async fn record_response(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
        text: &str,
        now: &str,
    ) -> Result<bool, BooklineError> {
        queries::conversations::record_response(&self.db, phone_number, conversation_id, text, now)
            .await
    }

    async fn append_admin_reply(&self, reply: &AdminReply) -> Result<(), BooklineError> {
        queries::admin_replies::append(&self.db, reply).await
    }

    async fn list_admin_replies(
        &self,
        phone_number: &str,
        conversation_id: &ConversationId,
    ) -> Result<Vec<AdminReply>, BooklineError> {
        queries::admin_replies::list_for_conversation(&self.db, phone_number, conversation_id).await
    }

    async fn list(&self, filter: ConversationFilter) -> Result<ConversationPage, BooklineError> {
        queries::conversations::list(&self.db, filter).await
    }

    async fn purge_expired(&self, now_epoch: i64) -> Result<u64, BooklineError> {
        queries::conversations::purge_expired(&self.db, now_epoch).await
    }
}
