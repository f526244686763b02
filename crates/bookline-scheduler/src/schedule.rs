// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`FollowUpScheduler`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use bookline_core::{BooklineError, FollowUpJob, FollowUpScheduler};
use bookline_storage::{queries, SqliteConversationStore};

/// Persists follow-up jobs into the shared Bookline database.
///
/// Shares the store's single-writer database handle, so scheduling
/// participates in the same serialization as every other write.
pub struct SqliteFollowUpScheduler {
    store: Arc<SqliteConversationStore>,
    max_attempts: u32,
}

impl SqliteFollowUpScheduler {
    pub fn new(store: Arc<SqliteConversationStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }
}

#[async_trait]
impl FollowUpScheduler for SqliteFollowUpScheduler {
    async fn schedule(&self, job: &FollowUpJob) -> Result<(), BooklineError> {
        let inserted =
            queries::jobs::schedule(self.store.database(), job, self.max_attempts).await?;
        if inserted {
            debug!(
                conversation = %job.conversation_id,
                fire_at = %job.scheduled_time,
                "follow-up scheduled"
            );
        } else {
            debug!(
                conversation = %job.conversation_id,
                "follow-up already scheduled, ignoring"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_config::model::StorageConfig;
    use bookline_core::ConversationId;
    use tempfile::tempdir;

    fn make_job(fire_at: &str) -> FollowUpJob {
        FollowUpJob {
            phone_number: "+15551234567".into(),
            conversation_id: ConversationId("conv-1".into()),
            client_name: "John Doe".into(),
            scheduled_time: fire_at.into(),
        }
    }

    #[tokio::test]
    async fn schedule_twice_registers_one_job() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("sched.db").to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteConversationStore::open(&config).await.unwrap());
        let scheduler = SqliteFollowUpScheduler::new(store.clone(), 3);

        let job = make_job("2026-03-01T12:30:00.000Z");
        scheduler.schedule(&job).await.unwrap();
        scheduler.schedule(&job).await.unwrap();

        let due = queries::jobs::claim_due(store.database(), "2026-03-01T12:30:00.000Z", 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }
}
