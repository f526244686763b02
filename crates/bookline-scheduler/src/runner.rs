// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling runner for due follow-up jobs and retention sweeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use bookline_config::model::FollowUpConfig;
use bookline_core::types::{format_iso, now_iso};
use bookline_core::{BooklineError, ConversationStore};
use bookline_engine::{FollowUpOutcome, LifecycleEngine};
use bookline_storage::{queries, SqliteConversationStore};

/// Jobs claimed per poll.
const CLAIM_BATCH: u32 = 16;

/// Terminal (completed/failed) job rows are kept this long for inspection.
const TERMINAL_JOB_RETENTION_DAYS: i64 = 7;

/// Polls the job table on an interval, fires due follow-ups through the
/// engine, and periodically purges TTL-expired conversations.
///
/// Failures of an individual job are contained: the job re-pends (up to
/// its attempt budget) and the poll moves on. The loop itself only logs;
/// it never exits on error.
pub struct SchedulerRunner {
    store: Arc<SqliteConversationStore>,
    engine: Arc<LifecycleEngine>,
    config: FollowUpConfig,
}

impl SchedulerRunner {
    pub fn new(
        store: Arc<SqliteConversationStore>,
        engine: Arc<LifecycleEngine>,
        config: FollowUpConfig,
    ) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run the poll loop forever. Spawn this on its own task; abort the
    /// task to stop it.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let sweep_every = Duration::from_secs(self.config.retention_sweep_secs);
        let mut last_sweep = tokio::time::Instant::now();

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "scheduler runner started"
        );

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                Ok(0) => {}
                Ok(n) => debug!(jobs = n, "processed due follow-up jobs"),
                Err(e) => warn!(error = %e, "follow-up poll failed"),
            }

            if last_sweep.elapsed() >= sweep_every {
                last_sweep = tokio::time::Instant::now();
                if let Err(e) = self.sweep().await {
                    warn!(error = %e, "retention sweep failed");
                }
            }
        }
    }

    /// Claim and process one batch of due jobs. Returns how many were claimed.
    pub async fn poll_once(&self) -> Result<usize, BooklineError> {
        let now = now_iso();
        let due = queries::jobs::claim_due(self.store.database(), &now, CLAIM_BATCH).await?;
        let claimed = due.len();

        for row in due {
            let job = row.to_job();
            match self.engine.handle_follow_up(&job).await {
                Ok(FollowUpOutcome::Sent) => {
                    queries::jobs::ack(self.store.database(), row.id).await?;
                }
                Ok(FollowUpOutcome::Skipped(reason)) => {
                    // Skips are terminal successes: the follow-up is no
                    // longer wanted, so the job must not retry.
                    debug!(
                        conversation = %job.conversation_id,
                        ?reason,
                        "follow-up skipped"
                    );
                    queries::jobs::ack(self.store.database(), row.id).await?;
                }
                Err(e) => {
                    warn!(
                        conversation = %job.conversation_id,
                        attempt = row.attempts + 1,
                        error = %e,
                        "follow-up attempt failed"
                    );
                    queries::jobs::fail(self.store.database(), row.id).await?;
                }
            }
        }

        Ok(claimed)
    }

    /// Purge TTL-expired conversations and stale terminal job rows.
    pub async fn sweep(&self) -> Result<(), BooklineError> {
        let now = Utc::now();
        let purged = self.store.purge_expired(now.timestamp()).await?;
        let cutoff = format_iso(now - chrono::Duration::days(TERMINAL_JOB_RETENTION_DAYS));
        let jobs_purged = queries::jobs::purge_terminal(self.store.database(), &cutoff).await?;
        if purged > 0 || jobs_purged > 0 {
            info!(
                conversations = purged,
                jobs = jobs_purged,
                "retention sweep removed expired records"
            );
        }
        Ok(())
    }
}
