// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring: store, transport, scheduler, engine, gateway.

use std::sync::Arc;

use tracing::{info, warn};

use bookline_config::BooklineConfig;
use bookline_core::{BooklineError, ConversationStore, SmsTransport};
use bookline_engine::LifecycleEngine;
use bookline_gateway::AppState;
use bookline_scheduler::{SchedulerRunner, SqliteFollowUpScheduler};
use bookline_sms::TwilioSms;
use bookline_storage::SqliteConversationStore;

/// Assemble the adapters and serve until ctrl-c.
pub async fn run(config: BooklineConfig) -> Result<(), BooklineError> {
    if config.webhook.signing_secret.is_none() {
        // Operational bypass: without a secret, webhook signatures are not
        // verified. Acceptable for local development only.
        warn!("webhook.signing_secret is not set; webhook signature verification is DISABLED");
    }

    let store = Arc::new(SqliteConversationStore::open(&config.storage).await?);
    let transport: Arc<dyn SmsTransport> = Arc::new(TwilioSms::new(&config.sms)?);
    let scheduler = Arc::new(SqliteFollowUpScheduler::new(
        store.clone(),
        config.follow_up.max_attempts,
    ));
    let engine = Arc::new(LifecycleEngine::new(
        store.clone(),
        transport,
        scheduler,
        &config,
    ));

    let runner = SchedulerRunner::new(store.clone(), engine.clone(), config.follow_up.clone());
    let runner_handle = tokio::spawn(runner.run());

    let api_store: Arc<dyn ConversationStore> = store.clone();
    let state = AppState {
        engine,
        store: api_store,
        signing_secret: config.webhook.signing_secret.clone(),
        max_message_length: config.sms.max_message_length,
        start_time: std::time::Instant::now(),
    };

    let result = tokio::select! {
        result = bookline_gateway::start_server(&config.server.host, config.server.port, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            Ok(())
        }
    };

    runner_handle.abort();
    store.close().await?;
    result
}
