// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Bookline service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, producing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Bookline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BooklineConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Booking webhook verification settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// SMS transport (Twilio-style API) settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Follow-up scheduling settings.
    #[serde(default)]
    pub follow_up: FollowUpConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound message templates.
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "bookline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Booking webhook verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared secret for webhook signature verification.
    ///
    /// When `None`, signature verification is SKIPPED and every payload is
    /// accepted. This is a deliberate operational bypass for environments
    /// without a configured secret, and a real security weakening: set the
    /// secret in production.
    #[serde(default)]
    pub signing_secret: Option<String>,
}

/// SMS transport configuration for a Twilio-style messaging API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Provider account identifier. `None` disables the transport.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Provider auth token.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// E.164 number messages are sent from.
    #[serde(default)]
    pub from_number: Option<String>,

    /// Base URL of the provider API. Overridable for testing.
    #[serde(default = "default_sms_api_base")]
    pub api_base_url: String,

    /// Maximum outbound message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: default_sms_api_base(),
            max_message_length: default_max_message_length(),
        }
    }
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_max_message_length() -> usize {
    1600
}

/// Follow-up scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpConfig {
    /// Minutes after a successful initial send before the follow-up fires.
    #[serde(default = "default_delay_minutes")]
    pub delay_minutes: u64,

    /// How often the scheduler polls for due jobs, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Send attempts per follow-up job before it is parked as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How often the TTL retention sweep runs, in seconds.
    #[serde(default = "default_retention_sweep_secs")]
    pub retention_sweep_secs: u64,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            delay_minutes: default_delay_minutes(),
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            retention_sweep_secs: default_retention_sweep_secs(),
        }
    }
}

fn default_delay_minutes() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retention_sweep_secs() -> u64 {
    3600
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("bookline").join("bookline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("bookline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound message templates.
///
/// Templates support `{client_name}`, `{event_title}`, and
/// `{event_start_time}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// Confirmation text sent immediately after a booking is recorded.
    #[serde(default = "default_initial_template")]
    pub initial_template: String,

    /// Follow-up text sent when the client has not replied.
    #[serde(default = "default_follow_up_template")]
    pub follow_up_template: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            initial_template: default_initial_template(),
            follow_up_template: default_follow_up_template(),
        }
    }
}

fn default_initial_template() -> String {
    "Hi {client_name}! Your booking for {event_title} on {event_start_time} is confirmed. \
     Reply to this message if you have any questions."
        .to_string()
}

fn default_follow_up_template() -> String {
    "Hi {client_name}, just checking in about your upcoming {event_title}. \
     Reply here if you need to make any changes."
        .to_string()
}
