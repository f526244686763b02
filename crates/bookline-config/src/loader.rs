// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./bookline.toml` > `~/.config/bookline/bookline.toml`
//! > `/etc/bookline/bookline.toml` with environment variable overrides via
//! the `BOOKLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BooklineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bookline/bookline.toml` (system-wide)
/// 3. `~/.config/bookline/bookline.toml` (user XDG config)
/// 4. `./bookline.toml` (local directory)
/// 5. `BOOKLINE_*` environment variables
pub fn load_config() -> Result<BooklineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BooklineConfig::default()))
        .merge(Toml::file("/etc/bookline/bookline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bookline/bookline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bookline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BooklineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BooklineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BooklineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BooklineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BOOKLINE_SMS_ACCOUNT_SID` must map to
/// `sms.account_sid`, not `sms.account.sid`.
fn env_provider() -> Env {
    Env::prefixed("BOOKLINE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BOOKLINE_SMS_ACCOUNT_SID -> "sms_account_sid"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("sms_", "sms.", 1)
            .replacen("follow_up_", "follow_up.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("messages_", "messages.", 1);
        mapped.into()
    })
}
