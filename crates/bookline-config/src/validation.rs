// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, positive intervals, and
//! well-formed sender numbers. Collects all errors instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::BooklineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with every collected validation error.
pub fn validate_config(config: &BooklineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.server.port == 0 {
        errors.push(ConfigError::Validation {
            message: "server.port must be nonzero".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.follow_up.delay_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "follow_up.delay_minutes must be at least 1".to_string(),
        });
    }

    if config.follow_up.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "follow_up.poll_interval_secs must be at least 1".to_string(),
        });
    }

    if config.follow_up.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "follow_up.max_attempts must be at least 1".to_string(),
        });
    }

    if config.sms.max_message_length == 0 || config.sms.max_message_length > 1600 {
        errors.push(ConfigError::Validation {
            message: format!(
                "sms.max_message_length must be in 1..=1600, got {}",
                config.sms.max_message_length
            ),
        });
    }

    if let Some(from) = &config.sms.from_number {
        let normalized = bookline_contact::phone::normalize(from);
        if !bookline_contact::phone::is_valid(&normalized) {
            errors.push(ConfigError::Validation {
                message: format!("sms.from_number `{from}` is not a plausible phone number"),
            });
        }
    }

    for (key, template) in [
        ("messages.initial_template", &config.messages.initial_template),
        (
            "messages.follow_up_template",
            &config.messages.follow_up_template,
        ),
    ] {
        if template.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        } else if template.chars().count() > config.sms.max_message_length {
            errors.push(ConfigError::Validation {
                message: format!(
                    "{key} exceeds sms.max_message_length ({} chars)",
                    config.sms.max_message_length
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = BooklineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = BooklineConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_delay_fails_validation() {
        let mut config = BooklineConfig::default();
        config.follow_up.delay_minutes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("delay_minutes"))
        ));
    }

    #[test]
    fn bad_from_number_fails_validation() {
        let mut config = BooklineConfig::default();
        config.sms.from_number = Some("not-a-phone".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("from_number"))
        ));
    }

    #[test]
    fn valid_from_number_passes() {
        let mut config = BooklineConfig::default();
        config.sms.from_number = Some("555-000-1111".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn oversized_template_fails_validation() {
        let mut config = BooklineConfig::default();
        config.messages.initial_template = "x".repeat(1601);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("initial_template"))
        ));
    }

    #[test]
    fn multiple_errors_are_collected() {
        let mut config = BooklineConfig::default();
        config.server.port = 0;
        config.follow_up.max_attempts = 0;
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
