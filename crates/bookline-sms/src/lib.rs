// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio-style SMS transport for the Bookline conversation engine.
//!
//! Implements [`SmsTransport`] against the provider's REST API: one
//! form-encoded POST per message, basic auth, JSON response carrying the
//! provider message sid. Message length is the caller's responsibility;
//! this crate only moves bytes.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use bookline_config::model::SmsConfig;
use bookline_core::{BooklineError, SmsId, SmsTransport};

/// Twilio-style SMS transport implementing [`SmsTransport`].
pub struct TwilioSms {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base_url: String,
}

/// Success body of the provider's message-create endpoint.
#[derive(Debug, Deserialize)]
struct MessageCreated {
    sid: String,
}

/// Error body of the provider's message-create endpoint.
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

impl TwilioSms {
    /// Creates a new transport from configuration.
    ///
    /// Requires `account_sid`, `auth_token`, and `from_number` to be set.
    pub fn new(config: &SmsConfig) -> Result<Self, BooklineError> {
        let account_sid = config
            .account_sid
            .clone()
            .ok_or_else(|| BooklineError::Config("sms.account_sid is required".into()))?;
        let auth_token = config
            .auth_token
            .clone()
            .ok_or_else(|| BooklineError::Config("sms.auth_token is required".into()))?;
        let from_number = config
            .from_number
            .clone()
            .ok_or_else(|| BooklineError::Config("sms.from_number is required".into()))?;

        if account_sid.is_empty() || auth_token.is_empty() {
            return Err(BooklineError::Config(
                "sms.account_sid and sms.auth_token cannot be empty".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| BooklineError::Sms {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            account_sid,
            auth_token,
            from_number,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        )
    }
}

#[async_trait]
impl SmsTransport for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<SmsId, BooklineError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", &self.from_number), ("Body", body)])
            .send()
            .await
            .map_err(|e| BooklineError::Sms {
                message: format!("message send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            let created: MessageCreated =
                response.json().await.map_err(|e| BooklineError::Sms {
                    message: format!("malformed provider response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            debug!(to, sid = %created.sid, "sms accepted by provider");
            return Ok(SmsId(created.sid));
        }

        // Provider errors carry a JSON body; fall back to the raw text.
        let raw = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ProviderError>(&raw)
            .map(|e| match e.code {
                Some(code) => format!("{} (code {code})", e.message),
                None => e.message,
            })
            .unwrap_or(raw);
        warn!(to, %status, "sms rejected by provider");
        Err(BooklineError::Sms {
            message: format!("provider returned {status}: {detail}"),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_base_url: &str) -> SmsConfig {
        SmsConfig {
            account_sid: Some("AC123".into()),
            auth_token: Some("token".into()),
            from_number: Some("+15550001111".into()),
            api_base_url: api_base_url.into(),
            max_message_length: 1600,
        }
    }

    #[test]
    fn new_requires_credentials() {
        let config = SmsConfig::default();
        assert!(TwilioSms::new(&config).is_err());
    }

    #[test]
    fn new_rejects_empty_credentials() {
        let mut config = make_config("https://api.twilio.com");
        config.account_sid = Some(String::new());
        assert!(TwilioSms::new(&config).is_err());
    }

    #[tokio::test]
    async fn send_posts_form_and_returns_sid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(body_string_contains("To=%2B12345678900"))
            .and(body_string_contains("From=%2B15550001111"))
            .and(body_string_contains("Body=hello"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM42"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = TwilioSms::new(&make_config(&server.uri())).unwrap();
        let sid = transport.send("+12345678900", "hello").await.unwrap();
        assert_eq!(sid, SmsId("SM42".into()));
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_as_sms_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "The 'To' number is not a valid phone number.",
                "code": 21211
            })))
            .mount(&server)
            .await;

        let transport = TwilioSms::new(&make_config(&server.uri())).unwrap();
        let err = transport.send("+1", "hello").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("21211"), "unexpected error: {msg}");
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
            .mount(&server)
            .await;

        let transport = TwilioSms::new(&make_config(&server.uri())).unwrap();
        assert!(transport.send("+12345678900", "hello").await.is_err());
    }
}
