// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Moonshot (Kimi) chat-completions API.
//!
//! Provides [`MoonshotClient`] which handles request construction,
//! authentication, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use bizmate_config::model::MoonshotConfig;
use bizmate_core::types::{ChatCompletion, ChatMessage, ToolDefinition};
use bizmate_core::{AdapterType, BizmateError, ChatProvider, HealthStatus, PluginAdapter};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// HTTP client for Moonshot API communication.
///
/// Manages the bearer auth header, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct MoonshotClient {
    client: reqwest::Client,
    model: String,
    max_retries: u32,
    base_url: String,
}

impl MoonshotClient {
    /// Creates a new Moonshot API client from configuration.
    ///
    /// Fails when `moonshot.api_key` is not set.
    pub fn new(config: &MoonshotConfig) -> Result<Self, BizmateError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| BizmateError::Config("moonshot.api_key is not set".into()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| BizmateError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            model: config.model.clone(),
            max_retries: 1,
            base_url: config.api_url.clone(),
        })
    }

    /// Returns the configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BizmateError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| BizmateError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| BizmateError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: ChatResponse =
                    serde_json::from_str(&body).map_err(|e| BizmateError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(parsed);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(BizmateError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let error_msg = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "Moonshot API error ({}): {}",
                    api_err.error.type_, api_err.error.message
                )
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(BizmateError::Provider {
                message: error_msg,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| BizmateError::Provider {
            message: "completion request failed after retries".into(),
            source: None,
        }))
    }
}

#[async_trait]
impl PluginAdapter for MoonshotClient {
    fn name(&self) -> &str {
        "moonshot"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION"))
            .unwrap_or_else(|_| semver::Version::new(0, 0, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BizmateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BizmateError> {
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for MoonshotClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, BizmateError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.to_vec())
            },
        };

        let response = self.send(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BizmateError::Provider {
                message: "API response contained no choices".into(),
                source: None,
            })?;

        Ok(ChatCompletion {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> MoonshotClient {
        let config = MoonshotConfig {
            api_key: Some("test-api-key".into()),
            model: "kimi-k2.5".into(),
            api_url: "https://api.moonshot.cn/v1/chat/completions".into(),
            timeout_secs: 60,
        };
        MoonshotClient::new(&config)
            .unwrap()
            .with_base_url(format!("{base_url}/v1/chat/completions"))
    }

    fn text_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "cmpl_test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn complete_returns_final_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("你好")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("你好"));
        assert!(!result.has_tool_calls());
    }

    #[tokio::test]
    async fn complete_surfaces_tool_calls() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_receivables_summary",
                            "arguments": "{}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let tools = vec![ToolDefinition::function(
            "get_receivables_summary",
            "Summarize receivables",
            serde_json::json!({"type": "object", "properties": {}}),
        )];
        let result = client
            .complete(&[ChatMessage::user("who owes me money?")], &tools)
            .await
            .unwrap();
        assert!(result.has_tool_calls());
        assert_eq!(result.tool_calls[0].function.name, "get_receivables_summary");
    }

    #[tokio::test]
    async fn complete_retries_on_429() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "Rate limited"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("after retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("after retry"));
    }

    #[tokio::test]
    async fn complete_fails_on_400_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.complete(&[ChatMessage::user("hi")], &[]).await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn complete_exhausts_retries_on_503() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Service overloaded"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.complete(&[ChatMessage::user("hi")], &[]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn client_sends_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.complete(&[ChatMessage::user("hi")], &[]).await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[test]
    fn new_fails_without_api_key() {
        let config = MoonshotConfig {
            api_key: None,
            model: "kimi-k2.5".into(),
            api_url: "https://api.moonshot.cn/v1/chat/completions".into(),
            timeout_secs: 60,
        };
        assert!(MoonshotClient::new(&config).is_err());
    }
}
