// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound Feishu delivery.
//!
//! Messages over the platform's 7000-character limit are split into two
//! parts with continuation markers. Delivery runs under a bounded retry
//! policy; when every attempt fails a short apology is sent so the user is
//! not left waiting on a silent failure.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bizmate_config::model::FeishuConfig;
use bizmate_core::types::{AdapterType, HealthStatus};
use bizmate_core::{BizmateError, PluginAdapter};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::token::AppTokenCache;

const BASE_URL: &str = "https://open.feishu.cn";
const MAX_MESSAGE_CHARS: usize = 7000;
const SEND_TIMEOUT: Duration = Duration::from_secs(15);
const SPLIT_PAUSE: Duration = Duration::from_millis(1500);

const SPLIT_SUFFIX: &str = "\n\n...(内容太长，继续发送剩余部分)";
const SPLIT_PREFIX: &str = "(接上条)\n\n";
const DELIVERY_FAILED_NOTICE: &str = "⚠️ 抱歉，消息发送失败，请稍后重试。";

/// Bounded retry for outbound delivery.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

pub struct FeishuClient {
    http: reqwest::Client,
    tokens: AppTokenCache,
    retry: RetryPolicy,
    base_url: String,
}

impl FeishuClient {
    pub fn new(config: &FeishuConfig) -> Result<Self, BizmateError> {
        Self::with_base_url(config, BASE_URL.to_string())
    }

    /// Separate constructor so tests can point at a local server.
    pub fn with_base_url(config: &FeishuConfig, base_url: String) -> Result<Self, BizmateError> {
        let app_id = config.app_id.clone().ok_or_else(|| {
            BizmateError::Config("feishu.app_id is required for the Feishu channel".into())
        })?;
        let app_secret = config.app_secret.clone().ok_or_else(|| {
            BizmateError::Config("feishu.app_secret is required for the Feishu channel".into())
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BizmateError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let tokens = AppTokenCache::new(http.clone(), app_id, app_secret, base_url.clone());
        Ok(Self {
            http,
            tokens,
            retry: RetryPolicy::default(),
            base_url,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends a text reply to a chat, splitting when over the length limit.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BizmateError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= MAX_MESSAGE_CHARS {
            return self.deliver(chat_id, text).await;
        }

        info!(chat = chat_id, chars = chars.len(), "splitting long message");
        let head: String = chars[..MAX_MESSAGE_CHARS].iter().collect();
        let tail: String = chars[MAX_MESSAGE_CHARS..].iter().collect();
        self.deliver(chat_id, &format!("{head}{SPLIT_SUFFIX}")).await?;
        tokio::time::sleep(SPLIT_PAUSE).await;
        self.deliver(chat_id, &format!("{SPLIT_PREFIX}{tail}")).await
    }

    /// Downloads a message image and returns it base64-encoded.
    pub async fn download_image(&self, image_key: &str) -> Result<String, BizmateError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(format!(
                "{}/open-apis/im/v1/images/{image_key}",
                self.base_url
            ))
            .bearer_auth(&token)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| BizmateError::Channel {
                message: format!("image download failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(BizmateError::Channel {
                message: format!("image download returned {}", response.status()),
                source: None,
            });
        }
        let bytes = response.bytes().await.map_err(|e| BizmateError::Channel {
            message: format!("image download body failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(image_key, size = bytes.len(), "image downloaded");
        Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
    }

    async fn deliver(&self, chat_id: &str, text: &str) -> Result<(), BizmateError> {
        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.backoff).await;
            }
            match self.send_once(chat_id, text).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(chat = chat_id, attempt, error = %e, "message delivery failed");
                    last_error = Some(e);
                }
            }
        }

        // Best effort: tell the user delivery is broken before giving up.
        if text != DELIVERY_FAILED_NOTICE {
            let _ = self.send_once(chat_id, DELIVERY_FAILED_NOTICE).await;
        }
        Err(last_error.unwrap_or_else(|| BizmateError::Channel {
            message: "message delivery failed".into(),
            source: None,
        }))
    }

    async fn send_once(&self, chat_id: &str, text: &str) -> Result<(), BizmateError> {
        let token = self.tokens.access_token().await?;
        let content = serde_json::to_string(&json!({ "text": text }))
            .map_err(|e| BizmateError::Internal(e.to_string()))?;
        let response: SendResponse = self
            .http
            .post(format!(
                "{}/open-apis/im/v1/messages?receive_id_type=chat_id",
                self.base_url
            ))
            .bearer_auth(&token)
            .json(&json!({
                "receive_id": chat_id,
                "msg_type": "text",
                "content": content,
            }))
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| BizmateError::Channel {
                message: format!("message send failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .json()
            .await
            .map_err(|e| BizmateError::Channel {
                message: format!("failed to parse send response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if response.code != 0 {
            return Err(BizmateError::Channel {
                message: format!("message rejected: code {} ({})", response.code, response.msg),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FeishuClient {
    fn name(&self) -> &str {
        "feishu"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 0, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, BizmateError> {
        match self.tokens.access_token().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), BizmateError> {
        Ok(())
    }
}
