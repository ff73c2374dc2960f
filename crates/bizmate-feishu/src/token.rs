// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! App access-token cache.
//!
//! Feishu app tokens are valid for two hours; the cache treats them as fresh
//! for 90 minutes so a token is never used near its expiry.

use std::time::Duration;

use bizmate_core::BizmateError;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

const TOKEN_TTL_MILLIS: i64 = 90 * 60 * 1000;
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const TOKEN_PATH: &str = "/open-apis/auth/v3/app_access_token/internal";

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    app_access_token: Option<String>,
}

pub struct AppTokenCache {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    token: Mutex<Option<(String, i64)>>,
    base_url: String,
}

impl AppTokenCache {
    pub fn new(http: reqwest::Client, app_id: String, app_secret: String, base_url: String) -> Self {
        Self {
            http,
            app_id,
            app_secret,
            token: Mutex::new(None),
            base_url,
        }
    }

    pub async fn access_token(&self) -> Result<String, BizmateError> {
        let mut cache = self.token.lock().await;
        if let Some((token, expires_at)) = cache.as_ref() {
            if chrono::Utc::now().timestamp_millis() < *expires_at {
                return Ok(token.clone());
            }
        }

        let response: TokenResponse = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .json(&json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }))
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|e| BizmateError::Channel {
                message: format!("app token request failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .json()
            .await
            .map_err(|e| BizmateError::Channel {
                message: format!("failed to parse app token response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if response.code != 0 {
            return Err(BizmateError::Channel {
                message: format!("app token rejected: code {} ({})", response.code, response.msg),
                source: None,
            });
        }
        let token = response.app_access_token.ok_or_else(|| BizmateError::Channel {
            message: "app token response carried no token".into(),
            source: None,
        })?;

        debug!("Feishu app token refreshed");
        *cache = Some((
            token.clone(),
            chrono::Utc::now().timestamp_millis() + TOKEN_TTL_MILLIS,
        ));
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache(server: &MockServer) -> AppTokenCache {
        AppTokenCache::new(
            reqwest::Client::new(),
            "cli_app".into(),
            "secret".into(),
            server.uri(),
        )
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_partial_json(serde_json::json!({"app_id": "cli_app"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "app_access_token": "t-abc",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache(&server);
        assert_eq!(cache.access_token().await.unwrap(), "t-abc");
        assert_eq!(cache.access_token().await.unwrap(), "t-abc");
    }

    #[tokio::test]
    async fn rejected_credentials_surface_the_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 10003,
                "msg": "invalid app_secret",
            })))
            .mount(&server)
            .await;

        let err = cache(&server).access_token().await.unwrap_err();
        assert!(err.to_string().contains("10003"));
    }
}
