// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-token lifecycle: cached credential lookup with proactive refresh.
//!
//! A token within the safety margin of its expiry is refreshed before use,
//! so API calls never go out with an access token about to lapse mid-flight.

use std::sync::Arc;
use std::time::Duration;

use bizmate_config::model::XeroConfig;
use bizmate_core::{BizmateError, Credential, CredentialStore, UserId};
use tracing::{debug, info, warn};

use crate::types::{TokenErrorResponse, TokenResponse};

const TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Refresh this long before the recorded expiry instant.
pub const REFRESH_SAFETY_MARGIN_MILLIS: i64 = 5 * 60 * 1000;

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Manages per-user Xero access tokens backed by a [`CredentialStore`].
pub struct TokenManager {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    store: Arc<dyn CredentialStore>,
    token_url: String,
}

impl TokenManager {
    pub fn new(
        config: &XeroConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, BizmateError> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| BizmateError::Config("xero.client_id is not set".into()))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| BizmateError::Config("xero.client_secret is not set".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            store,
            token_url: TOKEN_URL.to_string(),
        })
    }

    /// Overrides the token endpoint (for testing with wiremock).
    #[cfg(test)]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Returns a live access token and the tenant id for the user.
    ///
    /// Refreshes when the stored token is inside the safety margin. A
    /// rejected refresh grant deletes the credential, so the user is asked
    /// to authorize again rather than hitting the same wall on every turn.
    pub async fn access(&self, user_id: &UserId) -> Result<(String, String), BizmateError> {
        let cred = self
            .store
            .get(user_id)
            .await?
            .ok_or(BizmateError::NotConnected)?;
        let tenant_id = cred.tenant_id.clone().ok_or(BizmateError::NoTenant)?;

        if cred.expires_at - now_millis() > REFRESH_SAFETY_MARGIN_MILLIS {
            debug!(user = %user_id, "access token still fresh");
            return Ok((cred.access_token, tenant_id));
        }

        info!(user = %user_id, "access token near expiry, refreshing");
        let refreshed = self.refresh(user_id, &cred).await?;
        Ok((refreshed.access_token, tenant_id))
    }

    async fn refresh(
        &self,
        user_id: &UserId,
        cred: &Credential,
    ) -> Result<Credential, BizmateError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", cred.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BizmateError::Transient("token refresh timed out".into())
                } else {
                    BizmateError::Provider {
                        message: format!("token refresh request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let tokens: TokenResponse =
                response.json().await.map_err(|e| BizmateError::Provider {
                    message: format!("failed to parse token response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            // Tenant fields are omitted here; the store preserves the
            // existing ones.
            let updated = Credential {
                user_id: user_id.clone(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                expires_at: now_millis() + tokens.expires_in * 1000,
                tenant_id: None,
                tenant_name: None,
                updated_at: chrono::Utc::now().to_rfc3339(),
            };
            self.store.upsert(&updated).await?;
            info!(user = %user_id, "token refreshed");
            return Ok(updated);
        }

        if status.is_server_error() {
            return Err(BizmateError::Transient(format!(
                "token endpoint returned {status}"
            )));
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
            if err.error == "invalid_grant" {
                warn!(user = %user_id, "refresh grant rejected, deleting credential");
                self.store.delete(user_id).await?;
                return Err(BizmateError::NotConnected);
            }
        }

        warn!(user = %user_id, status = %status, body = %body, "token refresh failed");
        Err(BizmateError::Unauthorized)
    }

    /// Drop the user's credential. Returns true if one existed.
    pub async fn disconnect(&self, user_id: &UserId) -> Result<bool, BizmateError> {
        self.store.delete(user_id).await
    }
}
