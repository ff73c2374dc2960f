// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 authorization-code flow with correlation state.
//!
//! The chat user id never appears in the authorization URL. A random
//! single-use state token correlates the browser callback with the chat
//! identity, and expires after ten minutes.

use std::sync::Arc;
use std::time::Duration;

use bizmate_config::model::XeroConfig;
use bizmate_core::{BizmateError, Credential, CredentialStore, UserId};
use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{info, warn};

use crate::token::now_millis;
use crate::types::{Connection, TokenResponse};

const AUTH_URL: &str = "https://login.xero.com/identity/connect/authorize";
const TOKEN_URL: &str = "https://identity.xero.com/connect/token";
const CONNECTIONS_URL: &str = "https://api.xero.com/connections";

/// Correlation state lifetime.
const STATE_TTL_MILLIS: i64 = 10 * 60 * 1000;
const STATE_LEN: usize = 32;

struct PendingState {
    user_id: UserId,
    created_at: i64,
}

/// Outcome of a completed authorization callback.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub user_id: UserId,
    /// Name of the connected organisation, when the API reported one.
    pub tenant_name: Option<String>,
}

/// Drives the authorization-code exchange and tenant discovery.
pub struct AuthFlow {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
    store: Arc<dyn CredentialStore>,
    states: DashMap<String, PendingState>,
    auth_url: String,
    token_url: String,
    connections_url: String,
}

impl AuthFlow {
    pub fn new(
        config: &XeroConfig,
        default_redirect_uri: String,
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
        let redirect_uri = config
            .redirect_uri
            .clone()
            .unwrap_or(default_redirect_uri);

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
            redirect_uri,
            scopes: config.scopes.clone(),
            store,
            states: DashMap::new(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            connections_url: CONNECTIONS_URL.to_string(),
        })
    }

    /// Overrides identity endpoints (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoints(mut self, token_url: String, connections_url: String) -> Self {
        self.token_url = token_url;
        self.connections_url = connections_url;
        self
    }

    /// Builds a fresh authorization URL for the user, registering a
    /// single-use correlation state.
    pub fn issue_authorization_url(&self, user_id: &UserId) -> Result<String, BizmateError> {
        self.sweep_expired_states();

        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();
        self.states.insert(
            state.clone(),
            PendingState {
                user_id: user_id.clone(),
                created_at: now_millis(),
            },
        );

        let url = reqwest::Url::parse_with_params(
            &self.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scopes.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| BizmateError::Internal(format!("failed to build auth URL: {e}")))?;

        Ok(url.into())
    }

    /// Completes the callback: consumes the state, exchanges the code, picks
    /// the first connected tenant, and persists the credential.
    pub async fn consume_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<AuthOutcome, BizmateError> {
        // Atomic removal makes the state single-use even under concurrent
        // callbacks.
        let (_, pending) = self.states.remove(state).ok_or_else(|| {
            BizmateError::InvalidState("unknown or already used authorization state".into())
        })?;

        if now_millis() - pending.created_at > STATE_TTL_MILLIS {
            return Err(BizmateError::InvalidState(
                "authorization link expired, please request a new one".into(),
            ));
        }

        let user_id = pending.user_id;
        let tokens = self.exchange_code(code).await?;
        let tenant = self.first_connection(&tokens.access_token).await?;

        let credential = Credential {
            user_id: user_id.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: now_millis() + tokens.expires_in * 1000,
            tenant_id: tenant.as_ref().map(|t| t.tenant_id.clone()),
            tenant_name: tenant.as_ref().and_then(|t| t.tenant_name.clone()),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store.upsert(&credential).await?;

        info!(
            user = %user_id,
            tenant = credential.tenant_name.as_deref().unwrap_or("<unnamed>"),
            "authorization completed"
        );
        Ok(AuthOutcome {
            user_id,
            tenant_name: credential.tenant_name,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, BizmateError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
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
                    BizmateError::Transient("code exchange timed out".into())
                } else {
                    BizmateError::Provider {
                        message: format!("code exchange request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| BizmateError::Provider {
                message: format!("failed to parse token response: {e}"),
                source: Some(Box::new(e)),
            });
        }
        if status.is_server_error() {
            return Err(BizmateError::Transient(format!(
                "token endpoint returned {status}"
            )));
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "code exchange rejected");
        Err(BizmateError::Unauthorized)
    }

    /// The first organisation from `/connections`, or `None` when the user
    /// authorized no tenant. Multi-organisation selection is not offered;
    /// the first connection wins.
    async fn first_connection(
        &self,
        access_token: &str,
    ) -> Result<Option<Connection>, BizmateError> {
        let connections: Vec<Connection> = self
            .http
            .get(&self.connections_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BizmateError::Provider {
                message: format!("connections request failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .json()
            .await
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to parse connections response: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(connections.into_iter().next())
    }

    fn sweep_expired_states(&self) {
        let now = now_millis();
        self.states
            .retain(|_, pending| now - pending.created_at <= STATE_TTL_MILLIS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizmate_test_utils::MemoryCredentialStore;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> XeroConfig {
        XeroConfig {
            client_id: Some("cid".into()),
            client_secret: Some("csecret".into()),
            redirect_uri: Some("https://bot.example.com/xero/callback".into()),
            scopes: "accounting.transactions offline_access".into(),
        }
    }

    fn flow(server: &MockServer) -> (AuthFlow, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let flow = AuthFlow::new(&config(), "http://localhost:3000/xero/callback".into(), store.clone())
            .unwrap()
            .with_endpoints(
                format!("{}/connect/token", server.uri()),
                format!("{}/connections", server.uri()),
            );
        (flow, store)
    }

    fn extract_state(url: &str) -> String {
        let parsed = reqwest::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn authorization_url_carries_oauth_params_and_random_state() {
        let store = Arc::new(MemoryCredentialStore::new());
        let flow =
            AuthFlow::new(&config(), "http://localhost:3000/xero/callback".into(), store).unwrap();

        let user = UserId("feishu:u1".into());
        let url = flow.issue_authorization_url(&user).unwrap();
        assert!(url.starts_with("https://login.xero.com/identity/connect/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=cid"));
        // The chat user id must not leak into the URL.
        assert!(!url.contains("u1"));

        let state = extract_state(&url);
        assert_eq!(state.len(), 32);

        // Two links for the same user carry distinct states.
        let other = flow.issue_authorization_url(&user).unwrap();
        assert_ne!(state, extract_state(&other));
    }

    #[tokio::test]
    async fn callback_exchanges_code_and_persists_first_tenant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"tenantId": "tenant-1", "tenantName": "Acme Pty Ltd"},
                {"tenantId": "tenant-2", "tenantName": "Second Org"}
            ])))
            .mount(&server)
            .await;

        let (flow, store) = flow(&server);
        let user = UserId("feishu:u1".into());
        let url = flow.issue_authorization_url(&user).unwrap();
        let state = extract_state(&url);

        let outcome = flow.consume_callback("auth-code-1", &state).await.unwrap();
        assert_eq!(outcome.user_id, user);
        assert_eq!(outcome.tenant_name.as_deref(), Some("Acme Pty Ltd"));

        let cred = store.get(&user).await.unwrap().unwrap();
        assert_eq!(cred.access_token, "access-1");
        assert_eq!(cred.tenant_id.as_deref(), Some("tenant-1"));
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let (flow, _store) = flow(&server);
        let url = flow
            .issue_authorization_url(&UserId("feishu:u1".into()))
            .unwrap();
        let state = extract_state(&url);

        flow.consume_callback("code", &state).await.unwrap();
        let err = flow.consume_callback("code", &state).await.unwrap_err();
        assert!(matches!(err, BizmateError::InvalidState(_)));
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let server = MockServer::start().await;
        let (flow, _store) = flow(&server);
        let err = flow.consume_callback("code", "nonexistent").await.unwrap_err();
        assert!(matches!(err, BizmateError::InvalidState(_)));
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let server = MockServer::start().await;
        let (flow, _store) = flow(&server);
        flow.states.insert(
            "stale".into(),
            PendingState {
                user_id: UserId("feishu:u1".into()),
                created_at: now_millis() - STATE_TTL_MILLIS - 1,
            },
        );
        let err = flow.consume_callback("code", "stale").await.unwrap_err();
        assert!(matches!(err, BizmateError::InvalidState(_)));
    }

    #[tokio::test]
    async fn callback_without_tenant_saves_credential_with_no_tenant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let (flow, store) = flow(&server);
        let user = UserId("feishu:u1".into());
        let url = flow.issue_authorization_url(&user).unwrap();
        let outcome = flow
            .consume_callback("code", &extract_state(&url))
            .await
            .unwrap();
        assert!(outcome.tenant_name.is_none());
        let cred = store.get(&user).await.unwrap().unwrap();
        assert!(cred.tenant_id.is_none());
    }

    #[tokio::test]
    async fn rejected_code_exchange_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let (flow, _store) = flow(&server);
        let url = flow
            .issue_authorization_url(&UserId("feishu:u1".into()))
            .unwrap();
        let err = flow
            .consume_callback("bad-code", &extract_state(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, BizmateError::Unauthorized));
    }
}
