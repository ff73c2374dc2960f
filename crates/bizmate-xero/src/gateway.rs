// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated gateway for Xero accounting API calls.
//!
//! Resolves the user's access token and tenant, attaches the required
//! headers, and classifies failures into the shared error taxonomy. The
//! gateway itself never retries; callers decide what a transient error
//! is worth.

use std::sync::Arc;
use std::time::Duration;

use bizmate_core::{BizmateError, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::token::TokenManager;

const API_BASE: &str = "https://api.xero.com/api.xro/2.0";

pub struct XeroGateway {
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
    api_base: String,
}

impl XeroGateway {
    pub fn new(tokens: Arc<TokenManager>) -> Result<Self, BizmateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            tokens,
            api_base: API_BASE.to_string(),
        })
    }

    /// Overrides the API base (for testing with wiremock).
    #[cfg(test)]
    pub fn with_api_base(mut self, base: String) -> Self {
        self.api_base = base;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// `GET {api_base}{path}` with optional query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        user_id: &UserId,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BizmateError> {
        let (access_token, tenant_id) = self.tokens.access(user_id).await?;
        let mut request = self
            .http
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(&access_token)
            .header("Xero-tenant-id", &tenant_id)
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(request, path).await
    }

    /// `PUT {api_base}{path}` with a JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        user_id: &UserId,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, BizmateError> {
        let (access_token, tenant_id) = self.tokens.access(user_id).await?;
        let request = self
            .http
            .put(format!("{}{path}", self.api_base))
            .bearer_auth(&access_token)
            .header("Xero-tenant-id", &tenant_id)
            .header("Accept", "application/json")
            .json(body);
        self.execute(request, path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, BizmateError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BizmateError::Transient(format!("request to {path} timed out"))
            } else {
                BizmateError::Provider {
                    message: format!("request to {path} failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        debug!(path, status = %status, "accounting API response");

        if status.is_success() {
            return response.json().await.map_err(|e| BizmateError::Provider {
                message: format!("failed to parse response from {path}: {e}"),
                source: Some(Box::new(e)),
            });
        }

        Err(classify_status(status, path, response.text().await.unwrap_or_default()))
    }
}

fn classify_status(status: reqwest::StatusCode, path: &str, body: String) -> BizmateError {
    match status.as_u16() {
        401 => BizmateError::Unauthorized,
        404 => BizmateError::NotFound,
        429 => BizmateError::RateLimited,
        s if s >= 500 => BizmateError::Transient(format!("{path} returned {status}")),
        _ => BizmateError::Provider {
            message: format!("{path} returned {status}: {body}"),
            source: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoicesResponse;
    use bizmate_config::model::XeroConfig;
    use bizmate_core::{Credential, CredentialStore};
    use bizmate_test_utils::MemoryCredentialStore;
    use wiremock::matchers::{header, method, path as url_path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> XeroGateway {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .upsert(&Credential {
                user_id: UserId("feishu:u1".into()),
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
                expires_at: chrono::Utc::now().timestamp_millis() + 3600 * 1000,
                tenant_id: Some("tenant-1".into()),
                tenant_name: Some("Acme Pty Ltd".into()),
                updated_at: "2026-01-01T00:00:00Z".into(),
            })
            .await
            .unwrap();
        let config = XeroConfig {
            client_id: Some("cid".into()),
            client_secret: Some("csecret".into()),
            redirect_uri: None,
            scopes: "offline_access".into(),
        };
        let tokens = Arc::new(TokenManager::new(&config, store).unwrap());
        XeroGateway::new(tokens)
            .unwrap()
            .with_api_base(format!("{}/api.xro/2.0", server.uri()))
    }

    #[tokio::test]
    async fn get_attaches_auth_and_tenant_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api.xro/2.0/Invoices"))
            .and(header("authorization", "Bearer access-1"))
            .and(header("Xero-tenant-id", "tenant-1"))
            .and(header("Accept", "application/json"))
            .and(query_param("where", "Type==\"ACCREC\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"Invoices": []})),
            )
            .mount(&server)
            .await;

        let gw = gateway(&server).await;
        let result: InvoicesResponse = gw
            .get(
                &UserId("feishu:u1".into()),
                "/Invoices",
                &[("where", "Type==\"ACCREC\"")],
            )
            .await
            .unwrap();
        assert!(result.invoices.is_empty());
    }

    #[tokio::test]
    async fn status_codes_map_to_the_error_taxonomy() {
        for (status, check) in [
            (401, BizmateError::Unauthorized),
            (404, BizmateError::NotFound),
            (429, BizmateError::RateLimited),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(url_path("/api.xro/2.0/Invoices"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let gw = gateway(&server).await;
            let err = gw
                .get::<InvoicesResponse>(&UserId("feishu:u1".into()), "/Invoices", &[])
                .await
                .unwrap_err();
            assert_eq!(
                std::mem::discriminant(&err),
                std::mem::discriminant(&check),
                "status {status} mapped to {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn server_errors_are_transient_and_not_retried_here() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api.xro/2.0/Invoices"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let gw = gateway(&server).await;
        let err = gw
            .get::<InvoicesResponse>(&UserId("feishu:u1".into()), "/Invoices", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BizmateError::Transient(_)));
    }

    #[tokio::test]
    async fn unconnected_user_fails_before_any_request() {
        let server = MockServer::start().await;
        let gw = gateway(&server).await;
        let err = gw
            .get::<InvoicesResponse>(&UserId("feishu:stranger".into()), "/Invoices", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BizmateError::NotConnected));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
