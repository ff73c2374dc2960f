// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface: the Feishu webhook, Xero OAuth redirect/callback pages,
//! and the health endpoint.
//!
//! The webhook acknowledges within the request (Feishu retries deliveries
//! that take too long) and pushes the real work to a background task.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect};
use axum::Json;
use bizmate_config::BizmateConfig;
use bizmate_core::{CredentialStore, PluginAdapter, UserId};
use bizmate_feishu::{FeishuClient, WebhookPayload};
use bizmate_ocr::FailoverRecognizer;
use bizmate_storage::SqliteStorage;
use bizmate_xero::{AuthFlow, TokenManager};
use bizmate_agent::{ConfirmationGate, Orchestrator};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Entries older than this are pruned from the dedupe map.
const DEDUPE_WINDOW: Duration = Duration::from_secs(600);
const DEDUPE_PRUNE_THRESHOLD: usize = 1024;

/// Webhook message-id dedupe: duplicate deliveries of the same event must
/// not reach the orchestrator.
#[derive(Default)]
pub struct MessageDedupe {
    /// id -> first-seen epoch millis.
    seen: DashMap<String, i64>,
}

impl MessageDedupe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message id. Returns false when the id was already seen
    /// inside the dedupe window.
    pub fn record(&self, message_id: &str) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        if self.seen.len() > DEDUPE_PRUNE_THRESHOLD {
            let cutoff = now - DEDUPE_WINDOW.as_millis() as i64;
            self.seen.retain(|_, seen| *seen > cutoff);
        }
        match self.seen.entry(message_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }
}

pub struct AppState {
    pub config: BizmateConfig,
    pub storage: Arc<SqliteStorage>,
    pub orchestrator: Arc<Orchestrator>,
    pub gate: Arc<ConfirmationGate>,
    pub recognizer: Arc<FailoverRecognizer>,
    pub feishu: Arc<FeishuClient>,
    pub auth_flow: Arc<AuthFlow>,
    pub tokens: Arc<TokenManager>,
    pub dedupe: MessageDedupe,
}

impl AppState {
    /// Authorization link sent to users who have not connected Xero.
    pub fn auth_link(&self, user_id: &UserId) -> String {
        format!(
            "{}/xero/auth?user_id={}",
            self.config.server.public_url.trim_end_matches('/'),
            user_id
        )
    }
}

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "bizmate",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage_status = match state.storage.health_check().await {
        Ok(status) => format!("{status:?}"),
        Err(e) => format!("error: {e}"),
    };
    let connected_users = state.storage.connected_count().await.unwrap_or(0);
    Json(json!({
        "status": "running",
        "service": "bizmate",
        "storage": storage_status,
        "connected_users": connected_users,
        "ocr_providers": state.recognizer.provider_names(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Deserialize)]
pub struct AuthParams {
    pub user_id: Option<String>,
}

pub async fn xero_auth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthParams>,
) -> impl IntoResponse {
    let Some(user_id) = params.user_id.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "user_id query parameter is required").into_response();
    };
    let user = UserId(user_id);
    match state.auth_flow.issue_authorization_url(&user) {
        Ok(url) => {
            info!(user = %user, "issued authorization redirect");
            Redirect::temporary(&url).into_response()
        }
        Err(e) => {
            warn!(user = %user, error = %e, "authorization redirect failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(&e.to_string())),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub async fn xero_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or(error);
        return (StatusCode::BAD_REQUEST, Html(error_page(&detail))).into_response();
    }
    let (Some(code), Some(correlation)) = (params.code, params.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(error_page("授权回调缺少 code 或 state 参数")),
        )
            .into_response();
    };

    match state.auth_flow.consume_callback(&code, &correlation).await {
        Ok(outcome) => {
            info!(user = %outcome.user_id, tenant = ?outcome.tenant_name, "authorization completed");
            Html(success_page(outcome.tenant_name.as_deref())).into_response()
        }
        Err(e) => {
            warn!(error = %e, "authorization callback failed");
            (StatusCode::BAD_REQUEST, Html(error_page(&e.to_string()))).into_response()
        }
    }
}

pub async fn xero_disconnect(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthParams>,
) -> impl IntoResponse {
    let Some(user_id) = params.user_id.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "user_id query parameter is required").into_response();
    };
    let user = UserId(user_id);
    match state.tokens.disconnect(&user).await {
        Ok(true) => {
            info!(user = %user, "user disconnected from Xero");
            Html(disconnect_page()).into_response()
        }
        Ok(false) => {
            (StatusCode::NOT_FOUND, Html(error_page("该用户尚未连接 Xero"))).into_response()
        }
        Err(e) => {
            warn!(user = %user, error = %e, "disconnect failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(&e.to_string())),
            )
                .into_response()
        }
    }
}

pub async fn feishu_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    if state.config.feishu.verify_signatures {
        if let Some(secret) = state.config.feishu.app_secret.as_deref() {
            let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
            if !bizmate_feishu::signature::verify(
                secret,
                header("x-lark-request-timestamp"),
                header("x-lark-request-nonce"),
                header("x-lark-signature"),
                &body,
            ) {
                warn!("webhook signature verification failed");
                return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad signature"})))
                    .into_response();
            }
        }
    }

    let Ok(payload) = serde_json::from_str::<WebhookPayload>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid body"}))).into_response();
    };

    if let Some(challenge) = payload.challenge() {
        info!("answering webhook URL verification");
        return Json(json!({"challenge": challenge})).into_response();
    }

    let Some(inbound) = payload.inbound() else {
        return Json(json!({"status": "ignored"})).into_response();
    };

    if !state.dedupe.record(&inbound.message_id) {
        info!(message = %inbound.message_id, "duplicate delivery skipped");
        return Json(json!({"status": "duplicate"})).into_response();
    }

    // Acknowledge now; the LLM/tool round-trips happen in the background.
    tokio::spawn(crate::dispatch::handle_inbound(state.clone(), inbound));
    Json(json!({"status": "received"})).into_response()
}

fn page(title: &str, icon: &str, heading: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Bizmate - {title}</title>
<style>
body {{ font-family: Arial, sans-serif; text-align: center; padding: 50px; background: #f5f5f5; }}
.container {{ background: white; padding: 40px; border-radius: 10px; max-width: 500px; margin: 0 auto; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
.icon {{ font-size: 60px; margin: 20px 0; }}
</style>
</head>
<body>
<div class="container">
<div class="icon">{icon}</div>
<h1>{heading}</h1>
{body_html}
</div>
</body>
</html>"#
    )
}

fn success_page(tenant_name: Option<&str>) -> String {
    let tenant_line = tenant_name
        .map(|t| format!("<p>已连接组织：<strong>{t}</strong></p>"))
        .unwrap_or_default();
    page(
        "Xero 认证成功",
        "✅",
        "Xero 认证成功！",
        &format!(
            "{tenant_line}<p>您的 Xero 账户已成功连接到 Bizmate。</p>\
             <p>返回飞书即可查询应收账款、创建发票、查看财务报表。</p>"
        ),
    )
}

fn disconnect_page() -> String {
    page(
        "已断开连接",
        "👋",
        "Xero 连接已断开",
        "<p>您的 Xero 授权已删除，Bizmate 不再访问该账户的财务数据。</p>\
         <p>如需继续使用，请在飞书中重新发起授权。</p>",
    )
}

fn error_page(reason: &str) -> String {
    page(
        "认证失败",
        "❌",
        "认证失败",
        &format!("<p>错误信息：{reason}</p><p>请重试或联系技术支持。</p>"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_embed_reason_and_tenant() {
        assert!(success_page(Some("Demo Company")).contains("Demo Company"));
        assert!(success_page(None).contains("认证成功"));
        assert!(error_page("state expired").contains("state expired"));
        assert!(disconnect_page().contains("连接已断开"));
    }

    #[test]
    fn duplicate_message_ids_are_filtered() {
        let dedupe = MessageDedupe::new();
        assert!(dedupe.record("om_1"));
        assert!(!dedupe.record("om_1"));
        assert!(dedupe.record("om_2"));
    }
}
