// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bizmate serve` command implementation.
//!
//! Wires the SQLite stores, the Moonshot provider, the Xero layers, OCR
//! failover, and the Feishu channel into one axum server.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use bizmate_agent::{prompt, ConfirmationGate, Orchestrator, XeroToolSet};
use bizmate_config::BizmateConfig;
use bizmate_core::BizmateError;
use bizmate_feishu::FeishuClient;
use bizmate_llm::MoonshotClient;
use bizmate_ocr::FailoverRecognizer;
use bizmate_storage::SqliteStorage;
use bizmate_xero::{AuthFlow, TokenManager, XeroGateway, XeroOperations};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::{self, AppState, MessageDedupe};

pub async fn run_serve(config: BizmateConfig) -> Result<(), BizmateError> {
    init_tracing(&config.agent.log_level);
    info!(agent = %config.agent.name, "starting bizmate serve");

    let public_url = config.server.public_url.trim_end_matches('/').to_string();

    let storage = Arc::new(
        SqliteStorage::open(&config.storage, config.agent.history_limit).await?,
    );

    let tokens = Arc::new(TokenManager::new(&config.xero, storage.clone())?);
    let auth_flow = Arc::new(AuthFlow::new(
        &config.xero,
        format!("{public_url}/xero/callback"),
        storage.clone(),
    )?);
    let gateway = Arc::new(XeroGateway::new(tokens.clone())?);
    let operations = Arc::new(XeroOperations::new(gateway));

    let provider = Arc::new(MoonshotClient::new(&config.moonshot)?);
    let recognizer = Arc::new(FailoverRecognizer::from_config(&config.ocr)?);
    let feishu = Arc::new(FeishuClient::new(&config.feishu)?);

    let toolset = Arc::new(XeroToolSet::new(operations.clone(), public_url.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        storage.clone(),
        toolset,
        prompt::system_prompt(&config.agent).to_string(),
        config.agent.history_limit,
        config.agent.max_tool_rounds,
    ));
    let gate = Arc::new(ConfirmationGate::new(
        storage.clone(),
        operations,
        Duration::from_secs(config.agent.pending_invoice_ttl_secs),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        config,
        storage: storage.clone(),
        orchestrator,
        gate,
        recognizer,
        feishu,
        auth_flow,
        tokens,
        dedupe: MessageDedupe::new(),
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/xero/auth", get(routes::xero_auth))
        .route("/xero/callback", get(routes::xero_callback))
        .route("/xero/disconnect", get(routes::xero_disconnect))
        .route("/feishu/webhook", post(routes::feishu_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BizmateError::Channel {
            message: format!("failed to bind server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;
    info!("bizmate listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| BizmateError::Channel {
            message: format!("server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    storage.close().await?;
    info!("bizmate stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bizmate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
