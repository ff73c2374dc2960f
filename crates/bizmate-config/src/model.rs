// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Bizmate.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Bizmate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BizmateConfig {
    /// Assistant identity and orchestration settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Moonshot (Kimi) chat API settings.
    #[serde(default)]
    pub moonshot: MoonshotConfig,

    /// Xero accounting integration settings.
    #[serde(default)]
    pub xero: XeroConfig,

    /// Feishu bot integration settings.
    #[serde(default)]
    pub feishu: FeishuConfig,

    /// OCR invoice recognition settings.
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Assistant identity and orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Conversation turns retained (and sent to the model) per user.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Iteration cap for the tool-calling loop.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Seconds a staged invoice stays confirmable.
    #[serde(default = "default_pending_invoice_ttl_secs")]
    pub pending_invoice_ttl_secs: u64,

    /// Inline system prompt override. Defaults to the built-in prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            history_limit: default_history_limit(),
            max_tool_rounds: default_max_tool_rounds(),
            pending_invoice_ttl_secs: default_pending_invoice_ttl_secs(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "bizmate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_limit() -> usize {
    20
}

fn default_max_tool_rounds() -> u32 {
    8
}

fn default_pending_invoice_ttl_secs() -> u64 {
    1800 // 30 minutes
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build authorization links
    /// sent to users (e.g. behind a tunnel or reverse proxy).
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

/// Moonshot (Kimi) chat API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MoonshotConfig {
    /// API key. `None` disables the assistant loop.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat completions endpoint.
    #[serde(default = "default_moonshot_url")]
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_moonshot_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MoonshotConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_url: default_moonshot_url(),
            timeout_secs: default_moonshot_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "kimi-k2.5".to_string()
}

fn default_moonshot_url() -> String {
    "https://api.moonshot.cn/v1/chat/completions".to_string()
}

fn default_moonshot_timeout_secs() -> u64 {
    60
}

/// Xero accounting integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct XeroConfig {
    /// OAuth2 client id. `None` disables the Xero integration.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Redirect URI registered with Xero. Defaults to
    /// `{server.public_url}/xero/callback` when unset.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Requested OAuth scopes.
    #[serde(default = "default_xero_scopes")]
    pub scopes: String,
}

impl Default for XeroConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scopes: default_xero_scopes(),
        }
    }
}

fn default_xero_scopes() -> String {
    "openid profile email accounting.transactions accounting.contacts \
     accounting.reports.read accounting.settings.read offline_access"
        .to_string()
}

/// Feishu bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeishuConfig {
    /// Feishu app id. `None` disables the Feishu channel.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Feishu app secret (also the webhook signing key).
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Reject webhook deliveries whose signature does not verify.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            verify_signatures: default_verify_signatures(),
        }
    }
}

fn default_verify_signatures() -> bool {
    true
}

/// OCR invoice recognition configuration.
///
/// A provider is enabled iff its key material is present; providers are
/// tried in fixed priority order (Baidu, then Google Vision).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OcrConfig {
    /// Baidu OCR API key.
    #[serde(default)]
    pub baidu_api_key: Option<String>,

    /// Baidu OCR secret key.
    #[serde(default)]
    pub baidu_secret_key: Option<String>,

    /// Google Cloud Vision API key.
    #[serde(default)]
    pub google_vision_api_key: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("bizmate").join("bizmate.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("bizmate.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
