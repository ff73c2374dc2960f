// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./bizmate.toml` > `~/.config/bizmate/bizmate.toml`
//! > `/etc/bizmate/bizmate.toml` with environment variable overrides via the
//! `BIZMATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BizmateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bizmate/bizmate.toml` (system-wide)
/// 3. `~/.config/bizmate/bizmate.toml` (user XDG config)
/// 4. `./bizmate.toml` (local directory)
/// 5. `BIZMATE_*` environment variables
pub fn load_config() -> Result<BizmateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BizmateConfig::default()))
        .merge(Toml::file("/etc/bizmate/bizmate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bizmate/bizmate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bizmate.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Useful for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BizmateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BizmateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BizmateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BizmateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BIZMATE_XERO_CLIENT_ID` must map to
/// `xero.client_id`, not `xero.client.id`.
fn env_provider() -> Env {
    Env::prefixed("BIZMATE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BIZMATE_XERO_CLIENT_ID -> "xero_client_id"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("server_", "server.", 1)
            .replacen("moonshot_", "moonshot.", 1)
            .replacen("xero_", "xero.", 1)
            .replacen("feishu_", "feishu.", 1)
            .replacen("ocr_", "ocr.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
