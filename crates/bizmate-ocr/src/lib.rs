// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice OCR with multi-vendor failover.
//!
//! Providers are tried in a fixed priority order (Baidu first, then Google
//! Vision); the first success wins. A provider is registered only when its
//! credentials are configured. Baidu returns structured invoice fields
//! directly; Vision returns document text that [`extract`] turns into fields.

pub mod baidu;
pub mod extract;
pub mod format;
pub mod vision;

use async_trait::async_trait;
use bizmate_config::model::OcrConfig;
use bizmate_core::types::{AdapterType, HealthStatus};
use bizmate_core::{BizmateError, InvoiceData, InvoiceRecognizer, PluginAdapter};
use tracing::{info, warn};

use baidu::BaiduOcr;
use vision::GoogleVision;

/// Tries each configured OCR provider in priority order.
pub struct FailoverRecognizer {
    providers: Vec<(&'static str, Box<dyn InvoiceRecognizer>)>,
}

impl FailoverRecognizer {
    pub fn from_config(config: &OcrConfig) -> Result<Self, BizmateError> {
        let mut providers: Vec<(&'static str, Box<dyn InvoiceRecognizer>)> = Vec::new();

        if let (Some(api_key), Some(secret_key)) =
            (config.baidu_api_key.clone(), config.baidu_secret_key.clone())
        {
            providers.push(("baidu", Box::new(BaiduOcr::new(api_key, secret_key)?)));
        }
        if let Some(api_key) = config.google_vision_api_key.clone() {
            providers.push(("google", Box::new(GoogleVision::new(api_key)?)));
        }

        if providers.is_empty() {
            warn!("no OCR provider configured, invoice recognition disabled");
        } else {
            let names: Vec<_> = providers.iter().map(|(name, _)| *name).collect();
            info!(providers = ?names, "OCR providers registered");
        }
        Ok(Self { providers })
    }

    #[cfg(test)]
    fn from_providers(providers: Vec<(&'static str, Box<dyn InvoiceRecognizer>)>) -> Self {
        Self { providers }
    }

    /// Names of the registered providers, in failover order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl InvoiceRecognizer for FailoverRecognizer {
    async fn recognize(&self, image_base64: &str) -> Result<InvoiceData, BizmateError> {
        if self.providers.is_empty() {
            return Err(BizmateError::OcrUnavailable);
        }

        let mut failures = Vec::new();
        for (name, provider) in &self.providers {
            match provider.recognize(image_base64).await {
                Ok(data) => {
                    info!(provider = name, "invoice recognized");
                    return Ok(data);
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "OCR provider failed, trying next");
                    failures.push(format!("- {name}: {e}"));
                }
            }
        }
        Err(BizmateError::AllOcrProvidersFailed {
            details: failures.join("\n"),
        })
    }
}

#[async_trait]
impl PluginAdapter for FailoverRecognizer {
    fn name(&self) -> &str {
        "ocr-failover"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 0, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ocr
    }

    async fn health_check(&self) -> Result<HealthStatus, BizmateError> {
        if self.providers.is_empty() {
            Ok(HealthStatus::Degraded("no OCR provider configured".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), BizmateError> {
        Ok(())
    }
}
