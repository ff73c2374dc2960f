// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Bizmate assistant.
//!
//! The accounting-facing variants form a closed taxonomy: the token manager
//! and the accounting gateway classify every failure into one of them before
//! returning, so tool executors can map each case to user-facing guidance
//! instead of surfacing transport errors.

use thiserror::Error;

/// The primary error type used across all Bizmate traits and core operations.
#[derive(Debug, Error)]
pub enum BizmateError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat channel errors (webhook parsing, message delivery, signature mismatch).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No accounting credential exists for the user, or the refresh grant was
    /// rejected as void. The user must (re-)authorize.
    #[error("accounting backend not connected")]
    NotConnected,

    /// A credential exists but no tenant was resolved for it.
    #[error("no accounting tenant resolved for this credential")]
    NoTenant,

    /// The accounting backend rejected the current token mid-call.
    #[error("accounting backend rejected the access token")]
    Unauthorized,

    /// The accounting backend rate-limited the call; back off before retrying.
    #[error("accounting backend rate limit hit")]
    RateLimited,

    /// The requested accounting resource does not exist.
    #[error("accounting resource not found")]
    NotFound,

    /// Network failure, timeout, or 5xx. Safe to retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Authorization correlation token missing, expired, or already consumed.
    #[error("invalid authorization state: {0}")]
    InvalidState(String),

    /// The tool-calling loop hit its iteration cap without converging.
    #[error("tool loop exceeded {rounds} rounds without a final answer")]
    ToolLoopExceeded { rounds: u32 },

    /// No OCR provider is configured.
    #[error("no OCR provider available")]
    OcrUnavailable,

    /// Every configured OCR provider failed on the image.
    #[error("all OCR providers failed: {details}")]
    AllOcrProvidersFailed { details: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BizmateError {
    /// True for failures a caller may retry without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BizmateError::Transient(_) | BizmateError::RateLimited | BizmateError::Timeout { .. }
        )
    }
}
