// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Bizmate business assistant.
//!
//! This crate provides the foundational trait definitions, error taxonomy,
//! and common types used throughout the Bizmate workspace. The accounting,
//! LLM, OCR, and channel crates all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BizmateError;
pub use types::{
    AdapterType, ChatCompletion, ChatMessage, ConversationTurn, Credential, HealthStatus,
    InvoiceData, ToolCallRequest, ToolDefinition, TurnRole, UserId,
};

// Re-export all traits at crate root.
pub use traits::{
    ChatProvider, CredentialStore, HistoryStore, InvoiceRecognizer, PendingInvoiceStore,
    PluginAdapter,
};
