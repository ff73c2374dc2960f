// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Bizmate adapters and stores.

pub mod adapter;
pub mod ocr;
pub mod provider;
pub mod stores;

pub use adapter::PluginAdapter;
pub use ocr::InvoiceRecognizer;
pub use provider::ChatProvider;
pub use stores::{CredentialStore, HistoryStore, PendingInvoiceStore};
