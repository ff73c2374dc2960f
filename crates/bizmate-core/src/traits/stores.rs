// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed store contracts for credentials, conversation history, and staged
//! invoices.
//!
//! These are injected abstractions rather than module-level singletons so the
//! token manager, orchestrator, and confirmation gate can be driven by
//! in-memory doubles in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BizmateError;
use crate::types::{ConversationTurn, Credential, InvoiceData, UserId};

/// Persists one OAuth credential record per user.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Fetch the credential for a user, if one exists.
    async fn get(&self, user_id: &UserId) -> Result<Option<Credential>, BizmateError>;

    /// Insert or replace the credential for `credential.user_id`.
    ///
    /// When the incoming record carries no tenant fields, an existing row's
    /// tenant fields are preserved (refresh responses do not re-send them).
    async fn upsert(&self, credential: &Credential) -> Result<(), BizmateError>;

    /// Delete the credential for a user. Returns true if a row was removed.
    async fn delete(&self, user_id: &UserId) -> Result<bool, BizmateError>;

    /// Number of users currently holding a credential.
    async fn connected_count(&self) -> Result<u64, BizmateError>;
}

/// Append-only conversation log, pruned to a fixed number of recent turns
/// per user.
#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    /// The most recent turns for a user, oldest first.
    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, BizmateError>;

    /// Append a user+assistant turn pair and prune older turns past the
    /// retention window.
    async fn append_exchange(
        &self,
        user_id: &UserId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), BizmateError>;
}

/// Holds at most one staged invoice per user, with TTL semantics.
#[async_trait]
pub trait PendingInvoiceStore: Send + Sync + 'static {
    /// Stage an invoice for confirmation, superseding any existing record
    /// for the same user.
    async fn stage(
        &self,
        user_id: &UserId,
        invoice: &InvoiceData,
        ttl: Duration,
    ) -> Result<(), BizmateError>;

    /// Sweep globally-expired records, then return the user's live staged
    /// invoice if any.
    async fn peek(&self, user_id: &UserId) -> Result<Option<InvoiceData>, BizmateError>;

    /// Remove the user's staged invoice, if any.
    async fn clear(&self, user_id: &UserId) -> Result<(), BizmateError>;
}
