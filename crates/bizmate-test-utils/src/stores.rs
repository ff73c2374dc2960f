// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementations with the same visible semantics as the
//! SQLite layer, for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bizmate_core::types::{ConversationTurn, TurnRole};
use bizmate_core::{
    BizmateError, Credential, CredentialStore, HistoryStore, InvoiceData, PendingInvoiceStore,
    UserId,
};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// HashMap-backed credential store. Upsert preserves tenant fields when the
/// incoming record has none, mirroring the SQLite COALESCE behavior.
#[derive(Default)]
pub struct MemoryCredentialStore {
    rows: Mutex<HashMap<UserId, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Credential>, BizmateError> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert(&self, credential: &Credential) -> Result<(), BizmateError> {
        let mut rows = self.rows.lock().unwrap();
        let mut incoming = credential.clone();
        if let Some(existing) = rows.get(&credential.user_id) {
            if incoming.tenant_id.is_none() {
                incoming.tenant_id = existing.tenant_id.clone();
            }
            if incoming.tenant_name.is_none() {
                incoming.tenant_name = existing.tenant_name.clone();
            }
        }
        rows.insert(incoming.user_id.clone(), incoming);
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> Result<bool, BizmateError> {
        Ok(self.rows.lock().unwrap().remove(user_id).is_some())
    }

    async fn connected_count(&self) -> Result<u64, BizmateError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

/// Vec-backed history store pruned to `retain` turns per user.
pub struct MemoryHistoryStore {
    retain: usize,
    turns: Mutex<HashMap<UserId, Vec<ConversationTurn>>>,
}

impl MemoryHistoryStore {
    pub fn new(retain: usize) -> Self {
        Self {
            retain,
            turns: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, BizmateError> {
        let turns = self.turns.lock().unwrap();
        let all = turns.get(user_id).cloned().unwrap_or_default();
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }

    async fn append_exchange(
        &self,
        user_id: &UserId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), BizmateError> {
        let now = now_millis();
        let mut turns = self.turns.lock().unwrap();
        let entry = turns.entry(user_id.clone()).or_default();
        entry.push(ConversationTurn {
            user_id: user_id.clone(),
            role: TurnRole::User,
            content: user_text.to_string(),
            timestamp: now,
        });
        entry.push(ConversationTurn {
            user_id: user_id.clone(),
            role: TurnRole::Assistant,
            content: assistant_text.to_string(),
            timestamp: now,
        });
        let excess = entry.len().saturating_sub(self.retain);
        if excess > 0 {
            entry.drain(..excess);
        }
        Ok(())
    }
}

/// HashMap-backed staged-invoice store with lazy expiry on peek.
#[derive(Default)]
pub struct MemoryPendingStore {
    rows: Mutex<HashMap<UserId, (InvoiceData, i64)>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingInvoiceStore for MemoryPendingStore {
    async fn stage(
        &self,
        user_id: &UserId,
        invoice: &InvoiceData,
        ttl: Duration,
    ) -> Result<(), BizmateError> {
        let expires_at = now_millis() + ttl.as_millis() as i64;
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.clone(), (invoice.clone(), expires_at));
        Ok(())
    }

    async fn peek(&self, user_id: &UserId) -> Result<Option<InvoiceData>, BizmateError> {
        let now = now_millis();
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(rows.get(user_id).map(|(invoice, _)| invoice.clone()))
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), BizmateError> {
        self.rows.lock().unwrap().remove(user_id);
        Ok(())
    }
}
