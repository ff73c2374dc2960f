// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The SQLite-backed implementation of the store traits.

use std::time::Duration;

use async_trait::async_trait;
use bizmate_config::model::StorageConfig;
use bizmate_core::{
    AdapterType, BizmateError, ConversationTurn, Credential, CredentialStore, HealthStatus,
    HistoryStore, InvoiceData, PendingInvoiceStore, PluginAdapter, UserId,
};
use tracing::info;

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite persistence for credentials, conversation history, and staged
/// invoices. One instance is shared across the whole process.
pub struct SqliteStorage {
    db: Database,
    history_limit: usize,
}

impl SqliteStorage {
    /// Open the configured database, applying migrations.
    pub async fn open(config: &StorageConfig, history_limit: usize) -> Result<Self, BizmateError> {
        let db = Database::open(&config.database_path).await?;
        if !config.wal_mode {
            db.connection()
                .call(|conn| {
                    conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
        }
        info!(path = %config.database_path, "storage ready");
        Ok(Self { db, history_limit })
    }

    pub async fn close(&self) -> Result<(), BizmateError> {
        self.db.close().await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION"))
            .unwrap_or_else(|_| semver::Version::new(0, 0, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BizmateError> {
        let probe = self
            .db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        match probe {
            Ok(1) => Ok(HealthStatus::Healthy),
            Ok(n) => Ok(HealthStatus::Degraded(format!("probe returned {n}"))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), BizmateError> {
        self.close().await
    }
}

#[async_trait]
impl CredentialStore for SqliteStorage {
    async fn get(&self, user_id: &UserId) -> Result<Option<Credential>, BizmateError> {
        queries::credentials::get(&self.db, user_id).await
    }

    async fn upsert(&self, credential: &Credential) -> Result<(), BizmateError> {
        queries::credentials::upsert(&self.db, credential).await
    }

    async fn delete(&self, user_id: &UserId) -> Result<bool, BizmateError> {
        queries::credentials::delete(&self.db, user_id).await
    }

    async fn connected_count(&self) -> Result<u64, BizmateError> {
        queries::credentials::connected_count(&self.db).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, BizmateError> {
        queries::history::recent(&self.db, user_id, limit).await
    }

    async fn append_exchange(
        &self,
        user_id: &UserId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), BizmateError> {
        queries::history::append_exchange(
            &self.db,
            user_id,
            user_text,
            assistant_text,
            self.history_limit,
        )
        .await
    }
}

#[async_trait]
impl PendingInvoiceStore for SqliteStorage {
    async fn stage(
        &self,
        user_id: &UserId,
        invoice: &InvoiceData,
        ttl: Duration,
    ) -> Result<(), BizmateError> {
        queries::pending::stage(&self.db, user_id, invoice, ttl.as_millis() as i64).await
    }

    async fn peek(&self, user_id: &UserId) -> Result<Option<InvoiceData>, BizmateError> {
        queries::pending::peek(&self.db, user_id).await
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), BizmateError> {
        queries::pending::clear(&self.db, user_id).await
    }
}
