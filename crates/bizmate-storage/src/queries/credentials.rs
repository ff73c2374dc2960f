// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries against the `xero_credentials` table.

use bizmate_core::{BizmateError, Credential, UserId};
use rusqlite::OptionalExtension;

use crate::database::{Database, map_tr_err};

fn row_to_credential(row: &rusqlite::Row<'_>) -> Result<Credential, rusqlite::Error> {
    Ok(Credential {
        user_id: UserId(row.get(0)?),
        access_token: row.get(1)?,
        refresh_token: row.get(2)?,
        expires_at: row.get(3)?,
        tenant_id: row.get(4)?,
        tenant_name: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub async fn get(db: &Database, user_id: &UserId) -> Result<Option<Credential>, BizmateError> {
    let user_id = user_id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let cred = conn
                .query_row(
                    "SELECT user_id, access_token, refresh_token, expires_at,
                            tenant_id, tenant_name, updated_at
                     FROM xero_credentials WHERE user_id = ?1",
                    [&user_id],
                    row_to_credential,
                )
                .optional()?;
            Ok(cred)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a credential. Tenant fields from an existing row survive
/// when the incoming record has none, since token refresh responses carry only
/// the new token pair.
pub async fn upsert(db: &Database, credential: &Credential) -> Result<(), BizmateError> {
    let cred = credential.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO xero_credentials
                     (user_id, access_token, refresh_token, expires_at,
                      tenant_id, tenant_name, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET
                     access_token = excluded.access_token,
                     refresh_token = excluded.refresh_token,
                     expires_at = excluded.expires_at,
                     tenant_id = COALESCE(excluded.tenant_id, tenant_id),
                     tenant_name = COALESCE(excluded.tenant_name, tenant_name),
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    cred.user_id.as_str(),
                    cred.access_token,
                    cred.refresh_token,
                    cred.expires_at,
                    cred.tenant_id,
                    cred.tenant_name,
                    cred.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete(db: &Database, user_id: &UserId) -> Result<bool, BizmateError> {
    let user_id = user_id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM xero_credentials WHERE user_id = ?1", [&user_id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn connected_count(db: &Database) -> Result<u64, BizmateError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM xero_credentials", [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}
