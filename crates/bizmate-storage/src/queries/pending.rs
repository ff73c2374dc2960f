// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries against the `pending_invoices` table.
//!
//! Each user holds at most one staged invoice. Expiry is swept lazily on
//! read rather than by a background task.

use bizmate_core::{BizmateError, InvoiceData, UserId};
use rusqlite::OptionalExtension;

use crate::database::{Database, map_tr_err, now_millis};

/// Stage an invoice for confirmation, superseding any existing record for
/// the same user.
pub async fn stage(
    db: &Database,
    user_id: &UserId,
    invoice: &InvoiceData,
    ttl_millis: i64,
) -> Result<(), BizmateError> {
    let user_id = user_id.as_str().to_string();
    let payload = serde_json::to_string(invoice)
        .map_err(|e| BizmateError::Internal(format!("invoice serialization failed: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO pending_invoices (user_id, invoice_data, expires_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, payload, now_millis() + ttl_millis],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete all expired records, then return the user's live staged invoice.
pub async fn peek(db: &Database, user_id: &UserId) -> Result<Option<InvoiceData>, BizmateError> {
    let user_id = user_id.as_str().to_string();
    let payload: Option<String> = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM pending_invoices WHERE expires_at <= ?1",
                [now_millis()],
            )?;
            let payload = conn
                .query_row(
                    "SELECT invoice_data FROM pending_invoices WHERE user_id = ?1",
                    [&user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(payload)
        })
        .await
        .map_err(map_tr_err)?;

    match payload {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| BizmateError::Internal(format!("staged invoice corrupt: {e}"))),
        None => Ok(None),
    }
}

pub async fn clear(db: &Database, user_id: &UserId) -> Result<(), BizmateError> {
    let user_id = user_id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM pending_invoices WHERE user_id = ?1", [&user_id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
