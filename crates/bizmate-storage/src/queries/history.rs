// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries against the `conversation_history` table.

use std::str::FromStr;

use bizmate_core::{BizmateError, ConversationTurn, TurnRole, UserId};

use crate::database::{Database, map_tr_err, now_millis};

/// The most recent `limit` turns for a user, oldest first.
pub async fn recent(
    db: &Database,
    user_id: &UserId,
    limit: usize,
) -> Result<Vec<ConversationTurn>, BizmateError> {
    let user_id = user_id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, role, content, timestamp
                 FROM conversation_history
                 WHERE user_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let mut turns: Vec<ConversationTurn> = stmt
                .query_map(rusqlite::params![user_id, limit as i64], |row| {
                    let role_str: String = row.get(1)?;
                    Ok(ConversationTurn {
                        user_id: UserId(row.get(0)?),
                        role: TurnRole::from_str(&role_str).unwrap_or(TurnRole::User),
                        content: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect::<Result<_, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a user+assistant pair atomically, then prune turns older than the
/// retention window.
pub async fn append_exchange(
    db: &Database,
    user_id: &UserId,
    user_text: &str,
    assistant_text: &str,
    retain: usize,
) -> Result<(), BizmateError> {
    let user_id = user_id.as_str().to_string();
    let user_text = user_text.to_string();
    let assistant_text = assistant_text.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_millis();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversation_history (user_id, role, content, timestamp)
                 VALUES (?1, 'user', ?2, ?3)",
                rusqlite::params![user_id, user_text, now],
            )?;
            tx.execute(
                "INSERT INTO conversation_history (user_id, role, content, timestamp)
                 VALUES (?1, 'assistant', ?2, ?3)",
                rusqlite::params![user_id, assistant_text, now],
            )?;
            tx.execute(
                "DELETE FROM conversation_history
                 WHERE user_id = ?1 AND id NOT IN (
                     SELECT id FROM conversation_history
                     WHERE user_id = ?1
                     ORDER BY id DESC LIMIT ?2
                 )",
                rusqlite::params![user_id, retain as i64],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
