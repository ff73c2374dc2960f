// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Bizmate.
//!
//! Backs the [`bizmate_core`] store traits with a single serialized
//! connection, embedded refinery migrations, and WAL journaling. All
//! timestamps in the schema are epoch milliseconds.

pub mod database;
mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStorage;
