// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Bizmate workspace.
//!
//! Used as a dev-dependency by the crates that need store or provider
//! doubles; depends only on `bizmate-core` to stay cycle-free.

pub mod provider;
pub mod stores;

pub use provider::MockChatProvider;
pub use stores::{MemoryCredentialStore, MemoryHistoryStore, MemoryPendingStore};
