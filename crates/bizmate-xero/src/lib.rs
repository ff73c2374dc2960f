// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Xero accounting integration for Bizmate.
//!
//! Four layers, each consuming the one below:
//! - [`auth`]: OAuth2 authorization-code flow with single-use correlation
//!   state mapping browser callbacks back to chat users.
//! - [`token`]: per-user access-token cache with proactive refresh.
//! - [`gateway`]: authenticated HTTP calls with error classification.
//! - [`operations`] / [`reports`]: the accounting operations the assistant's
//!   tools invoke.

pub mod auth;
pub mod gateway;
pub mod operations;
pub mod reports;
pub mod token;
pub mod types;

pub use auth::{AuthFlow, AuthOutcome};
pub use gateway::XeroGateway;
pub use operations::XeroOperations;
pub use token::TokenManager;
