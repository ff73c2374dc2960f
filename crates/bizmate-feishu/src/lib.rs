// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feishu channel adapter for Bizmate.
//!
//! [`events`] parses inbound webhook payloads, [`signature`] verifies them,
//! [`token`] caches the app access token, and [`client`] delivers replies
//! and downloads message images.

pub mod client;
pub mod events;
pub mod signature;
pub mod token;

pub use client::{FeishuClient, RetryPolicy};
pub use events::{Inbound, InboundKind, WebhookPayload};
