// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moonshot (Kimi) provider adapter for Bizmate.
//!
//! Implements [`bizmate_core::ChatProvider`] over the OpenAI-compatible
//! chat-completions endpoint, including tool-calling round trips.

pub mod client;
pub mod types;

pub use client::MoonshotClient;
