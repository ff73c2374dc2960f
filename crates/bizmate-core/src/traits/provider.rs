// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM chat provider contract.

use async_trait::async_trait;

use crate::error::BizmateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatCompletion, ChatMessage, ToolDefinition};

/// A chat-completion provider with OpenAI-style tool calling.
///
/// One request/response pair per call; the orchestrator drives the
/// multi-round tool loop on top of this.
#[async_trait]
pub trait ChatProvider: PluginAdapter {
    /// Send the message list plus tool schemas and return the parsed
    /// assistant turn (final text or tool calls).
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, BizmateError>;
}
