// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat provider for orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bizmate_core::types::{ChatCompletion, ChatMessage, ToolCallRequest, ToolDefinition};
use bizmate_core::{AdapterType, BizmateError, ChatProvider, HealthStatus, PluginAdapter};

/// Replays a queue of scripted completions and records every request it
/// receives. Runs the queue dry and the next call fails, which catches
/// loops that call the model more often than the script expects.
#[derive(Default)]
pub struct MockChatProvider {
    script: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final text answer.
    pub fn push_text(&self, content: &str) {
        self.script.lock().unwrap().push_back(ChatCompletion {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        });
    }

    /// Queue a tool-call round.
    pub fn push_tool_calls(&self, calls: Vec<ToolCallRequest>) {
        self.script.lock().unwrap().push_back(ChatCompletion {
            content: None,
            tool_calls: calls,
        });
    }

    /// Every message list sent so far, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PluginAdapter for MockChatProvider {
    fn name(&self) -> &str {
        "mock-chat-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BizmateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BizmateError> {
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, BizmateError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BizmateError::Provider {
                message: "mock script exhausted".to_string(),
                source: None,
            })
    }
}
