// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bounded tool-calling loop.
//!
//! One invocation per inbound user message: load recent history, call the
//! model with the tool registry, execute any requested tools, feed the
//! results back, and repeat until the model answers in plain text or the
//! round cap is hit. Tool results are appended in the order the model
//! requested them.

use std::sync::Arc;

use bizmate_core::types::TurnRole;
use bizmate_core::{BizmateError, ChatMessage, ChatProvider, HistoryStore, ToolDefinition, UserId};
use tracing::{debug, info, warn};

use crate::tools::{tool_definitions, ToolSet};

pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    history: Arc<dyn HistoryStore>,
    tools: Arc<dyn ToolSet>,
    tool_schemas: Vec<ToolDefinition>,
    system_prompt: String,
    history_limit: usize,
    max_tool_rounds: u32,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        history: Arc<dyn HistoryStore>,
        tools: Arc<dyn ToolSet>,
        system_prompt: String,
        history_limit: usize,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            provider,
            history,
            tools,
            tool_schemas: tool_definitions(),
            system_prompt,
            history_limit,
            max_tool_rounds,
        }
    }

    /// Runs the loop for one user message and returns the assistant's final
    /// text. The user+assistant pair is persisted only on convergence.
    pub async fn process_message(
        &self,
        user_id: &UserId,
        text: &str,
    ) -> Result<String, BizmateError> {
        let turns = self.history.recent(user_id, self.history_limit).await?;
        debug!(user = %user_id, turns = turns.len(), "history loaded");

        let mut messages = Vec::with_capacity(turns.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        for turn in turns {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(turn.content),
                TurnRole::Assistant => ChatMessage::assistant(turn.content),
            });
        }
        messages.push(ChatMessage::user(text));

        for round in 0..self.max_tool_rounds {
            let completion = self.provider.complete(&messages, &self.tool_schemas).await?;

            if !completion.has_tool_calls() {
                let reply = completion.content.unwrap_or_default();
                info!(user = %user_id, rounds = round, "conversation converged");
                self.history.append_exchange(user_id, text, &reply).await?;
                return Ok(reply);
            }

            let names: Vec<&str> = completion
                .tool_calls
                .iter()
                .map(|c| c.function.name.as_str())
                .collect();
            info!(user = %user_id, round, tools = ?names, "model requested tools");

            messages.push(ChatMessage::assistant_tool_calls(
                completion.tool_calls.clone(),
            ));
            for call in &completion.tool_calls {
                let result = self
                    .tools
                    .execute(user_id, &call.function.name, &call.function.arguments)
                    .await;
                messages.push(ChatMessage::tool_result(&call.id, result.to_string()));
            }
        }

        warn!(user = %user_id, rounds = self.max_tool_rounds, "tool loop exceeded");
        Err(BizmateError::ToolLoopExceeded {
            rounds: self.max_tool_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bizmate_core::types::{ToolCallFunction, ToolCallRequest};
    use bizmate_test_utils::{MemoryHistoryStore, MockChatProvider};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Records executed calls and replays canned results by tool name.
    #[derive(Default)]
    struct RecordingToolSet {
        executed: Mutex<Vec<String>>,
        results: Mutex<std::collections::HashMap<String, Value>>,
    }

    impl RecordingToolSet {
        fn with_result(self, name: &str, value: Value) -> Self {
            self.results.lock().unwrap().insert(name.to_string(), value);
            self
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolSet for RecordingToolSet {
        async fn execute(&self, _user_id: &UserId, name: &str, _arguments: &str) -> Value {
            self.executed.lock().unwrap().push(name.to_string());
            self.results
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or_else(|| json!({"ok": true}))
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn orchestrator(
        provider: Arc<MockChatProvider>,
        history: Arc<MemoryHistoryStore>,
        tools: Arc<RecordingToolSet>,
        max_rounds: u32,
    ) -> Orchestrator {
        Orchestrator::new(
            provider,
            history,
            tools,
            "你是测试助手".to_string(),
            20,
            max_rounds,
        )
    }

    #[tokio::test]
    async fn plain_answer_converges_and_persists_history() {
        let provider = Arc::new(MockChatProvider::new());
        provider.push_text("你好！有什么可以帮忙的吗？");
        let history = Arc::new(MemoryHistoryStore::new(20));
        let tools = Arc::new(RecordingToolSet::default());
        let orch = orchestrator(provider.clone(), history.clone(), tools.clone(), 8);

        let user = UserId::from_platform("feishu", "ou_1");
        let reply = orch.process_message(&user, "你好").await.unwrap();
        assert_eq!(reply, "你好！有什么可以帮忙的吗？");
        assert!(tools.executed().is_empty());

        let turns = history.recent(&user, 20).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "你好");
        assert_eq!(turns[1].content, "你好！有什么可以帮忙的吗？");

        // One system message, no prior history, one user turn.
        let first_request = &provider.requests()[0];
        assert_eq!(first_request[0].role, "system");
        assert_eq!(first_request.len(), 2);
    }

    #[tokio::test]
    async fn empty_receivables_round_trips_through_the_tool() {
        let provider = Arc::new(MockChatProvider::new());
        provider.push_tool_calls(vec![call("call_1", "get_receivables_summary", "{}")]);
        provider.push_text("目前没有任何客户欠款，应收账款为 0。");
        let history = Arc::new(MemoryHistoryStore::new(20));
        let tools = Arc::new(RecordingToolSet::default().with_result(
            "get_receivables_summary",
            json!({"total_receivable": 0, "invoice_count": 0}),
        ));
        let orch = orchestrator(provider.clone(), history.clone(), tools.clone(), 8);

        let user = UserId::from_platform("feishu", "ou_1");
        let reply = orch.process_message(&user, "谁欠我钱").await.unwrap();
        assert!(reply.contains("0"));
        assert_eq!(tools.executed(), vec!["get_receivables_summary"]);

        // The second model call must carry the assistant tool-call turn and
        // the tool result echoing the call id.
        let second = &provider.requests()[1];
        let assistant = &second[second.len() - 2];
        assert!(assistant.tool_calls.is_some());
        let result = &second[second.len() - 1];
        assert_eq!(result.role, "tool");
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert!(result.content.as_deref().unwrap().contains("total_receivable"));
    }

    #[tokio::test]
    async fn multiple_calls_in_one_round_keep_request_order() {
        let provider = Arc::new(MockChatProvider::new());
        provider.push_tool_calls(vec![
            call("call_a", "get_all_customers", "{}"),
            call("call_b", "get_all_invoices", "{}"),
        ]);
        provider.push_text("汇总完成。");
        let history = Arc::new(MemoryHistoryStore::new(20));
        let tools = Arc::new(RecordingToolSet::default());
        let orch = orchestrator(provider.clone(), history, tools.clone(), 8);

        let user = UserId::from_platform("feishu", "ou_2");
        orch.process_message(&user, "客户和发票都看看").await.unwrap();
        assert_eq!(tools.executed(), vec!["get_all_customers", "get_all_invoices"]);

        let second = &provider.requests()[1];
        let tail: Vec<_> = second[second.len() - 2..].iter().collect();
        assert_eq!(tail[0].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(tail[1].tool_call_id.as_deref(), Some("call_b"));
    }

    #[tokio::test]
    async fn runaway_tool_loop_hits_the_cap() {
        let provider = Arc::new(MockChatProvider::new());
        for i in 0..3 {
            provider.push_tool_calls(vec![call(
                &format!("call_{i}"),
                "get_all_invoices",
                "{}",
            )]);
        }
        let history = Arc::new(MemoryHistoryStore::new(20));
        let tools = Arc::new(RecordingToolSet::default());
        let orch = orchestrator(provider.clone(), history.clone(), tools, 3);

        let user = UserId::from_platform("feishu", "ou_3");
        let err = orch.process_message(&user, "查发票").await.unwrap_err();
        assert!(matches!(err, BizmateError::ToolLoopExceeded { rounds: 3 }));
        assert_eq!(provider.calls(), 3);

        // Nothing persisted when the loop fails.
        assert!(history.recent(&user, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prior_history_is_replayed_oldest_first() {
        let provider = Arc::new(MockChatProvider::new());
        provider.push_text("第二次回复");
        let history = Arc::new(MemoryHistoryStore::new(20));
        let user = UserId::from_platform("feishu", "ou_4");
        history
            .append_exchange(&user, "第一问", "第一答")
            .await
            .unwrap();
        let tools = Arc::new(RecordingToolSet::default());
        let orch = orchestrator(provider.clone(), history, tools, 8);

        orch.process_message(&user, "第二问").await.unwrap();
        let request = &provider.requests()[0];
        let contents: Vec<_> = request.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(contents[1..], ["第一问", "第一答", "第二问"]);
    }
}
