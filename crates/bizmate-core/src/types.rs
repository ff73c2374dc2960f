// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Bizmate workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable per-user identity, composed from the chat platform name and the
/// platform-native id (e.g. `feishu:ou_abc123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Build a composite id from a platform name and its native user id.
    pub fn from_platform(platform: &str, native_id: &str) -> Self {
        Self(format!("{platform}:{native_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    Ocr,
}

// --- Accounting credential ---

/// One OAuth credential per user against the accounting backend.
///
/// Exists iff the user has completed authorization at least once and has not
/// disconnected or had the refresh grant rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry instant, epoch milliseconds.
    pub expires_at: i64,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

// --- Conversation history ---

/// Role of a persisted conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// Append-only conversation log entry, pruned to the most recent N per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_id: UserId,
    pub role: TurnRole,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

// --- Invoice extraction ---

/// Geographic flavor of a recognized invoice, driving field extraction
/// and currency presentation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceRegion {
    Cn,
    Au,
    Nz,
    #[default]
    Unknown,
}

/// Structured OCR extraction result, normalized across providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceData {
    pub invoice_type: String,
    pub invoice_code: String,
    pub invoice_num: String,
    /// Normalized `YYYY-MM-DD` where the provider supplied a date.
    pub invoice_date: String,
    pub total_amount: f64,
    pub total_tax: f64,
    /// Printed numeric total, when the provider distinguishes it.
    pub amount_in_figures: f64,
    pub seller_name: String,
    pub seller_register_num: String,
    pub purchaser_name: String,
    pub commodity_name: String,
    pub region: InvoiceRegion,
    /// Which OCR provider produced this record.
    pub provider: String,
}

impl InvoiceData {
    /// The amount to bill: the printed figure when present, else the total.
    pub fn billable_amount(&self) -> f64 {
        if self.amount_in_figures > 0.0 {
            self.amount_in_figures
        } else {
            self.total_amount
        }
    }
}

/// A staged, not-yet-committed invoice awaiting user confirmation.
/// At most one live record per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvoice {
    pub user_id: UserId,
    pub invoice: InvoiceData,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

// --- LLM chat wire types (OpenAI-style tool calling) ---

/// A single message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Echoes the originating call id on `role: "tool"` messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// An assistant turn that requested tool calls.
    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// A tool-result message keyed by the originating call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

/// The named function and its JSON-encoded arguments within a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON object, encoded as a string per the wire contract.
    pub arguments: String,
}

/// A tool the model may select, with a JSON-schema parameter contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function name, description, and parameter schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Parsed assistant turn from a chat completion: either a final text answer
/// or one or more tool calls to execute before the conversation continues.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatCompletion {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_composites_platform_and_native_id() {
        let id = UserId::from_platform("feishu", "ou_abc123");
        assert_eq!(id.as_str(), "feishu:ou_abc123");
    }

    #[test]
    fn tool_result_message_echoes_call_id() {
        let msg = ChatMessage::tool_result("call_1", r#"{"ok":true}"#);
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn plain_messages_omit_tool_fields_on_the_wire() {
        let json = serde_json::to_value(ChatMessage::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn turn_role_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::from_str("assistant").unwrap(), TurnRole::Assistant);
    }

    #[test]
    fn billable_amount_prefers_printed_figure() {
        let mut inv = InvoiceData {
            total_amount: 100.0,
            ..Default::default()
        };
        assert_eq!(inv.billable_amount(), 100.0);
        inv.amount_in_figures = 95.5;
        assert_eq!(inv.billable_amount(), 95.5);
    }

    #[test]
    fn invoice_data_deserializes_with_missing_fields() {
        let inv: InvoiceData = serde_json::from_str(r#"{"seller_name":"Acme"}"#).unwrap();
        assert_eq!(inv.seller_name, "Acme");
        assert_eq!(inv.region, InvoiceRegion::Unknown);
        assert_eq!(inv.total_amount, 0.0);
    }
}
