// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry and executors.
//!
//! Tool schemas are OpenAI-style function definitions consumed by the model
//! for tool selection. Executors never propagate taxonomy errors to the
//! orchestrator; every failure becomes a structured
//! `{error, message, action_required}` payload the model can explain in
//! natural language.

use std::sync::Arc;

use async_trait::async_trait;
use bizmate_core::{BizmateError, ToolDefinition, UserId};
use bizmate_xero::XeroOperations;
use serde_json::{json, Value};
use tracing::{info, warn};

const DEFAULT_FORECAST_DAYS: u32 = 30;
const MAX_FORECAST_DAYS: u32 = 365;

/// The fixed tool set advertised to the model.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "get_customer_invoices",
            "查询指定客户的历史发票记录",
            json!({
                "type": "object",
                "properties": {
                    "customer_name": { "type": "string", "description": "客户名称" }
                },
                "required": ["customer_name"]
            }),
        ),
        ToolDefinition::function(
            "get_receivables_summary",
            "获取应收账款汇总，显示每个客户的未付金额",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            "get_all_invoices",
            "获取所有发票列表",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            "get_all_customers",
            "获取所有客户/联系人列表",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            "create_invoice",
            "为客户创建新发票",
            json!({
                "type": "object",
                "properties": {
                    "customer_name": { "type": "string", "description": "客户名称" },
                    "amount": { "type": "number", "description": "金额" },
                    "description": { "type": "string", "description": "服务描述" }
                },
                "required": ["customer_name", "amount"]
            }),
        ),
        ToolDefinition::function(
            "get_bas_report",
            "获取 BAS/GST 税务报告，自动识别澳洲或新西兰，用中文解读税务数据、截止日期和优化建议",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            "get_cashflow_forecast",
            "获取现金流预测，分析未来30天的资金流入流出情况，预警资金缺口",
            json!({
                "type": "object",
                "properties": {
                    "days": { "type": "number", "description": "预测天数，默认30天", "default": 30 }
                }
            }),
        ),
    ]
}

/// Executes named tool calls for one user. The orchestrator only sees JSON
/// values, never errors.
#[async_trait]
pub trait ToolSet: Send + Sync + 'static {
    async fn execute(&self, user_id: &UserId, name: &str, arguments: &str) -> Value;
}

/// Tool executors backed by the Xero operations layer.
pub struct XeroToolSet {
    operations: Arc<XeroOperations>,
    /// Externally reachable server base URL for authorization links.
    public_url: String,
}

impl XeroToolSet {
    pub fn new(operations: Arc<XeroOperations>, public_url: String) -> Self {
        Self {
            operations,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_url(&self, user_id: &UserId) -> String {
        format!("{}/xero/auth?user_id={}", self.public_url, user_id)
    }

    async fn dispatch(
        &self,
        user_id: &UserId,
        name: &str,
        args: &Value,
    ) -> Result<Value, BizmateError> {
        let ops = &self.operations;
        match name {
            "get_customer_invoices" => {
                let customer = required_str(args, "customer_name")?;
                to_json(ops.customer_invoices(user_id, customer).await?)
            }
            "get_receivables_summary" => to_json(ops.receivables_summary(user_id).await?),
            "get_all_invoices" => to_json(ops.all_invoices(user_id, None).await?),
            "get_all_customers" => to_json(ops.all_customers(user_id).await?),
            "create_invoice" => {
                let customer = required_str(args, "customer_name")?;
                let amount = args
                    .get("amount")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| BizmateError::Internal("missing amount".into()))?;
                let description = args.get("description").and_then(Value::as_str);
                to_json(
                    ops.create_invoice(user_id, customer, amount, description)
                        .await?,
                )
            }
            "get_bas_report" => to_json(ops.bas_report(user_id).await?),
            "get_cashflow_forecast" => {
                to_json(ops.cashflow_forecast(user_id, forecast_days(args)).await?)
            }
            other => Ok(json!({
                "error": "unknown_tool",
                "message": format!("未知工具: {other}"),
            })),
        }
    }
}

#[async_trait]
impl ToolSet for XeroToolSet {
    async fn execute(&self, user_id: &UserId, name: &str, arguments: &str) -> Value {
        let args = parse_args(arguments);
        info!(user = %user_id, tool = name, "executing tool");
        match self.dispatch(user_id, name, &args).await {
            Ok(value) => value,
            Err(e) => {
                warn!(user = %user_id, tool = name, error = %e, "tool execution failed");
                failure_payload(&e, &self.auth_url(user_id))
            }
        }
    }
}

/// Tolerant argument parsing: models occasionally send empty strings for
/// zero-argument tools.
pub(crate) fn parse_args(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(arguments).unwrap_or_else(|_| json!({}))
}

/// Forecast horizon from tool arguments. Missing or non-positive values
/// fall back to the default; oversized values are clamped to one year.
pub(crate) fn forecast_days(args: &Value) -> u32 {
    args.get("days")
        .and_then(Value::as_i64)
        .filter(|d| *d > 0)
        .map(|d| d.min(i64::from(MAX_FORECAST_DAYS)) as u32)
        .unwrap_or(DEFAULT_FORECAST_DAYS)
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, BizmateError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| BizmateError::Internal(format!("missing {key}")))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, BizmateError> {
    serde_json::to_value(value).map_err(|e| BizmateError::Internal(e.to_string()))
}

/// Maps a taxonomy error to the structured payload fed back to the model.
pub(crate) fn failure_payload(error: &BizmateError, auth_url: &str) -> Value {
    match error {
        BizmateError::NotConnected | BizmateError::Unauthorized => json!({
            "error": "not_connected",
            "message": "Xero 账户未连接或授权已失效",
            "action_required": format!("请引导用户点击链接完成授权: {auth_url}"),
        }),
        BizmateError::NoTenant => json!({
            "error": "no_tenant",
            "message": "Xero 已授权但未找到关联的组织",
            "action_required": "请让用户在 Xero 中确认组织访问权限后重新授权",
        }),
        BizmateError::RateLimited => json!({
            "error": "rate_limited",
            "message": "Xero 接口调用过于频繁",
            "action_required": "请让用户稍等一分钟后再试",
        }),
        BizmateError::NotFound => json!({
            "error": "not_found",
            "message": "没有找到对应的记录",
            "action_required": "请确认名称或编号是否正确",
        }),
        BizmateError::Transient(reason) => json!({
            "error": "transient",
            "message": format!("网络或服务暂时不可用: {reason}"),
            "action_required": "请让用户稍后重试",
        }),
        BizmateError::Timeout { .. } => json!({
            "error": "transient",
            "message": "请求超时",
            "action_required": "请让用户稍后重试",
        }),
        other => json!({
            "error": "internal",
            "message": format!("操作失败: {other}"),
            "action_required": "请向用户致歉并建议稍后重试",
        }),
    }
}
