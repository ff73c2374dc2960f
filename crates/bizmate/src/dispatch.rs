// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background processing of inbound messages.
//!
//! Runs after the webhook has already been acknowledged, so every failure
//! ends in a message to the user rather than an HTTP status. Text goes
//! through the confirmation gate first, then the orchestrator; images go
//! through OCR and staging.

use std::sync::Arc;

use bizmate_core::{BizmateError, InvoiceRecognizer, UserId};
use bizmate_feishu::{Inbound, InboundKind};
use tracing::{error, info, warn};

use crate::routes::AppState;

const THINKING_NOTICE: &str = "⏳ 正在思考...";
const RECOGNIZING_NOTICE: &str = "⏳ 正在识别发票内容...";
const EMPTY_REPLY_NOTICE: &str = "抱歉，我没有得到有效的回复，请重新提问。";
const UNSUPPORTED_NOTICE: &str = "😊 抱歉，我目前只能处理文字和图片消息。\n\n📷 发送发票照片可自动识别并创建Xero发票\n💬 发送文字可查询财务数据";

pub async fn handle_inbound(state: Arc<AppState>, inbound: Inbound) {
    let user = UserId::from_platform("feishu", &inbound.open_id);
    let chat_id = inbound.chat_id.clone();

    let result = match inbound.kind {
        InboundKind::Text(text) => handle_text(&state, &user, &chat_id, &text).await,
        InboundKind::Image { image_key } => {
            handle_image(&state, &user, &chat_id, &image_key).await
        }
        InboundKind::Unsupported { message_type } => {
            info!(user = %user, message_type, "unsupported message type");
            state.feishu.send_text(&chat_id, UNSUPPORTED_NOTICE).await
        }
    };

    if let Err(e) = result {
        error!(user = %user, error = %e, "inbound processing failed");
    }
}

async fn handle_text(
    state: &AppState,
    user: &UserId,
    chat_id: &str,
    text: &str,
) -> Result<(), BizmateError> {
    if text.is_empty() {
        return Ok(());
    }

    // A staged invoice claims the next text message.
    match state.gate.intercept(user, text).await {
        Ok(Some(reply)) => return state.feishu.send_text(chat_id, &reply).await,
        Ok(None) => {}
        Err(e) => {
            warn!(user = %user, error = %e, "confirmation gate failed");
            return state
                .feishu
                .send_text(chat_id, &user_facing_error(&e, &state.auth_link(user)))
                .await;
        }
    }

    state.feishu.send_text(chat_id, THINKING_NOTICE).await?;
    match state.orchestrator.process_message(user, text).await {
        Ok(reply) if reply.trim().is_empty() => {
            state.feishu.send_text(chat_id, EMPTY_REPLY_NOTICE).await
        }
        Ok(reply) => state.feishu.send_text(chat_id, &reply).await,
        Err(e) => {
            warn!(user = %user, error = %e, "orchestrator failed");
            state
                .feishu
                .send_text(chat_id, &user_facing_error(&e, &state.auth_link(user)))
                .await
        }
    }
}

async fn handle_image(
    state: &AppState,
    user: &UserId,
    chat_id: &str,
    image_key: &str,
) -> Result<(), BizmateError> {
    state.feishu.send_text(chat_id, RECOGNIZING_NOTICE).await?;

    let staged = async {
        let image_base64 = state.feishu.download_image(image_key).await?;
        let invoice = state.recognizer.recognize(&image_base64).await?;
        info!(user = %user, provider = %invoice.provider, "invoice recognized from image");
        state.gate.stage(user, &invoice).await
    }
    .await;

    match staged {
        Ok(card) => state.feishu.send_text(chat_id, &card).await,
        Err(e) => {
            warn!(user = %user, error = %e, "invoice recognition failed");
            state
                .feishu
                .send_text(
                    chat_id,
                    &format!(
                        "❌ 发票识别失败: {e}\n\n请确保：\n1. 图片清晰可读\n2. 是正规发票\n3. 重试或手动输入信息"
                    ),
                )
                .await
        }
    }
}

/// Converts a taxonomy error into the message shown in chat. Never exposes
/// transport detail beyond the error's display text.
fn user_facing_error(error: &BizmateError, auth_link: &str) -> String {
    match error {
        BizmateError::NotConnected | BizmateError::Unauthorized => format!(
            "🔑 **Xero 账户未连接**\n\n请完成以下步骤：\n\n1️⃣ 点击链接授权：\n{auth_link}\n\n2️⃣ 登录你的 Xero 账号\n\n3️⃣ 授权 Bizmate 访问财务数据\n\n4️⃣ 返回飞书继续对话\n\n⚠️ 只需授权一次，之后数据会自动同步"
        ),
        BizmateError::Timeout { .. } => "⏱️ 请求超时了，请稍后再试。".to_string(),
        BizmateError::Transient(_) | BizmateError::RateLimited => {
            "🌐 服务暂时不可用，请稍后再试。".to_string()
        }
        BizmateError::ToolLoopExceeded { .. } => {
            "🤯 这个问题有点复杂，我处理不过来了。请把问题拆小一点再问我。".to_string()
        }
        other => format!("抱歉，处理您的请求时出现了问题，请稍后再试。\n\n错误详情: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_message_contains_the_auth_link() {
        let link = "https://bot.example.com/xero/auth?user_id=feishu:ou_1";
        let message = user_facing_error(&BizmateError::NotConnected, link);
        assert!(message.contains(link));
        assert!(message.contains("Xero 账户未连接"));
    }

    #[test]
    fn transient_errors_ask_for_retry() {
        let message = user_facing_error(&BizmateError::Transient("503".into()), "unused");
        assert!(message.contains("稍后再试"));
        // Transport detail stays out of the chat.
        assert!(!message.contains("503"));
    }

    #[test]
    fn loop_cap_gets_a_dedicated_message() {
        let message =
            user_facing_error(&BizmateError::ToolLoopExceeded { rounds: 8 }, "unused");
        assert!(message.contains("拆小"));
    }
}
