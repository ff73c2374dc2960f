// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-invoice confirmation gate.
//!
//! A recognized invoice is staged rather than created; the next text message
//! from the same user is classified against a small fixed vocabulary. Confirm
//! creates the invoice and clears the record only when creation succeeds, so
//! the user can retry "确认" after a transient failure without re-sending the
//! photo. Cancel clears unconditionally. Anything else leaves the record
//! untouched and re-prompts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bizmate_core::{BizmateError, InvoiceData, PendingInvoiceStore, UserId};
use bizmate_ocr::format::{format_invoice_info, invoice_customer, invoice_description};
use bizmate_xero::operations::CreatedInvoice;
use bizmate_xero::XeroOperations;
use tracing::{info, warn};

/// The invoice-creation seam, so the gate can be tested without the
/// accounting backend.
#[async_trait]
pub trait InvoiceCreator: Send + Sync + 'static {
    async fn create(
        &self,
        user_id: &UserId,
        customer: &str,
        amount: f64,
        description: &str,
    ) -> Result<CreatedInvoice, BizmateError>;
}

#[async_trait]
impl InvoiceCreator for XeroOperations {
    async fn create(
        &self,
        user_id: &UserId,
        customer: &str,
        amount: f64,
        description: &str,
    ) -> Result<CreatedInvoice, BizmateError> {
        self.create_invoice(user_id, customer, amount, Some(description))
            .await
    }
}

enum ReplyKind {
    Confirm,
    Cancel,
    Unrecognized,
}

fn classify(text: &str) -> ReplyKind {
    let lower = text.trim().to_lowercase();
    if lower.contains("确认") || lower.contains("是的") || lower == "ok" || lower == "yes" {
        ReplyKind::Confirm
    } else if lower.contains("修改") || lower.contains("取消") || lower.contains("cancel") {
        ReplyKind::Cancel
    } else {
        ReplyKind::Unrecognized
    }
}

pub struct ConfirmationGate {
    pending: Arc<dyn PendingInvoiceStore>,
    creator: Arc<dyn InvoiceCreator>,
    ttl: Duration,
}

impl ConfirmationGate {
    pub fn new(
        pending: Arc<dyn PendingInvoiceStore>,
        creator: Arc<dyn InvoiceCreator>,
        ttl: Duration,
    ) -> Self {
        Self {
            pending,
            creator,
            ttl,
        }
    }

    /// Stages a recognized invoice, superseding any prior one, and returns
    /// the confirmation card to show the user.
    pub async fn stage(
        &self,
        user_id: &UserId,
        invoice: &InvoiceData,
    ) -> Result<String, BizmateError> {
        self.pending.stage(user_id, invoice, self.ttl).await?;
        info!(user = %user_id, provider = %invoice.provider, "invoice staged for confirmation");
        Ok(format_invoice_info(invoice))
    }

    /// Routes a text message through the gate. `None` means no invoice is
    /// pending and normal conversation handling should proceed.
    pub async fn intercept(
        &self,
        user_id: &UserId,
        text: &str,
    ) -> Result<Option<String>, BizmateError> {
        let Some(invoice) = self.pending.peek(user_id).await? else {
            return Ok(None);
        };

        let reply = match classify(text) {
            ReplyKind::Confirm => self.confirm(user_id, &invoice).await?,
            ReplyKind::Cancel => {
                self.pending.clear(user_id).await?;
                info!(user = %user_id, "staged invoice cancelled");
                "📝 已取消发票创建。\n\n您可以：\n• 重新发送发票照片\n• 或告诉我正确的信息，我帮您手动创建"
                    .to_string()
            }
            ReplyKind::Unrecognized => {
                "🤔 我检测到您有待确认的发票。\n\n请回复：\n• **确认** - 创建发票\n• **修改/取消** - 重新开始"
                    .to_string()
            }
        };
        Ok(Some(reply))
    }

    async fn confirm(
        &self,
        user_id: &UserId,
        invoice: &InvoiceData,
    ) -> Result<String, BizmateError> {
        let customer = invoice_customer(invoice, None);
        let description = invoice_description(invoice);
        match self
            .creator
            .create(user_id, &customer, invoice.billable_amount(), &description)
            .await
        {
            Ok(created) => {
                self.pending.clear(user_id).await?;
                info!(user = %user_id, invoice = %created.invoice_number, "staged invoice created");
                Ok(format!(
                    "✅ **发票创建成功！**\n\n📄 发票编号: {}\n👤 客户: {}\n💰 金额: ${:.2}\n📅 到期日: {}\n\n您可以在 Xero 中查看详情。",
                    created.invoice_number,
                    created.customer.as_deref().unwrap_or(&customer),
                    created.total,
                    created.due_date.as_deref().unwrap_or("未设置"),
                ))
            }
            // Record stays so the user can retry without re-sending the photo.
            Err(e) => {
                warn!(user = %user_id, error = %e, "staged invoice creation failed");
                Ok(format!(
                    "❌ **创建发票失败**\n\n错误: {e}\n\n可能原因：\n• Xero 未授权 - 请先完成授权\n• 客户不存在 - 先在 Xero 中创建客户\n• 网络超时 - 回复 \"确认\" 重试"
                ))
            }
        }
    }
}
