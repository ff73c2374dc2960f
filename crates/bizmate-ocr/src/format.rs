// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering recognized invoices for the chat channel and for Xero.

use bizmate_core::types::InvoiceRegion;
use bizmate_core::InvoiceData;

fn or_unrecognized(value: &str) -> &str {
    if value.is_empty() { "未识别" } else { value }
}

/// Renders a recognized invoice as the confirmation card shown to the user.
///
/// Ends with the 确认 / 修改 prompt the confirmation gate listens for.
pub fn format_invoice_info(invoice: &InvoiceData) -> String {
    let provider_tag = if invoice.provider == "google" {
        "🌐 Google Vision"
    } else {
        "🇨🇳 百度OCR"
    };
    let is_au_nz = matches!(invoice.region, InvoiceRegion::Au | InvoiceRegion::Nz);
    let currency = if is_au_nz { "$" } else { "¥" };
    let region_tag = match invoice.region {
        InvoiceRegion::Au => "🇦🇺 澳洲",
        InvoiceRegion::Nz => "🇳🇿 新西兰",
        _ => "🇨🇳 中国",
    };

    let mut display = format!("📄 **发票识别结果** {provider_tag} {region_tag}\n\n");

    display.push_str(&format!(
        "🧾 **发票类型**: {}\n",
        or_unrecognized(&invoice.invoice_type)
    ));

    display.push_str(&format!(
        "🏢 **销售方**: {}\n",
        or_unrecognized(&invoice.seller_name)
    ));
    if !invoice.seller_register_num.is_empty() {
        let label = match invoice.region {
            InvoiceRegion::Au => "ABN",
            InvoiceRegion::Nz => "NZBN",
            _ => "税号",
        };
        display.push_str(&format!(
            "📋 **{label}**: {}\n",
            invoice.seller_register_num
        ));
    }

    display.push_str(&format!(
        "👤 **购买方**: {}\n",
        or_unrecognized(&invoice.purchaser_name)
    ));
    display.push_str(&format!(
        "📅 **开票日期**: {}\n",
        or_unrecognized(&invoice.invoice_date)
    ));
    display.push_str(&format!(
        "🔢 **发票号码**: {}\n",
        or_unrecognized(&invoice.invoice_num)
    ));

    display.push_str(&format!(
        "💰 **金额**: {currency}{:.2}\n",
        invoice.billable_amount()
    ));
    if is_au_nz && invoice.total_tax > 0.0 {
        display.push_str(&format!("📊 **GST**: {currency}{:.2}\n", invoice.total_tax));
    }

    if !invoice.commodity_name.is_empty() {
        let truncated: String = invoice.commodity_name.chars().take(50).collect();
        let ellipsis = if invoice.commodity_name.chars().count() > 50 {
            "..."
        } else {
            ""
        };
        display.push_str(&format!("📦 **商品/服务**: {truncated}{ellipsis}\n"));
    }

    display.push_str(
        "\n请确认以上信息是否正确？\n回复 \"确认\" 直接创建发票\n回复 \"修改\" 告诉我需要修改的内容",
    );
    display
}

/// Builds the Xero line-item description for a confirmed invoice.
pub fn invoice_description(invoice: &InvoiceData) -> String {
    let mut description = format!(
        "发票识别: {}",
        if invoice.commodity_name.is_empty() {
            "商品服务"
        } else {
            &invoice.commodity_name
        }
    );
    if !invoice.invoice_num.is_empty() {
        description.push_str(&format!(" (编号: {})", invoice.invoice_num));
    }
    if matches!(invoice.region, InvoiceRegion::Au | InvoiceRegion::Nz) {
        if !invoice.seller_register_num.is_empty() {
            let label = if invoice.region == InvoiceRegion::Nz {
                "NZBN"
            } else {
                "ABN"
            };
            description.push_str(&format!(" [{label}: {}]", invoice.seller_register_num));
        }
        if invoice.total_tax > 0.0 {
            description.push_str(&format!(" [GST: ${:.2}]", invoice.total_tax));
        }
    }
    description
}

/// Resolves the customer to bill: the caller's override, then the invoice's
/// purchaser, then a placeholder.
pub fn invoice_customer(invoice: &InvoiceData, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }
    if !invoice.purchaser_name.is_empty() {
        return invoice.purchaser_name.clone();
    }
    "未命名客户".to_string()
}
