// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Regex extraction of invoice fields from free-form OCR text.
//!
//! Handles Chinese VAT invoices and Australian/New Zealand tax invoices.
//! Vendors that return structured fields (Baidu) skip this module entirely.

use std::sync::LazyLock;

use bizmate_core::types::InvoiceRegion;
use bizmate_core::InvoiceData;
use regex::Regex;

macro_rules! rx {
    ($name:ident, $pattern:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

// Chinese VAT invoice fields.
rx!(CN_CODE, r"发票代码[:：]?\s*(\d{10,12})");
rx!(CN_NUM, r"发票号码[:：]?\s*(\d{8,20})");
rx!(CN_DATE, r"(\d{4}[年/-]\d{1,2}[月/-]\d{1,2})");
rx!(CN_AMOUNT, r"[¥￥]\s*([\d,]+\.?\d*)");
rx!(CN_SELLER, r"销售方.*?名称[:：]?\s*([^\n]+)");
rx!(CN_PURCHASER, r"购买方.*?名称[:：]?\s*([^\n]+)");
rx!(CN_TAX_NUM, r"(?i)纳税人识别号[:：]?\s*([A-Z0-9]{15,20})");

// AU/NZ business numbers. ABNs are often spaced "12 345 678 901".
rx!(ABN_SPACED, r"(?i)ABN[:\s]*(\d{2}\s*\d{3}\s*\d{3}\s*\d{3})");
rx!(ABN_PLAIN, r"(?i)ABN[:\s]*(\d{11})");
rx!(ABN_DOTTED, r"(?i)A\.?B\.?N\.?[:\s]*(\d[\d\s]{10,})");
rx!(NZBN, r"(?i)NZBN[:\s]*(\d{13})");

// Invoice number, several labelings.
rx!(INV_HASH, r"(?i)Invoice\s*#?[:\s]*([A-Z0-9\-]+)");
rx!(INV_ABBREV, r"(?i)Inv\.?\s*#?[:\s]*([A-Z0-9\-]+)");
rx!(INV_NO, r"(?i)Invoice\s*(?:No|Number)\.?[:\s]*([A-Z0-9\-]+)");
rx!(INV_REF, r"(?i)Reference[:\s]*([A-Z0-9\-]+)");
rx!(INV_ID, r"(?i)Invoice\s*ID[:\s]*([A-Z0-9\-]+)");

// AU/NZ date formats, normalized to YYYY-MM-DD.
rx!(
    DATE_DAY_MONTH,
    r"(?i)(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{4})"
);
rx!(
    DATE_MONTH_DAY,
    r"(?i)(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{1,2})[,\s]+(\d{4})"
);
rx!(DATE_DMY, r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})");
rx!(DATE_ISO, r"(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})");

// Amount labels, most specific first. The word boundary keeps "Subtotal"
// from passing as "Total".
rx!(AMOUNT_TOTAL, r"(?i)\bTotal\s*(?:Amount)?[:\s]*\$?\s*([\d,]+\.\d{2})");
rx!(AMOUNT_DUE, r"(?i)Amount\s*Due[:\s]*\$?\s*([\d,]+\.\d{2})");
rx!(AMOUNT_BALANCE, r"(?i)Balance\s*Due[:\s]*\$?\s*([\d,]+\.\d{2})");
rx!(AMOUNT_TOTAL_BARE, r"(?i)\bTotal[:\s]+\$?\s*([\d,]+\.\d{2})");
rx!(AMOUNT_GST_TOTAL, r"(?i)GST\s*Total[:\s]*\$?\s*([\d,]+\.\d{2})");
rx!(AMOUNT_ANY_DOLLAR, r"\$\s*([\d,]+\.?\d*)");

// Seller near the letterhead or the ABN line. Name classes stay on one
// line so a greedy match cannot swallow the rest of the page.
rx!(
    SELLER_ABOVE_ABN,
    r"(?i)([A-Z][A-Za-z0-9 \t&.,'\-]+(?:Pty|Ltd|Limited|Inc|Corp|Co\.?|Company|Services?|Trading|Group))\s*\n.*ABN"
);
rx!(SELLER_FROM, r"(?i)From[: \t]*\n?[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+)");
rx!(
    SELLER_LETTERHEAD,
    r"(?i)(?:Tax\s*)?Invoice\s*\n[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+(?:Pty|Ltd|Limited))"
);

rx!(PURCHASER_BILL_TO, r"(?i)Bill\s*To[: \t]*\n?[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+)");
rx!(PURCHASER_TO, r"(?i)To[: \t]*\n?[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+)");
rx!(PURCHASER_CUSTOMER, r"(?i)Customer[: \t]*\n?[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+)");
rx!(PURCHASER_SOLD_TO, r"(?i)Sold\s*To[: \t]*\n?[ \t]*([A-Z][A-Za-z0-9 \t&.,'\-]+)");

rx!(GST_AMOUNT, r"(?i)GST[:\s]*\$?\s*([\d,]+\.\d{2})");
rx!(TAX_AMOUNT, r"(?i)Tax[:\s]*\$?\s*([\d,]+\.\d{2})");

rx!(
    DESCRIPTION_BLOCK,
    r"(?is)Description\s*\n+(.{10,200}?)(?:\n\s*\n|\n\s*(?:Qty|Quantity|Subtotal|Total))"
);

/// Strips currency symbols and separators and parses the remainder.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | ',' | '$' | ' ' | '\u{a0}'))
        .collect();
    cleaned.trim().parse().unwrap_or(0.0)
}

/// Extracts invoice fields from OCR text, dispatching on detected region.
pub fn extract_from_text(text: &str) -> InvoiceData {
    let upper = text.to_uppercase();
    let mut data = InvoiceData::default();

    if text.contains("增值税专用发票") {
        data.invoice_type = "增值税专用发票".to_string();
        data.region = InvoiceRegion::Cn;
    } else if text.contains("增值税普通发票") {
        data.invoice_type = "增值税普通发票".to_string();
        data.region = InvoiceRegion::Cn;
    } else if upper.contains("TAX INVOICE") || upper.contains("ABN") || upper.contains("GST") {
        data.invoice_type = "Tax Invoice".to_string();
        data.region = detect_region(&upper);
    } else if upper.contains("INVOICE") {
        data.invoice_type = "Invoice".to_string();
        data.region = detect_region(&upper);
    }

    if data.region == InvoiceRegion::Cn {
        extract_chinese_fields(text, &mut data);
    } else {
        extract_au_nz_fields(text, &mut data);
    }
    data
}

fn detect_region(upper: &str) -> InvoiceRegion {
    if upper.contains("ABN")
        || upper.contains("AUSTRALIA")
        || upper.contains("AUD")
        || upper.contains('$')
    {
        if upper.contains("IRD")
            || upper.contains("NZBN")
            || upper.contains("NEW ZEALAND")
            || upper.contains("NZD")
        {
            return InvoiceRegion::Nz;
        }
        return InvoiceRegion::Au;
    }
    if upper.contains("GST") && (upper.contains("IRD") || upper.contains("NEW ZEALAND")) {
        return InvoiceRegion::Nz;
    }
    InvoiceRegion::Au
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn extract_chinese_fields(text: &str, data: &mut InvoiceData) {
    if let Some(code) = capture(&CN_CODE, text) {
        data.invoice_code = code.to_string();
    }
    if let Some(num) = capture(&CN_NUM, text) {
        data.invoice_num = num.to_string();
    }
    if let Some(date) = capture(&CN_DATE, text) {
        data.invoice_date = date.to_string();
    }

    // The largest printed ¥ amount is the invoice total.
    let max_amount = CN_AMOUNT
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| parse_amount(m.as_str()))
        .fold(0.0_f64, f64::max);
    if max_amount > 0.0 {
        data.total_amount = max_amount;
    }

    if let Some(seller) = capture(&CN_SELLER, text) {
        data.seller_name = seller.trim().to_string();
    }
    if let Some(purchaser) = capture(&CN_PURCHASER, text) {
        data.purchaser_name = purchaser.trim().to_string();
    }
    if let Some(tax_num) = capture(&CN_TAX_NUM, text) {
        data.seller_register_num = tax_num.to_string();
    }
}

fn extract_au_nz_fields(text: &str, data: &mut InvoiceData) {
    for re in [&*ABN_SPACED, &*ABN_PLAIN, &*ABN_DOTTED] {
        if let Some(abn) = capture(re, text) {
            data.seller_register_num = abn.chars().filter(|c| !c.is_whitespace()).collect();
            break;
        }
    }
    if let Some(nzbn) = capture(&NZBN, text) {
        data.seller_register_num = nzbn.to_string();
    }

    for re in [&*INV_HASH, &*INV_ABBREV, &*INV_NO, &*INV_REF, &*INV_ID] {
        if let Some(num) = capture(re, text) {
            let num = num.trim();
            if num.len() > 2 {
                data.invoice_num = num.to_string();
                break;
            }
        }
    }

    if let Some(date) = extract_au_nz_date(text) {
        data.invoice_date = date;
    }

    for re in [
        &*AMOUNT_TOTAL,
        &*AMOUNT_DUE,
        &*AMOUNT_BALANCE,
        &*AMOUNT_TOTAL_BARE,
        &*AMOUNT_GST_TOTAL,
    ] {
        if let Some(caps) = re.captures(text) {
            let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let amount = caps.get(1).map(|m| parse_amount(m.as_str())).unwrap_or(0.0);
            if amount > 0.0
                && (data.total_amount == 0.0 || matched.to_lowercase().contains("total"))
            {
                data.total_amount = amount;
            }
        }
    }
    if data.total_amount == 0.0 {
        data.total_amount = AMOUNT_ANY_DOLLAR
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| parse_amount(m.as_str()))
            .fold(0.0_f64, f64::max);
    }

    for re in [&*SELLER_ABOVE_ABN, &*SELLER_FROM, &*SELLER_LETTERHEAD] {
        if let Some(name) = capture(re, text) {
            let name = name.trim();
            if name.len() > 2 && !name.to_lowercase().contains("invoice") {
                data.seller_name = name.to_string();
                break;
            }
        }
    }

    for re in [
        &*PURCHASER_BILL_TO,
        &*PURCHASER_TO,
        &*PURCHASER_CUSTOMER,
        &*PURCHASER_SOLD_TO,
    ] {
        if let Some(name) = capture(re, text) {
            let name = name.trim();
            if name.len() > 2 {
                data.purchaser_name = name.to_string();
                break;
            }
        }
    }

    if let Some(gst) = capture(&GST_AMOUNT, text).or_else(|| capture(&TAX_AMOUNT, text)) {
        data.total_tax = parse_amount(gst);
    }

    if let Some(desc) = capture(&DESCRIPTION_BLOCK, text) {
        let flattened = desc.replace('\n', ", ");
        let trimmed = flattened.trim();
        data.commodity_name = trimmed.chars().take(100).collect();
    }
}

fn extract_au_nz_date(text: &str) -> Option<String> {
    if let Some(caps) = DATE_DAY_MONTH.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        return Some(format!("{}-{month:02}-{day:02}", &caps[3]));
    }
    if let Some(caps) = DATE_MONTH_DAY.captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        return Some(format!("{}-{month:02}-{day:02}", &caps[3]));
    }
    // Day first: AU/NZ convention for numeric dates.
    if let Some(caps) = DATE_DMY.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        return Some(format!("{}-{month:02}-{day:02}", &caps[3]));
    }
    if let Some(caps) = DATE_ISO.captures(text) {
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return Some(format!("{}-{month:02}-{day:02}", &caps[1]));
    }
    None
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}
