// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OCR invoice-recognition contract.

use async_trait::async_trait;

use crate::error::BizmateError;
use crate::types::InvoiceData;

/// Turns an invoice image into a structured extraction result.
///
/// Implementations may chain multiple vendors with failover; the caller only
/// sees a record or a terminal `OcrUnavailable` / `AllOcrProvidersFailed`.
#[async_trait]
pub trait InvoiceRecognizer: Send + Sync + 'static {
    async fn recognize(&self, image_base64: &str) -> Result<InvoiceData, BizmateError>;
}
