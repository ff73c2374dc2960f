// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Baidu VAT-invoice OCR.
//!
//! Returns structured per-field results, so no text extraction is needed.
//! OAuth tokens are cached for 29 days (Baidu issues 30-day tokens).

use std::time::Duration;

use async_trait::async_trait;
use bizmate_core::types::InvoiceRegion;
use bizmate_core::{BizmateError, InvoiceData, InvoiceRecognizer};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::extract::parse_amount;

const OCR_URL: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/vat_invoice";
const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

const TOKEN_TTL_MILLIS: i64 = 29 * 24 * 60 * 60 * 1000;
const OCR_TIMEOUT: Duration = Duration::from_secs(15);
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

pub struct BaiduOcr {
    http: reqwest::Client,
    api_key: String,
    secret_key: String,
    token: Mutex<Option<CachedToken>>,
    ocr_url: String,
    token_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct OcrResponse {
    words_result: Option<WordsResult>,
    error_msg: Option<String>,
}

#[derive(Deserialize)]
struct Word {
    word: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct WordsResult {
    #[serde(rename = "InvoiceType")]
    invoice_type: Option<Word>,
    #[serde(rename = "InvoiceCode")]
    invoice_code: Option<Word>,
    #[serde(rename = "InvoiceNum")]
    invoice_num: Option<Word>,
    #[serde(rename = "InvoiceDate")]
    invoice_date: Option<Word>,
    #[serde(rename = "TotalAmount")]
    total_amount: Option<Word>,
    #[serde(rename = "TotalTax")]
    total_tax: Option<Word>,
    #[serde(rename = "AmountInFigures")]
    amount_in_figures: Option<Word>,
    #[serde(rename = "SellerName")]
    seller_name: Option<Word>,
    #[serde(rename = "SellerRegisterNum")]
    seller_register_num: Option<Word>,
    #[serde(rename = "PurchaserName")]
    purchaser_name: Option<Word>,
    #[serde(rename = "CommodityName")]
    commodity_name: Vec<Word>,
}

fn word(field: &Option<Word>) -> String {
    field.as_ref().map(|w| w.word.clone()).unwrap_or_default()
}

fn amount(field: &Option<Word>) -> f64 {
    field.as_ref().map(|w| parse_amount(&w.word)).unwrap_or(0.0)
}

impl BaiduOcr {
    pub fn new(api_key: String, secret_key: String) -> Result<Self, BizmateError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            api_key,
            secret_key,
            token: Mutex::new(None),
            ocr_url: OCR_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        })
    }

    /// Overrides endpoints (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoints(mut self, ocr_url: String, token_url: String) -> Self {
        self.ocr_url = ocr_url;
        self.token_url = token_url;
        self
    }

    async fn access_token(&self) -> Result<String, BizmateError> {
        let mut cache = self.token.lock().await;
        if let Some(cached) = cache.as_ref() {
            if chrono::Utc::now().timestamp_millis() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let response: TokenResponse = self
            .http
            .post(&self.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ])
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|e| BizmateError::Provider {
                message: format!("Baidu token request failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .json()
            .await
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to parse Baidu token response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let token = response.access_token.ok_or_else(|| BizmateError::Provider {
            message: "Baidu token response carried no access_token".into(),
            source: None,
        })?;
        debug!("Baidu OCR token refreshed");
        *cache = Some(CachedToken {
            access_token: token.clone(),
            expires_at: chrono::Utc::now().timestamp_millis() + TOKEN_TTL_MILLIS,
        });
        Ok(token)
    }
}

#[async_trait]
impl InvoiceRecognizer for BaiduOcr {
    async fn recognize(&self, image_base64: &str) -> Result<InvoiceData, BizmateError> {
        let access_token = self.access_token().await?;

        let response: OcrResponse = self
            .http
            .post(&self.ocr_url)
            .query(&[("access_token", access_token.as_str())])
            .form(&[("image", image_base64)])
            .timeout(OCR_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BizmateError::Timeout {
                        duration: OCR_TIMEOUT,
                    }
                } else {
                    BizmateError::Provider {
                        message: format!("Baidu OCR request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?
            .json()
            .await
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to parse Baidu OCR response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let words = response.words_result.ok_or_else(|| BizmateError::Provider {
            message: response
                .error_msg
                .unwrap_or_else(|| "Baidu OCR returned an empty result".into()),
            source: None,
        })?;

        Ok(InvoiceData {
            invoice_type: {
                let t = word(&words.invoice_type);
                if t.is_empty() { "未知".to_string() } else { t }
            },
            invoice_code: word(&words.invoice_code),
            invoice_num: word(&words.invoice_num),
            invoice_date: word(&words.invoice_date),
            total_amount: amount(&words.total_amount),
            total_tax: amount(&words.total_tax),
            amount_in_figures: amount(&words.amount_in_figures),
            seller_name: word(&words.seller_name),
            seller_register_num: word(&words.seller_register_num),
            purchaser_name: word(&words.purchaser_name),
            commodity_name: words
                .commodity_name
                .iter()
                .map(|w| w.word.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            region: InvoiceRegion::Cn,
            provider: "baidu".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BaiduOcr {
        BaiduOcr::new("ak".into(), "sk".into())
            .unwrap()
            .with_endpoints(
                format!("{}/rest/2.0/ocr/v1/vat_invoice", server.uri()),
                format!("{}/oauth/2.0/token", server.uri()),
            )
    }

    #[tokio::test]
    async fn recognize_normalizes_structured_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/2.0/token"))
            .and(query_param("grant_type", "client_credentials"))
            .and(query_param("client_id", "ak"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "baidu-token"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/2.0/ocr/v1/vat_invoice"))
            .and(query_param("access_token", "baidu-token"))
            .and(body_string_contains("image="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "words_result": {
                    "InvoiceType": {"word": "增值税专用发票"},
                    "InvoiceNum": {"word": "12345678"},
                    "InvoiceDate": {"word": "2024年03月15日"},
                    "TotalAmount": {"word": "1200.00"},
                    "TotalTax": {"word": "156.00"},
                    "AmountInFigures": {"word": "¥1356.00"},
                    "SellerName": {"word": "北京创新科技有限公司"},
                    "CommodityName": [{"word": "咨询服务"}, {"word": "技术支持"}]
                }
            })))
            .mount(&server)
            .await;

        let ocr = client(&server);
        let data = ocr.recognize("aW1hZ2U=").await.unwrap();
        assert_eq!(data.provider, "baidu");
        assert_eq!(data.region, InvoiceRegion::Cn);
        assert_eq!(data.invoice_num, "12345678");
        assert_eq!(data.amount_in_figures, 1356.0);
        assert_eq!(data.billable_amount(), 1356.0);
        assert_eq!(data.commodity_name, "咨询服务, 技术支持");
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "baidu-token"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/2.0/ocr/v1/vat_invoice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "words_result": {}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let ocr = client(&server);
        ocr.recognize("aW1hZ2U=").await.unwrap();
        ocr.recognize("aW1hZ2U=").await.unwrap();
    }

    #[tokio::test]
    async fn error_message_from_api_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "baidu-token"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/2.0/ocr/v1/vat_invoice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error_msg": "image format error"
            })))
            .mount(&server)
            .await;

        let ocr = client(&server);
        let err = ocr.recognize("bm90LWFuLWltYWdl").await.unwrap_err();
        assert!(err.to_string().contains("image format error"));
    }
}
