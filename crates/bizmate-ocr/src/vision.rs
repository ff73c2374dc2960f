// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Cloud Vision OCR.
//!
//! Vision returns raw document text rather than structured invoice fields,
//! so results go through [`crate::extract`] for field extraction.

use std::time::Duration;

use async_trait::async_trait;
use bizmate_core::{BizmateError, InvoiceData, InvoiceRecognizer};
use serde::Deserialize;
use serde_json::json;

use crate::extract::extract_from_text;

const API_URL: &str = "https://vision.googleapis.com/v1/images:annotate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GoogleVision {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ImageResponse {
    #[serde(rename = "fullTextAnnotation")]
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ImageError>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    text: String,
}

#[derive(Deserialize)]
struct ImageError {
    message: String,
}

impl GoogleVision {
    pub fn new(api_key: String) -> Result<Self, BizmateError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BizmateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            api_key,
            api_url: API_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }
}

#[async_trait]
impl InvoiceRecognizer for GoogleVision {
    async fn recognize(&self, image_base64: &str) -> Result<InvoiceData, BizmateError> {
        let body = json!({
            "requests": [{
                "image": { "content": image_base64 },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION", "maxResults": 1 }]
            }]
        });

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BizmateError::Timeout {
                        duration: REQUEST_TIMEOUT,
                    }
                } else {
                    BizmateError::Provider {
                        message: format!("Vision request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(BizmateError::Provider {
                message: format!("Vision API returned {}", response.status()),
                source: None,
            });
        }

        let annotated: AnnotateResponse =
            response.json().await.map_err(|e| BizmateError::Provider {
                message: format!("failed to parse Vision response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let first = annotated
            .responses
            .into_iter()
            .next()
            .unwrap_or_default();
        if let Some(error) = first.error {
            return Err(BizmateError::Provider {
                message: format!("Vision annotation failed: {}", error.message),
                source: None,
            });
        }
        let text = first
            .full_text_annotation
            .map(|a| a.text)
            .ok_or_else(|| BizmateError::Provider {
                message: "Vision found no text in the image".into(),
                source: None,
            })?;

        let mut data = extract_from_text(&text);
        data.provider = "google".to_string();
        // Vision has no separate tax-inclusive figure, the extracted total
        // stands in for it.
        data.amount_in_figures = data.total_amount;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizmate_core::types::InvoiceRegion;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleVision {
        GoogleVision::new("vision-key".into())
            .unwrap()
            .with_api_url(format!("{}/v1/images:annotate", server.uri()))
    }

    #[tokio::test]
    async fn recognize_extracts_fields_from_document_text() {
        let server = MockServer::start().await;
        let text = "TAX INVOICE\nAcme Consulting Pty Ltd\nABN: 51 824 753 556\n\
                    Invoice #: INV-2041\nDate: 15/03/2024\nBill To: Sunrise Cafe\n\
                    Total: $1,100.00\nGST: $100.00\n";
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .and(query_param("key", "vision-key"))
            .and(body_string_contains("DOCUMENT_TEXT_DETECTION"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{ "fullTextAnnotation": { "text": text } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let data = client(&server).recognize("aW1hZ2U=").await.unwrap();
        assert_eq!(data.provider, "google");
        assert_eq!(data.region, InvoiceRegion::Au);
        assert_eq!(data.invoice_num, "INV-2041");
        assert_eq!(data.purchaser_name, "Sunrise Cafe");
        assert_eq!(data.total_amount, 1100.0);
        assert_eq!(data.amount_in_figures, data.total_amount);
    }

    #[tokio::test]
    async fn annotation_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{ "error": { "message": "invalid image content" } }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).recognize("eA==").await.unwrap_err();
        assert!(err.to_string().contains("invalid image content"));
    }

    #[tokio::test]
    async fn blank_image_yields_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).recognize("eA==").await.unwrap_err();
        assert!(err.to_string().contains("no text"));
    }
}
