// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Xero identity and accounting APIs.
//!
//! Provider JSON is parsed into these records at the gateway boundary so the
//! rest of the crate works with typed data instead of raw `Value` trees.

use serde::Deserialize;

/// Response from the token endpoint (authorization-code and refresh grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

/// Error envelope from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// One entry from `GET /connections`: an organisation the user authorized.
#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "tenantName", default)]
    pub tenant_name: Option<String>,
}

/// Envelope for `GET`/`PUT /Invoices`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoicesResponse {
    #[serde(rename = "Invoices", default)]
    pub invoices: Vec<Invoice>,
}

/// A Xero invoice (ACCREC) or bill (ACCPAY).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Invoice {
    #[serde(rename = "InvoiceID")]
    pub invoice_id: String,
    #[serde(rename = "InvoiceNumber")]
    pub invoice_number: String,
    #[serde(rename = "Type")]
    pub invoice_type: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "DueDate")]
    pub due_date: Option<String>,
    #[serde(rename = "SubTotal")]
    pub sub_total: f64,
    #[serde(rename = "TotalTax")]
    pub total_tax: f64,
    #[serde(rename = "Total")]
    pub total: f64,
    #[serde(rename = "AmountDue")]
    pub amount_due: f64,
    #[serde(rename = "AmountPaid")]
    pub amount_paid: f64,
    #[serde(rename = "Reference")]
    pub reference: Option<String>,
    #[serde(rename = "Contact")]
    pub contact: Option<ContactRef>,
}

impl Invoice {
    /// Due date as a calendar date, when present and parseable.
    ///
    /// Xero returns ISO timestamps under `Accept: application/json`; the
    /// first ten characters carry the date.
    pub fn due_date_parsed(&self) -> Option<chrono::NaiveDate> {
        let raw = self.due_date.as_deref()?;
        chrono::NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
    }

    /// Invoices count toward tax totals only once approved.
    pub fn is_finalized(&self) -> bool {
        self.status == "AUTHORISED" || self.status == "PAID"
    }
}

/// Embedded contact reference on an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactRef {
    #[serde(rename = "ContactID")]
    pub contact_id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Envelope for `GET /Contacts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactsResponse {
    #[serde(rename = "Contacts", default)]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(rename = "ContactID")]
    pub contact_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "EmailAddress")]
    pub email_address: Option<String>,
    #[serde(rename = "IsCustomer")]
    pub is_customer: Option<bool>,
    #[serde(rename = "IsSupplier")]
    pub is_supplier: Option<bool>,
}

/// Envelope for `GET /Organisation`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganisationsResponse {
    #[serde(rename = "Organisations", default)]
    pub organisations: Vec<Organisation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Organisation {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "BaseCurrency")]
    pub base_currency: Option<String>,
}

/// Envelope for `GET /Accounts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsResponse {
    #[serde(rename = "Accounts", default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Account {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub account_type: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Balance")]
    pub balance: f64,
}
