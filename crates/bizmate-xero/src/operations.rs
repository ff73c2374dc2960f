// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accounting operations exposed to the assistant's tools.
//!
//! Each operation returns a serializable summary record; the tool layer
//! encodes these as JSON for the model.

use std::collections::BTreeMap;
use std::sync::Arc;

use bizmate_core::{BizmateError, UserId};
use serde::Serialize;
use tracing::info;

use crate::gateway::XeroGateway;
use crate::types::{ContactsResponse, Invoice, InvoicesResponse};

/// Default revenue account for invoices created from chat.
const DEFAULT_ACCOUNT_CODE: &str = "200";
/// Payment terms for created invoices, in days.
const DEFAULT_TERMS_DAYS: i64 = 30;

pub struct XeroOperations {
    pub(crate) gateway: Arc<XeroGateway>,
}

/// Flattened view of an invoice for tool output.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub invoice_number: String,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub status: String,
    pub date: Option<String>,
    pub due_date: Option<String>,
    pub total: f64,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub customer: Option<String>,
    pub reference: Option<String>,
}

impl From<&Invoice> for InvoiceSummary {
    fn from(inv: &Invoice) -> Self {
        Self {
            invoice_id: inv.invoice_id.clone(),
            invoice_number: inv.invoice_number.clone(),
            invoice_type: inv.invoice_type.clone(),
            status: inv.status.clone(),
            date: inv.date.clone(),
            due_date: inv.due_date.clone(),
            total: inv.total,
            amount_due: inv.amount_due,
            amount_paid: inv.amount_paid,
            customer: inv.contact.as_ref().map(|c| c.name.clone()),
            reference: inv.reference.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceList {
    pub invoices: Vec<InvoiceSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerInvoices {
    pub customer: String,
    pub invoices: Vec<InvoiceSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub contact_id: String,
    pub name: String,
    pub email: Option<String>,
    pub is_customer: bool,
    pub is_supplier: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerList {
    pub customers: Vec<CustomerSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerReceivable {
    pub amount: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceivablesSummary {
    pub total_receivable: f64,
    pub invoice_count: usize,
    pub by_customer: BTreeMap<String, CustomerReceivable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvoice {
    pub success: bool,
    pub invoice_id: String,
    pub invoice_number: String,
    pub customer: Option<String>,
    pub total: f64,
    pub due_date: Option<String>,
    pub status: String,
}

impl XeroOperations {
    pub fn new(gateway: Arc<XeroGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<XeroGateway> {
        &self.gateway
    }

    /// All invoices, optionally narrowed to one status.
    pub async fn all_invoices(
        &self,
        user_id: &UserId,
        status: Option<&str>,
    ) -> Result<InvoiceList, BizmateError> {
        let filter = status.map(|s| format!("Status==\"{}\"", escape_where(s)));
        let query: Vec<(&str, &str)> = filter
            .as_deref()
            .map(|w| vec![("where", w)])
            .unwrap_or_default();
        let response: InvoicesResponse = self.gateway.get(user_id, "/Invoices", &query).await?;
        let invoices: Vec<InvoiceSummary> =
            response.invoices.iter().map(InvoiceSummary::from).collect();
        let count = invoices.len();
        Ok(InvoiceList { invoices, count })
    }

    /// Invoices whose contact name contains `customer_name`, case-insensitive.
    pub async fn customer_invoices(
        &self,
        user_id: &UserId,
        customer_name: &str,
    ) -> Result<CustomerInvoices, BizmateError> {
        let response: InvoicesResponse = self.gateway.get(user_id, "/Invoices", &[]).await?;
        let needle = customer_name.to_lowercase();
        let invoices: Vec<InvoiceSummary> = response
            .invoices
            .iter()
            .filter(|inv| {
                inv.contact
                    .as_ref()
                    .is_some_and(|c| c.name.to_lowercase().contains(&needle))
            })
            .map(InvoiceSummary::from)
            .collect();
        let count = invoices.len();
        Ok(CustomerInvoices {
            customer: customer_name.to_string(),
            invoices,
            count,
        })
    }

    pub async fn all_customers(&self, user_id: &UserId) -> Result<CustomerList, BizmateError> {
        let response: ContactsResponse = self.gateway.get(user_id, "/Contacts", &[]).await?;
        let customers: Vec<CustomerSummary> = response
            .contacts
            .into_iter()
            .map(|c| CustomerSummary {
                contact_id: c.contact_id,
                name: c.name,
                email: c.email_address,
                is_customer: c.is_customer != Some(false),
                is_supplier: c.is_supplier == Some(true),
            })
            .collect();
        let count = customers.len();
        Ok(CustomerList { customers, count })
    }

    /// Outstanding sales invoices, totaled and grouped by customer.
    pub async fn receivables_summary(
        &self,
        user_id: &UserId,
    ) -> Result<ReceivablesSummary, BizmateError> {
        let response: InvoicesResponse = self
            .gateway
            .get(
                user_id,
                "/Invoices",
                &[("where", "Type==\"ACCREC\" AND Status!=\"PAID\"")],
            )
            .await?;

        let mut total_receivable = 0.0;
        let mut by_customer: BTreeMap<String, CustomerReceivable> = BTreeMap::new();
        for inv in &response.invoices {
            total_receivable += inv.amount_due;
            let customer = inv
                .contact
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let entry = by_customer.entry(customer).or_default();
            entry.amount += inv.amount_due;
            entry.count += 1;
        }

        Ok(ReceivablesSummary {
            total_receivable,
            invoice_count: response.invoices.len(),
            by_customer,
        })
    }

    /// Creates a draft ACCREC invoice with a single line item, dated today
    /// and due in 30 days.
    pub async fn create_invoice(
        &self,
        user_id: &UserId,
        customer_name: &str,
        amount: f64,
        description: Option<&str>,
    ) -> Result<CreatedInvoice, BizmateError> {
        let today = chrono::Utc::now().date_naive();
        let due = today + chrono::Duration::days(DEFAULT_TERMS_DAYS);

        let body = serde_json::json!({
            "Type": "ACCREC",
            "Contact": {"Name": customer_name},
            "Date": today.format("%Y-%m-%d").to_string(),
            "DueDate": due.format("%Y-%m-%d").to_string(),
            "LineItems": [{
                "Description": description.unwrap_or("Service"),
                "Quantity": 1,
                "UnitAmount": amount,
                "AccountCode": DEFAULT_ACCOUNT_CODE,
            }],
            "Status": "DRAFT",
        });

        let response: InvoicesResponse = self.gateway.put(user_id, "/Invoices", &body).await?;
        let created = response
            .invoices
            .into_iter()
            .next()
            .ok_or_else(|| BizmateError::Provider {
                message: "invoice creation returned no invoice".into(),
                source: None,
            })?;

        info!(
            user = %user_id,
            invoice = %created.invoice_number,
            amount,
            "invoice created"
        );
        Ok(CreatedInvoice {
            success: true,
            invoice_id: created.invoice_id,
            invoice_number: created.invoice_number,
            customer: created.contact.map(|c| c.name),
            total: created.total,
            due_date: created.due_date,
            status: created.status,
        })
    }
}

/// Quotes inside a `where` literal would break out of the filter string.
fn escape_where(value: &str) -> String {
    value.replace('"', "")
}
