// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interpreted reports: BAS/GST summary and cashflow forecast.
//!
//! Both reports aggregate raw accounting data into a Chinese-language
//! interpretation for the assistant to relay. Monetary fields are formatted
//! to two decimals as strings, matching what the model is prompted to quote.

use bizmate_core::{BizmateError, UserId};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::operations::XeroOperations;
use crate::types::{AccountsResponse, Invoice, InvoicesResponse, OrganisationsResponse};

fn money(v: f64) -> String {
    format!("{v:.2}")
}

fn weekday_zh(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "周一",
        chrono::Weekday::Tue => "周二",
        chrono::Weekday::Wed => "周三",
        chrono::Weekday::Thu => "周四",
        chrono::Weekday::Fri => "周五",
        chrono::Weekday::Sat => "周六",
        chrono::Weekday::Sun => "周日",
    }
}

// --- BAS / GST report ---

#[derive(Debug, Clone, Serialize)]
pub struct BasReport {
    pub region: String,
    pub country_code: String,
    pub currency: String,
    pub gst_rate: String,
    pub period: BasPeriod,
    pub sales: BasSales,
    pub purchases: BasPurchases,
    pub gst_summary: GstSummary,
    pub deadline: BasDeadline,
    pub interpretation: BasInterpretation,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasPeriod {
    pub from: String,
    pub to: String,
    pub quarter: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasSales {
    pub total_amount: String,
    pub gst_collected: String,
    pub invoice_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasPurchases {
    pub total_amount: String,
    pub gst_credits: String,
    pub bill_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GstSummary {
    pub gst_collected: String,
    pub gst_credits: String,
    pub net_gst_payable: String,
    pub is_refund: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasDeadline {
    pub due_date: String,
    pub days_remaining: i64,
    pub is_urgent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasInterpretation {
    pub title: String,
    pub summary: String,
    pub explanation: String,
    pub advice: Vec<String>,
}

// --- Cashflow forecast ---

#[derive(Debug, Clone, Serialize)]
pub struct CashflowForecast {
    pub forecast_period: ForecastPeriod,
    pub current_position: CurrentPosition,
    pub upcoming_summary: UpcomingSummary,
    pub daily_forecast: Vec<DailyForecastPoint>,
    pub risks: Vec<String>,
    pub advice: Vec<String>,
    pub interpretation: CashflowInterpretation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPeriod {
    pub days: u32,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentPosition {
    pub bank_balance: String,
    pub bank_accounts: Vec<BankBalance>,
    pub total_receivables: String,
    pub total_payables: String,
    pub net_position: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankBalance {
    pub name: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingSummary {
    pub expected_inflow: String,
    pub expected_outflow: String,
    pub net_flow: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyForecastPoint {
    pub date: String,
    pub day_of_week: String,
    pub expected_inflow: String,
    pub expected_outflow: String,
    pub projected_balance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashflowInterpretation {
    pub summary: String,
    pub health_status: String,
    pub key_insight: String,
}

impl XeroOperations {
    /// Quarter-to-date GST position with filing deadline and advice.
    pub async fn bas_report(&self, user_id: &UserId) -> Result<BasReport, BizmateError> {
        let orgs: OrganisationsResponse = self.gateway.get(user_id, "/Organisation", &[]).await?;
        let organisation = orgs.organisations.into_iter().next().unwrap_or_default();
        let country = organisation.country.unwrap_or_else(|| "AU".to_string());
        let is_australia = country == "AU" || country == "Australia";
        let is_new_zealand = country == "NZ" || country == "New Zealand";

        let today = chrono::Utc::now().date_naive();
        let quarter0 = (today.month0() / 3) as i32;
        let quarter_start = NaiveDate::from_ymd_opt(today.year(), quarter0 as u32 * 3 + 1, 1)
            .ok_or_else(|| BizmateError::Internal("quarter start out of range".into()))?;
        let from = quarter_start.format("%Y-%m-%d").to_string();
        let to = today.format("%Y-%m-%d").to_string();

        let sales_where =
            format!("Date >= DateTime({from}) && Date <= DateTime({to}) && Type == \"ACCREC\"");
        let bills_where =
            format!("Date >= DateTime({from}) && Date <= DateTime({to}) && Type == \"ACCPAY\"");
        let sales: InvoicesResponse = self
            .gateway
            .get(user_id, "/Invoices", &[("where", sales_where.as_str()), ("page", "1")])
            .await?;
        let bills: InvoicesResponse = self
            .gateway
            .get(user_id, "/Invoices", &[("where", bills_where.as_str()), ("page", "1")])
            .await?;

        let (total_sales, gst_collected, sales_count) = tax_totals(&sales.invoices);
        let (total_purchases, gst_credits, bill_count) = tax_totals(&bills.invoices);
        let net_gst = gst_collected - gst_credits;

        // BAS is due on the 28th of the month after the quarter ends.
        let due_month0 = (quarter0 + 1) * 3;
        let due_date = NaiveDate::from_ymd_opt(
            today.year() + due_month0 / 12,
            (due_month0 % 12) as u32 + 1,
            28,
        )
        .ok_or_else(|| BizmateError::Internal("due date out of range".into()))?;
        let days_remaining = (due_date - today).num_days();

        let mut advice = Vec::new();
        if net_gst > 1000.0 {
            advice.push("💡 本期应缴税款较高，建议检查是否有遗漏的进项税抵扣发票".to_string());
        }
        if total_purchases < total_sales * 0.3 {
            advice.push(
                "💡 您的采购支出相对较低，如有计划采购设备或存货，可考虑在本期完成以抵扣GST"
                    .to_string(),
            );
        }
        if is_australia {
            advice.push("📅 澳洲 BAS 通常每季度28日前申报，建议提前准备".to_string());
        } else {
            advice.push(
                "📅 新西兰 GST 申报周期根据注册类型不同，请确认您的具体截止日期".to_string(),
            );
        }

        let (tax_name, office) = if is_australia {
            ("BAS", "ATO")
        } else {
            ("GST", "IRD")
        };
        info!(user = %user_id, net_gst, "BAS report computed");

        Ok(BasReport {
            region: if is_australia {
                "Australia".to_string()
            } else if is_new_zealand {
                "New Zealand".to_string()
            } else {
                "Unknown".to_string()
            },
            country_code: country,
            currency: organisation.base_currency.unwrap_or_else(|| {
                if is_australia { "AUD" } else { "NZD" }.to_string()
            }),
            gst_rate: if is_australia {
                "10%".to_string()
            } else if is_new_zealand {
                "15%".to_string()
            } else {
                "Unknown".to_string()
            },
            period: BasPeriod {
                from,
                to,
                quarter: quarter0 as u32 + 1,
                year: today.year(),
            },
            sales: BasSales {
                total_amount: money(total_sales),
                gst_collected: money(gst_collected),
                invoice_count: sales_count,
            },
            purchases: BasPurchases {
                total_amount: money(total_purchases),
                gst_credits: money(gst_credits),
                bill_count,
            },
            gst_summary: GstSummary {
                gst_collected: money(gst_collected),
                gst_credits: money(gst_credits),
                net_gst_payable: money(net_gst),
                is_refund: net_gst < 0.0,
            },
            deadline: BasDeadline {
                due_date: due_date.format("%Y-%m-%d").to_string(),
                days_remaining,
                is_urgent: days_remaining <= 7,
            },
            interpretation: BasInterpretation {
                title: if is_australia {
                    "BAS 税务报告".to_string()
                } else {
                    "GST Return 报告".to_string()
                },
                summary: format!(
                    "本{}应缴{tax_name} ${}",
                    if is_australia { "季度" } else { "期" },
                    money(net_gst.abs())
                ),
                explanation: if net_gst > 0.0 {
                    format!("您需要向{office}缴纳 ${} 的税款", money(net_gst))
                } else {
                    format!("您可以向{office}申请退还 ${}", money(net_gst.abs()))
                },
                advice,
            },
        })
    }

    /// Daily cash position over the horizon, from open invoices, open bills,
    /// and active bank account balances.
    pub async fn cashflow_forecast(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<CashflowForecast, BizmateError> {
        let receivables: InvoicesResponse = self
            .gateway
            .get(
                user_id,
                "/Invoices",
                &[
                    ("where", "Type == \"ACCREC\" && Status != \"PAID\" && Status != \"VOIDED\""),
                    ("page", "1"),
                ],
            )
            .await?;
        let payables: InvoicesResponse = self
            .gateway
            .get(
                user_id,
                "/Invoices",
                &[
                    ("where", "Type == \"ACCPAY\" && Status != \"PAID\" && Status != \"VOIDED\""),
                    ("page", "1"),
                ],
            )
            .await?;
        let accounts: AccountsResponse = self
            .gateway
            .get(
                user_id,
                "/Accounts",
                &[("where", "Type == \"BANK\" && Status == \"ACTIVE\"")],
            )
            .await?;

        let today = chrono::Utc::now().date_naive();
        let horizon_end = today + Duration::days(days as i64);

        let (total_receivables, upcoming_receivables, inflows_by_date) =
            flows_by_due_date(&receivables.invoices, horizon_end);
        let (total_payables, upcoming_payables, outflows_by_date) =
            flows_by_due_date(&payables.invoices, horizon_end);

        let bank_accounts: Vec<BankBalance> = accounts
            .accounts
            .into_iter()
            .map(|a| BankBalance {
                name: a.name,
                balance: a.balance,
            })
            .collect();
        let bank_balance: f64 = bank_accounts.iter().map(|a| a.balance).sum();

        // Walk the horizon day by day, recording weekly checkpoints and
        // every day that has a flow.
        let mut daily_forecast = Vec::new();
        let mut recorded_balances = Vec::new();
        let mut running_balance = bank_balance;
        for i in 0..=days {
            let date = today + Duration::days(i as i64);
            let inflow = inflows_by_date
                .iter()
                .find(|(d, _)| *d == date)
                .map(|(_, v)| *v)
                .unwrap_or(0.0);
            let outflow = outflows_by_date
                .iter()
                .find(|(d, _)| *d == date)
                .map(|(_, v)| *v)
                .unwrap_or(0.0);
            running_balance += inflow - outflow;

            if i % 7 == 0 || inflow > 0.0 || outflow > 0.0 {
                recorded_balances.push(running_balance);
                daily_forecast.push(DailyForecastPoint {
                    date: date.format("%Y-%m-%d").to_string(),
                    day_of_week: weekday_zh(date).to_string(),
                    expected_inflow: money(inflow),
                    expected_outflow: money(outflow),
                    projected_balance: money(running_balance),
                });
            }
        }

        let min_balance = recorded_balances
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);

        let mut risks = Vec::new();
        if min_balance < 0.0 {
            risks.push(format!(
                "⚠️ 预测期内可能出现负现金流，最低余额 ${}",
                money(min_balance)
            ));
        }
        if (0.0..5000.0).contains(&min_balance) {
            risks.push("⚠️ 现金流偏紧，建议关注应收账款回收".to_string());
        }
        if total_payables > total_receivables + bank_balance {
            risks.push("⚠️ 应付账款总额超过可用资金，可能需要安排付款计划".to_string());
        }

        let mut advice = Vec::new();
        if upcoming_receivables > 0.0 {
            advice.push(format!(
                "💡 未来{days}天有 ${} 应收账款到期，建议提前跟进",
                money(upcoming_receivables)
            ));
        }
        if upcoming_payables > 0.0 {
            advice.push(format!(
                "💡 未来{days}天有 ${} 应付账款到期，请确保账户余额充足",
                money(upcoming_payables)
            ));
        }
        if total_receivables > bank_balance * 2.0 {
            advice.push("💡 应收账款较高，建议加强催收或考虑保理融资".to_string());
        }

        info!(user = %user_id, days, min_balance, "cashflow forecast computed");

        Ok(CashflowForecast {
            forecast_period: ForecastPeriod {
                days,
                from: today.format("%Y-%m-%d").to_string(),
                to: horizon_end.format("%Y-%m-%d").to_string(),
            },
            current_position: CurrentPosition {
                bank_balance: money(bank_balance),
                bank_accounts,
                total_receivables: money(total_receivables),
                total_payables: money(total_payables),
                net_position: money(bank_balance + total_receivables - total_payables),
            },
            upcoming_summary: UpcomingSummary {
                expected_inflow: money(upcoming_receivables),
                expected_outflow: money(upcoming_payables),
                net_flow: money(upcoming_receivables - upcoming_payables),
            },
            daily_forecast,
            risks,
            advice,
            interpretation: CashflowInterpretation {
                summary: format!(
                    "当前银行余额 ${}，未来{days}天预计{} ${}",
                    money(bank_balance),
                    if upcoming_receivables > upcoming_payables {
                        "净流入"
                    } else {
                        "净流出"
                    },
                    money((upcoming_receivables - upcoming_payables).abs())
                ),
                health_status: if min_balance > 10000.0 {
                    "健康".to_string()
                } else if min_balance > 0.0 {
                    "需关注".to_string()
                } else {
                    "紧张".to_string()
                },
                key_insight: cashflow_insight(
                    bank_balance,
                    total_receivables,
                    total_payables,
                    upcoming_receivables,
                    upcoming_payables,
                ),
            },
        })
    }
}

/// Sum of subtotal and tax over finalized invoices, plus a count of those
/// carrying any tax.
fn tax_totals(invoices: &[Invoice]) -> (f64, f64, u32) {
    let mut total = 0.0;
    let mut tax = 0.0;
    let mut count = 0;
    for inv in invoices {
        if inv.is_finalized() {
            total += inv.sub_total;
            tax += inv.total_tax;
            if inv.total_tax > 0.0 {
                count += 1;
            }
        }
    }
    (total, tax, count)
}

/// Totals plus per-date amounts for invoices due inside the horizon.
fn flows_by_due_date(
    invoices: &[Invoice],
    horizon_end: NaiveDate,
) -> (f64, f64, Vec<(NaiveDate, f64)>) {
    let mut total = 0.0;
    let mut upcoming = 0.0;
    let mut by_date: Vec<(NaiveDate, f64)> = Vec::new();
    for inv in invoices {
        total += inv.amount_due;
        if let Some(due) = inv.due_date_parsed() {
            if due <= horizon_end {
                upcoming += inv.amount_due;
                match by_date.iter_mut().find(|(d, _)| *d == due) {
                    Some((_, amount)) => *amount += inv.amount_due,
                    None => by_date.push((due, inv.amount_due)),
                }
            }
        }
    }
    (total, upcoming, by_date)
}

fn cashflow_insight(
    balance: f64,
    receivables: f64,
    payables: f64,
    upcoming_in: f64,
    upcoming_out: f64,
) -> String {
    let mut insights = Vec::new();

    // Days of runway at the current payables burn rate.
    let runway = if payables > 0.0 {
        balance / (payables / 30.0)
    } else {
        999.0
    };
    if runway < 30.0 {
        insights.push("现金流紧张，建议加快收款或控制支出");
    } else if runway < 60.0 {
        insights.push("现金流尚可，但建议保持关注");
    } else {
        insights.push("现金流健康");
    }

    if receivables > payables * 1.5 {
        insights.push("应收账款偏高，存在坏账风险");
    }
    if upcoming_out > upcoming_in && upcoming_out > balance * 0.5 {
        insights.push("近期有大额支出，请提前准备资金");
    }

    insights.join("；")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::tests::operations;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user() -> UserId {
        UserId("feishu:u1".into())
    }

    fn iso(date: NaiveDate) -> String {
        format!("{}T00:00:00", date.format("%Y-%m-%d"))
    }

    #[tokio::test]
    async fn bas_report_totals_finalized_invoices_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Organisation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Organisations": [{"Name": "Acme Pty Ltd", "Country": "AU",
                                   "BaseCurrency": "AUD"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCREC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCREC", "Status": "AUTHORISED", "SubTotal": 1000.0, "TotalTax": 100.0},
                    {"Type": "ACCREC", "Status": "PAID", "SubTotal": 500.0, "TotalTax": 50.0},
                    {"Type": "ACCREC", "Status": "DRAFT", "SubTotal": 9999.0, "TotalTax": 999.0}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCPAY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCPAY", "Status": "AUTHORISED", "SubTotal": 200.0, "TotalTax": 20.0}
                ]
            })))
            .mount(&server)
            .await;

        let ops = operations(&server).await;
        let report = ops.bas_report(&user()).await.unwrap();

        assert_eq!(report.region, "Australia");
        assert_eq!(report.gst_rate, "10%");
        assert_eq!(report.sales.total_amount, "1500.00");
        assert_eq!(report.sales.gst_collected, "150.00");
        assert_eq!(report.purchases.gst_credits, "20.00");
        assert_eq!(report.gst_summary.net_gst_payable, "130.00");
        assert!(!report.gst_summary.is_refund);
        assert!(report.deadline.due_date.ends_with("-28"));
        // Region advice is always present.
        assert!(report.interpretation.advice.iter().any(|a| a.contains("BAS")));
    }

    #[tokio::test]
    async fn bas_report_flags_refund_when_credits_exceed_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Organisation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Organisations": [{"Name": "Kiwi Ltd", "Country": "NZ"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCREC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCPAY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCPAY", "Status": "PAID", "SubTotal": 400.0, "TotalTax": 60.0}
                ]
            })))
            .mount(&server)
            .await;

        let ops = operations(&server).await;
        let report = ops.bas_report(&user()).await.unwrap();
        assert_eq!(report.region, "New Zealand");
        assert_eq!(report.gst_rate, "15%");
        assert!(report.gst_summary.is_refund);
        assert!(report.interpretation.explanation.contains("IRD"));
    }

    #[tokio::test]
    async fn cashflow_forecast_projects_running_balance() {
        let server = MockServer::start().await;
        let today = chrono::Utc::now().date_naive();

        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCREC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCREC", "Status": "AUTHORISED", "AmountDue": 3000.0,
                     "DueDate": iso(today + Duration::days(5))},
                    {"Type": "ACCREC", "Status": "AUTHORISED", "AmountDue": 1000.0,
                     "DueDate": iso(today + Duration::days(90))}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCPAY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCPAY", "Status": "AUTHORISED", "AmountDue": 2000.0,
                     "DueDate": iso(today + Duration::days(10))}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Accounts": [
                    {"Name": "Business Cheque", "Type": "BANK", "Status": "ACTIVE",
                     "Balance": 12000.0},
                    {"Name": "Savings", "Type": "BANK", "Status": "ACTIVE", "Balance": 3000.0}
                ]
            })))
            .mount(&server)
            .await;

        let ops = operations(&server).await;
        let forecast = ops.cashflow_forecast(&user(), 30).await.unwrap();

        assert_eq!(forecast.current_position.bank_balance, "15000.00");
        assert_eq!(forecast.current_position.total_receivables, "4000.00");
        // Only the invoice due inside the horizon counts as upcoming.
        assert_eq!(forecast.upcoming_summary.expected_inflow, "3000.00");
        assert_eq!(forecast.upcoming_summary.expected_outflow, "2000.00");
        assert_eq!(forecast.interpretation.health_status, "健康");

        // Flow days are recorded in the day-by-day projection.
        let inflow_day = (today + Duration::days(5)).format("%Y-%m-%d").to_string();
        let point = forecast
            .daily_forecast
            .iter()
            .find(|p| p.date == inflow_day)
            .unwrap();
        assert_eq!(point.expected_inflow, "3000.00");
        assert_eq!(point.projected_balance, "18000.00");
    }

    #[tokio::test]
    async fn cashflow_forecast_flags_negative_balance_risk() {
        let server = MockServer::start().await;
        let today = chrono::Utc::now().date_naive();

        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCREC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Invoices"))
            .and(query_param_contains_type("ACCPAY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Invoices": [
                    {"Type": "ACCPAY", "Status": "AUTHORISED", "AmountDue": 8000.0,
                     "DueDate": iso(today + Duration::days(3))}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.xro/2.0/Accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Accounts": [
                    {"Name": "Business Cheque", "Type": "BANK", "Status": "ACTIVE",
                     "Balance": 1000.0}
                ]
            })))
            .mount(&server)
            .await;

        let ops = operations(&server).await;
        let forecast = ops.cashflow_forecast(&user(), 30).await.unwrap();
        assert_eq!(forecast.interpretation.health_status, "紧张");
        assert!(forecast.risks.iter().any(|r| r.contains("负现金流")));
        assert!(forecast.risks.iter().any(|r| r.contains("付款计划")));
    }

    // The where filters differ only in invoice type; match on that.
    fn query_param_contains_type(
        invoice_type: &str,
    ) -> impl wiremock::Match + Send + Sync + 'static {
        let needle = format!("\"{invoice_type}\"");
        QueryWhereContains { needle }
    }

    struct QueryWhereContains {
        needle: String,
    }

    impl wiremock::Match for QueryWhereContains {
        fn matches(&self, request: &wiremock::Request) -> bool {
            request
                .url
                .query_pairs()
                .any(|(k, v)| k == "where" && v.contains(&self.needle))
        }
    }
}
