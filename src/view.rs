//! Display model handed to the presentation layer.
//!
//! [`build_view`] turns the reconciled bills into ready-to-show strings. A
//! bill that cannot be displayed replaces the whole list with an error
//! placeholder; building a view never fails.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::warn;

use crate::config::BillingConfig;
use crate::error::RenderError;
use crate::filter::{filter_bills, BillFilter};
use crate::models::Bill;
use crate::stats::{compute_stats, BillStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingView {
    pub filter: BillFilter,
    pub stats: BillStats,
    pub revenue_display: String,
    pub average_display: String,
    pub body: ViewBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewBody {
    Cards { cards: Vec<BillCard> },
    Empty { title: String, message: String },
    Error { title: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardAction {
    Pay,
    Print,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLine {
    pub name: String,
    pub qty: u32,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillCard {
    pub bill_id: String,
    pub table_label: String,
    pub ready_time: Option<String>,
    pub status_label: &'static str,
    pub lines: Vec<CardLine>,
    pub total: String,
    pub action: CardAction,
    pub paid_note: Option<String>,
}

impl BillCard {
    pub fn from_bill(bill: &Bill, config: &BillingConfig) -> Result<Self, RenderError> {
        let invalid = |field: &str| RenderError::InvalidAmount {
            bill_id: bill.id().to_string(),
            field: field.to_string(),
        };

        if !is_valid_amount(bill.total()) {
            return Err(invalid("total"));
        }

        let mut lines = Vec::with_capacity(bill.order.items.len());
        for (name, item) in &bill.order.items {
            let amount = item.line_amount();
            if !is_valid_amount(item.price) || !is_valid_amount(amount) {
                return Err(invalid(name.as_str()));
            }
            lines.push(CardLine {
                name: name.clone(),
                qty: item.qty,
                amount: config.format_amount(amount),
            });
        }

        let paid_note = if bill.paid {
            match (&bill.payment_method, bill.paid_time) {
                (Some(method), Some(paid_time)) => Some(format!(
                    "Paid by {method} at {}",
                    local_time_of_day(paid_time)
                )),
                _ => return Err(RenderError::MissingPaymentDetails(bill.id().to_string())),
            }
        } else {
            None
        };

        Ok(Self {
            bill_id: bill.id().to_string(),
            table_label: format!("Table {}", bill.table()),
            ready_time: bill.order.ready_time.map(local_time_of_day),
            status_label: if bill.paid { "Paid" } else { "Unpaid" },
            lines,
            total: format!("Total: {}", config.format_amount(bill.total())),
            action: if bill.paid {
                CardAction::Print
            } else {
                CardAction::Pay
            },
            paid_note,
        })
    }
}

/// Build the view for `bills` under `filter`. Stats always cover every bill.
pub fn build_view(bills: &[Bill], filter: BillFilter, config: &BillingConfig) -> BillingView {
    let stats = compute_stats(bills);
    let body = build_body(bills, filter, config);
    BillingView {
        filter,
        stats,
        revenue_display: config.format_amount(stats.total_revenue),
        average_display: config.format_amount(stats.average_bill_value as f64),
        body,
    }
}

fn build_body(bills: &[Bill], filter: BillFilter, config: &BillingConfig) -> ViewBody {
    if bills.is_empty() {
        return ViewBody::Empty {
            title: "No Bills Yet".into(),
            message: "Bills will appear when orders are ready from kitchen".into(),
        };
    }

    let visible = filter_bills(bills, filter);
    if visible.is_empty() {
        return ViewBody::Empty {
            title: format!("No {} Bills", filter.label()),
            message: "No bills match the selected filter.".into(),
        };
    }

    match visible
        .into_iter()
        .map(|bill| BillCard::from_bill(bill, config))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(cards) => ViewBody::Cards { cards },
        Err(e) => {
            warn!(error = %e, "Error rendering bills");
            error_body()
        }
    }
}

/// Placeholder shown when the bill list cannot be rendered.
pub fn error_body() -> ViewBody {
    ViewBody::Error {
        title: "Error Loading Bills".into(),
        message: "Please refresh the page".into(),
    }
}

fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn local_time_of_day(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}
