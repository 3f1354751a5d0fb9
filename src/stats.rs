//! Summary figures shown above the bill list.

use serde::Serialize;

use crate::models::Bill;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillStats {
    pub unpaid_count: usize,
    pub paid_count: usize,
    /// Money collected: paid bills only.
    pub total_revenue: f64,
    /// Typical ticket size: every bill regardless of payment, rounded to a
    /// whole currency unit. Zero when there are no bills.
    pub average_bill_value: i64,
}

pub fn compute_stats(bills: &[Bill]) -> BillStats {
    let mut stats = BillStats::default();
    let mut grand_total = 0.0;

    for bill in bills {
        grand_total += bill.total();
        if bill.paid {
            stats.paid_count += 1;
            stats.total_revenue += bill.total();
        } else {
            stats.unpaid_count += 1;
        }
    }

    if !bills.is_empty() {
        stats.average_bill_value = (grand_total / bills.len() as f64).round() as i64;
    }
    stats
}
