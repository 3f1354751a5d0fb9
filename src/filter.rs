//! Tab filter over the reconciled bill list.

use serde::{Deserialize, Serialize};

use crate::models::Bill;

/// Which bills the list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillFilter {
    #[default]
    All,
    Paid,
    Unpaid,
}

impl BillFilter {
    /// Parse the tab name sent by the presentation layer. Unknown names show
    /// everything.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("paid") => Self::Paid,
            Some("unpaid") => Self::Unpaid,
            _ => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Paid => "Paid",
            Self::Unpaid => "Unpaid",
        }
    }

    pub fn matches(self, bill: &Bill) -> bool {
        match self {
            Self::All => true,
            Self::Paid => bill.paid,
            Self::Unpaid => !bill.paid,
        }
    }
}

/// The stable subsequence of `bills` selected by `filter`.
pub fn filter_bills(bills: &[Bill], filter: BillFilter) -> Vec<&Bill> {
    bills.iter().filter(|bill| filter.matches(bill)).collect()
}
