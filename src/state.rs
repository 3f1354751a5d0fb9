//! Desk state: the current bills, the active filter and the bill being paid.
//!
//! Every transition consumes the state and returns the next one, so a failed
//! transition leaves the caller's copy untouched.

use serde::Serialize;

use crate::error::PaymentError;
use crate::filter::{filter_bills, BillFilter};
use crate::models::Bill;

/// The bill a payment prompt is open for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    pub bill_id: String,
    pub table: u32,
    pub total: f64,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingState {
    bills: Vec<Bill>,
    filter: BillFilter,
    selection: Option<PaymentSelection>,
}

impl BillingState {
    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn filter(&self) -> BillFilter {
        self.filter
    }

    pub fn selection(&self) -> Option<&PaymentSelection> {
        self.selection.as_ref()
    }

    pub fn find_bill(&self, bill_id: &str) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id() == bill_id)
    }

    pub fn visible_bills(&self) -> Vec<&Bill> {
        filter_bills(&self.bills, self.filter)
    }

    /// Swap in a freshly reconciled bill list. An open payment prompt stays
    /// open; confirming it re-checks the bill against the new list.
    pub fn with_bills(self, bills: Vec<Bill>) -> Self {
        Self { bills, ..self }
    }

    pub fn with_filter(self, filter: BillFilter) -> Self {
        Self { filter, ..self }
    }

    /// Open the payment prompt for an unpaid bill, clearing any earlier choice.
    pub fn select_bill(self, bill_id: &str) -> Result<Self, PaymentError> {
        let bill = self
            .find_bill(bill_id)
            .ok_or_else(|| PaymentError::UnknownBill(bill_id.to_string()))?;
        if bill.paid {
            return Err(PaymentError::AlreadyPaid(bill_id.to_string()));
        }
        let selection = PaymentSelection {
            bill_id: bill.id().to_string(),
            table: bill.table(),
            total: bill.total(),
            method: None,
        };
        Ok(Self {
            selection: Some(selection),
            ..self
        })
    }

    pub fn choose_method(self, method: &str) -> Result<Self, PaymentError> {
        let Some(selection) = self.selection.clone() else {
            return Err(PaymentError::NoBillSelected);
        };
        let method = method.trim();
        Ok(Self {
            selection: Some(PaymentSelection {
                method: (!method.is_empty()).then(|| method.to_string()),
                ..selection
            }),
            ..self
        })
    }

    pub fn clear_selection(self) -> Self {
        Self {
            selection: None,
            ..self
        }
    }
}
