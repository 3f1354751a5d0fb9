//! Merge ready orders with recorded payments into bills.

use std::collections::HashMap;

use crate::models::{Bill, PaymentRecord, ReadyOrder};

/// Build one [`Bill`] per order, in the orders' sequence.
///
/// An order is paid iff some payment record carries its id. When the store
/// holds several records for the same id, the earliest one wins.
pub fn reconcile(orders: &[ReadyOrder], payments: &[PaymentRecord]) -> Vec<Bill> {
    let mut by_id: HashMap<&str, &PaymentRecord> = HashMap::with_capacity(payments.len());
    for payment in payments {
        by_id.entry(payment.id.as_str()).or_insert(payment);
    }

    orders
        .iter()
        .map(|order| {
            let payment = by_id.get(order.id.as_str());
            Bill {
                order: order.clone(),
                paid: payment.is_some(),
                paid_time: payment.map(|p| p.paid_time),
                payment_method: payment.map(|p| p.payment_method.clone()),
            }
        })
        .collect()
}
