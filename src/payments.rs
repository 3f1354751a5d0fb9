//! Payment capture: the `Unpaid → Paid` transition.
//!
//! A successful [`pay`] appends exactly one [`PaymentRecord`] and tells the
//! caller a refresh is due; it does not touch the in-memory bill list. There
//! is no reverse transition.

use tracing::{error, info, warn};

use crate::config::BillingConfig;
use crate::error::PaymentError;
use crate::models::{Bill, PaymentRecord};
use crate::store::BillStore;

/// Mark `bill_id` as paid with `payment_method`.
///
/// `bills` is the current reconciled view; only bills in it can be paid.
/// Checks run in order: method, bill existence, already-paid. A failed store
/// write is retried once before giving up.
pub fn pay<S: BillStore + ?Sized>(
    store: &S,
    config: &BillingConfig,
    bills: &[Bill],
    bill_id: &str,
    payment_method: &str,
) -> Result<PaymentRecord, PaymentError> {
    let method = config
        .resolve_payment_method(payment_method)
        .ok_or_else(|| PaymentError::InvalidPaymentMethod(payment_method.to_string()))?;

    let bill = bills
        .iter()
        .find(|b| b.id() == bill_id)
        .ok_or_else(|| PaymentError::UnknownBill(bill_id.to_string()))?;
    if bill.paid {
        return Err(PaymentError::AlreadyPaid(bill_id.to_string()));
    }

    let record = PaymentRecord::new(bill.id(), method);
    if let Err(first) = store.append_payment_record(&record) {
        warn!(bill_id = %bill_id, error = %first, "payment write failed, retrying once");
        store.append_payment_record(&record).map_err(|e| {
            error!(bill_id = %bill_id, error = %e, "payment write failed after retry");
            PaymentError::Store(e)
        })?;
    }

    info!(
        bill_id = %bill_id,
        table = bill.table(),
        method = %method,
        amount = %bill.total(),
        "Payment recorded"
    );
    Ok(record)
}
