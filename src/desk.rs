//! The billing desk: one store, one config, one presenter and the current
//! [`BillingState`].
//!
//! Every public operation holds the state lock for its whole run, so a
//! periodic refresh and a staff action never observe each other half-done.

use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::error::{PaymentError, ReceiptError};
use crate::filter::BillFilter;
use crate::models::{Bill, PaymentRecord};
use crate::payments;
use crate::receipt::format_receipt;
use crate::reconcile::reconcile;
use crate::state::{BillingState, PaymentSelection};
use crate::store::BillStore;
use crate::view::{build_view, BillingView};

/// What the desk drives on the screen side.
pub trait BillingPresenter: Send + Sync {
    /// Show the current bill list and stats.
    fn render(&self, view: &BillingView);

    /// Feedback for a pay attempt.
    fn payment_result(&self, bill_id: &str, result: &Result<PaymentRecord, PaymentError>);
}

/// Reload both collections and reconcile them.
pub fn load_bills<S: BillStore + ?Sized>(store: &S) -> Vec<Bill> {
    let orders = store.load_ready_orders();
    let payments = store.load_payment_records();
    reconcile(&orders, &payments)
}

pub struct BillingDesk<S, P> {
    store: S,
    config: BillingConfig,
    presenter: P,
    state: Mutex<BillingState>,
}

impl<S: BillStore, P: BillingPresenter> BillingDesk<S, P> {
    pub fn new(store: S, config: BillingConfig, presenter: P) -> Self {
        Self {
            store,
            config,
            presenter,
            state: Mutex::new(BillingState::default()),
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> BillingState {
        self.lock_state().clone()
    }

    /// The view for the current state, without reloading.
    pub fn view(&self) -> BillingView {
        let state = self.lock_state();
        build_view(state.bills(), state.filter(), &self.config)
    }

    /// Reload, reconcile and render.
    pub fn refresh(&self) {
        let mut state = self.lock_state();
        self.reload_and_render(&mut state);
    }

    /// Change the list filter and re-render from the bills already loaded.
    pub fn set_filter(&self, filter: BillFilter) {
        let mut state = self.lock_state();
        *state = std::mem::take(&mut *state).with_filter(filter);
        debug!(filter = filter.label(), "bill filter changed");
        self.render(&state);
    }

    /// Open the payment prompt for `bill_id`.
    pub fn open_payment(&self, bill_id: &str) -> Result<PaymentSelection, PaymentError> {
        let mut state = self.lock_state();
        let next = state.clone().select_bill(bill_id)?;
        let selection = next.selection().cloned().ok_or(PaymentError::NoBillSelected)?;
        *state = next;
        Ok(selection)
    }

    pub fn choose_payment_method(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.lock_state();
        *state = state.clone().choose_method(method)?;
        Ok(())
    }

    /// Pay the bill in the open prompt with the chosen method.
    ///
    /// On success the prompt closes and the list is reloaded. On failure the
    /// prompt stays open so staff can correct the method and retry.
    pub fn confirm_payment(&self) -> Result<PaymentRecord, PaymentError> {
        let mut state = self.lock_state();
        let Some(selection) = state.selection().cloned() else {
            let result = Err(PaymentError::NoBillSelected);
            self.presenter.payment_result("", &result);
            return result;
        };
        let method = selection.method.as_deref().unwrap_or("");

        let result = self.pay_locked(&mut state, &selection.bill_id, method);
        if result.is_ok() {
            *state = std::mem::take(&mut *state).clear_selection();
        }
        result
    }

    /// Pay `bill_id` directly, bypassing the prompt.
    pub fn pay(&self, bill_id: &str, payment_method: &str) -> Result<PaymentRecord, PaymentError> {
        let mut state = self.lock_state();
        self.pay_locked(&mut state, bill_id, payment_method)
    }

    /// Text receipt for a paid bill in the current list.
    pub fn receipt_for(&self, bill_id: &str) -> Result<String, ReceiptError> {
        let state = self.lock_state();
        let bill = state
            .find_bill(bill_id)
            .ok_or_else(|| ReceiptError::BillNotFound(bill_id.to_string()))?;
        if !bill.paid {
            return Err(ReceiptError::NotPaid(bill_id.to_string()));
        }
        info!(bill_id = %bill_id, "receipt requested");
        Ok(format_receipt(bill, &self.config, Local::now()))
    }

    fn pay_locked(
        &self,
        state: &mut BillingState,
        bill_id: &str,
        payment_method: &str,
    ) -> Result<PaymentRecord, PaymentError> {
        let result = payments::pay(
            &self.store,
            &self.config,
            state.bills(),
            bill_id,
            payment_method,
        );
        if let Err(e) = &result {
            warn!(bill_id = %bill_id, error = %e, "payment rejected");
        }
        self.presenter.payment_result(bill_id, &result);
        if result.is_ok() {
            self.reload_and_render(state);
        }
        result
    }

    fn reload_and_render(&self, state: &mut BillingState) {
        let bills = load_bills(&self.store);
        debug!(count = bills.len(), "bills reconciled");
        *state = std::mem::take(state).with_bills(bills);
        self.render(state);
    }

    fn render(&self, state: &BillingState) {
        let view = build_view(state.bills(), state.filter(), &self.config);
        self.presenter.render(&view);
    }

    fn lock_state(&self) -> MutexGuard<'_, BillingState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("billing state lock poisoned, continuing with last state");
            poisoned.into_inner()
        })
    }
}
