//! Periodic reload-reconcile-render loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::desk::{BillingDesk, BillingPresenter};
use crate::store::BillStore;

/// Shortest period the loop will tick at. `tokio::time::interval` panics on zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A running refresh loop. Dropping it leaves the loop running; call
/// [`RefreshLoop::shutdown`] on view teardown.
pub struct RefreshLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and wait for the in-flight tick, if any, to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Refresh loop ended abnormally");
        }
    }
}

/// Spawn a task that refreshes `desk` immediately and then every `interval`.
/// Intervals shorter than one millisecond are raised to it.
///
/// Must be called from inside a tokio runtime.
pub fn start_refresh_loop<S, P>(
    desk: Arc<BillingDesk<S, P>>,
    interval: Duration,
    cancel: CancellationToken,
) -> RefreshLoop
where
    S: BillStore + 'static,
    P: BillingPresenter + 'static,
{
    let interval = interval.max(MIN_INTERVAL);
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    debug!("refresh tick");
                    desk.refresh();
                }
            }
        }
        info!("Refresh loop stopped");
    });

    info!(interval_ms = interval.as_millis() as u64, "Refresh loop started");
    RefreshLoop { cancel, handle }
}
