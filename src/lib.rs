//! Billing desk for a restaurant POS.
//!
//! Reads the kitchen's ready orders and the recorded payments from the local
//! store, reconciles them into bills, and lets staff filter the list, take a
//! payment and print a receipt. Presentation is pluggable through
//! [`BillingPresenter`]; the periodic refresh runs on tokio via
//! [`start_refresh_loop`].

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod db;
pub mod desk;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod models;
pub mod payments;
pub mod receipt;
pub mod reconcile;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod store;
pub mod view;

pub use config::BillingConfig;
pub use db::DbState;
pub use desk::{load_bills, BillingDesk, BillingPresenter};
pub use error::{DiagnosticsError, PaymentError, ReceiptError, RenderError, StoreError};
pub use filter::{filter_bills, BillFilter};
pub use models::{Bill, OrderItem, OrderItems, PaymentRecord, ReadyOrder};
pub use payments::pay;
pub use receipt::format_receipt;
pub use reconcile::reconcile;
pub use scheduler::{start_refresh_loop, RefreshLoop};
pub use state::{BillingState, PaymentSelection};
pub use stats::{compute_stats, BillStats};
pub use store::BillStore;
pub use view::{build_view, BillingView, ViewBody};

/// Install console + daily rolling file logging.
///
/// `RUST_LOG` overrides the default filter. Keep the returned guard alive for
/// as long as the process runs; dropping it flushes and stops the file writer.
/// A second call leaves the first subscriber in place.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,billing_desk=debug"));

    diagnostics::prune_old_logs(log_dir);
    std::fs::create_dir_all(log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!("Starting billing desk v{}", env!("CARGO_PKG_VERSION"));
    guard
}

/// Open (or create) the desk database under `data_dir` and build a desk
/// around it with the stored configuration.
pub fn open_desk<P: BillingPresenter>(
    data_dir: &Path,
    presenter: P,
) -> Result<BillingDesk<DbState, P>, StoreError> {
    let db = db::init(data_dir)?;
    let config = BillingConfig::load(&db);
    info!(
        store = %config.store_name,
        methods = ?config.payment_methods,
        refresh_secs = config.refresh_interval_secs,
        "Billing desk configured"
    );
    Ok(BillingDesk::new(db, config, presenter))
}
