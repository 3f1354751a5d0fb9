//! Diagnostics for the billing desk.
//!
//! Provides:
//! - **About info**: version, build time, git SHA, platform
//! - **Data/log locations**, overridable with `BILLING_DESK_DATA_DIR`
//! - **Log pruning** used by [`crate::init_logging`]
//! - **Diagnostics export**: a zip with about info, a billing summary, the
//!   raw record collections and the log files.

use std::fs;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::db::DbState;
use crate::desk::load_bills;
use crate::error::DiagnosticsError;
use crate::stats::compute_stats;
use crate::store::{read_collection_json, BillStore, PAID_BILLS_KEY, READY_ORDERS_KEY};

/// Environment variable that relocates the database and logs.
pub const DATA_DIR_ENV: &str = "BILLING_DESK_DATA_DIR";

/// File name prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "billing";

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

/// Maximum bytes copied from any one log file into an export (5 MB).
pub const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

const APP_DIR_NAME: &str = "com.thesmall.billing-desk";

pub fn get_about_info() -> Value {
    let build_time = env!("BUILD_EPOCH_SECS")
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".into());
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": build_time,
        "gitSha": env!("BUILD_GIT_SHA"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    })
}

/// Directory holding `billing.db` and `logs/`.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                .join(".local")
                .join("share")
        });
    base.join(APP_DIR_NAME)
}

pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(&format!("{LOG_FILE_PREFIX}.")))
}

/// Keep only the `MAX_LOG_FILES` most recently modified log files.
pub fn prune_old_logs(log_dir: &Path) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .flatten()
        .filter(|entry| entry.path().is_file() && is_log_file(&entry.path()))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::UNIX_EPOCH);
            (entry.path(), modified)
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

/// Stats plus raw record counts, as written to `billing_summary.json`.
pub fn billing_summary(db: &DbState) -> Value {
    let bills = load_bills(db);
    json!({
        "stats": compute_stats(&bills),
        "billCount": bills.len(),
        "readyOrderCount": db.load_ready_orders().len(),
        "paymentRecordCount": db.load_payment_records().len(),
    })
}

/// Write a diagnostics zip into `output_dir` and return its path. Log files
/// are included when `log_dir` is given.
pub fn export_diagnostics(
    db: &DbState,
    output_dir: &Path,
    log_dir: Option<&Path>,
) -> Result<PathBuf, DiagnosticsError> {
    fs::create_dir_all(output_dir)?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let zip_path = output_dir.join(format!("billing-desk-diagnostics-{timestamp}.zip"));

    let mut zip = zip::ZipWriter::new(fs::File::create(&zip_path)?);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let documents = [
        ("about.json", get_about_info()),
        ("billing_summary.json", billing_summary(db)),
        (
            "ready_orders.json",
            read_collection_json(db, READY_ORDERS_KEY),
        ),
        ("paid_bills.json", read_collection_json(db, PAID_BILLS_KEY)),
    ];
    for (name, value) in &documents {
        zip.start_file(*name, options)?;
        zip.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
    }

    let mut log_count = 0usize;
    if let Some(Ok(entries)) = log_dir.map(fs::read_dir) {
        for path in entries.flatten().map(|e| e.path()) {
            if !path.is_file() || !is_log_file(&path) {
                continue;
            }
            let Some(fname) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let mut buf = Vec::new();
            match fs::File::open(&path) {
                Ok(f) => {
                    f.take(MAX_LOG_SIZE).read_to_end(&mut buf)?;
                }
                Err(e) => {
                    warn!("Skipping unreadable log file {}: {e}", path.display());
                    continue;
                }
            }
            zip.start_file(format!("logs/{fname}"), options)?;
            zip.write_all(&buf)?;
            log_count += 1;
        }
    }

    zip.finish()?;
    info!(path = %zip_path.display(), log_files = log_count, "Diagnostics exported");
    Ok(zip_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::models::PaymentRecord;
    use serial_test::serial;
    use std::io::Read;

    fn temp_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_about_info_has_required_fields() {
        let info = get_about_info();
        for key in ["version", "buildTimestamp", "gitSha", "platform", "arch"] {
            assert!(info.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    #[serial]
    fn test_data_dir_env_override() {
        std::env::set_var(DATA_DIR_ENV, "/tmp/billing-desk-test");
        assert_eq!(get_data_dir(), PathBuf::from("/tmp/billing-desk-test"));
        assert_eq!(get_log_dir(), PathBuf::from("/tmp/billing-desk-test/logs"));
        std::env::remove_var(DATA_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_default_data_dir_is_stable() {
        std::env::remove_var(DATA_DIR_ENV);
        let d1 = get_data_dir();
        assert_eq!(d1, get_data_dir());
        assert!(d1.to_string_lossy().contains(APP_DIR_NAME));
    }

    #[test]
    fn test_prune_keeps_newest_logs() {
        let dir = temp_dir("billing_logs");
        for i in 0..(MAX_LOG_FILES + 3) {
            fs::write(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-{:02}", i + 1)), b"x").unwrap();
        }
        fs::write(dir.join("unrelated.txt"), b"keep").unwrap();

        prune_old_logs(&dir);

        let remaining: Vec<_> = fs::read_dir(&dir).unwrap().flatten().collect();
        let logs = remaining
            .iter()
            .filter(|e| is_log_file(&e.path()))
            .count();
        assert_eq!(logs, MAX_LOG_FILES);
        assert!(dir.join("unrelated.txt").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_diagnostics_creates_zip() {
        let db = crate::desk::tests::seeded_db();
        db.append_payment_record(&PaymentRecord::new("A", "cash"))
            .unwrap();
        let out = temp_dir("billing_diag");
        let logs = temp_dir("billing_diag_logs");
        fs::write(logs.join(format!("{LOG_FILE_PREFIX}.2026-10-17")), b"line\n").unwrap();

        let zip_path = export_diagnostics(&db, &out, Some(&logs)).expect("export");
        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 5);

        let mut summary = String::new();
        archive
            .by_name("billing_summary.json")
            .unwrap()
            .read_to_string(&mut summary)
            .unwrap();
        let summary: Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary["stats"]["paidCount"], 1);
        assert_eq!(summary["paymentRecordCount"], 1);
        assert!(archive.by_name("logs/billing.2026-10-17").is_ok());

        let _ = fs::remove_dir_all(&out);
        let _ = fs::remove_dir_all(&logs);
    }

    #[test]
    fn test_export_without_collections() {
        let db = open_in_memory().unwrap();
        let out = temp_dir("billing_diag_empty");
        let zip_path = export_diagnostics(&db, &out, None).unwrap();
        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 4);
        let mut raw = String::new();
        archive
            .by_name("paid_bills.json")
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        assert_eq!(raw.trim(), "null");
        let _ = fs::remove_dir_all(&out);
    }
}
