//! Desk configuration, stored under the `billing` settings category.
//!
//! Loading never fails: each missing or unreadable key falls back to its
//! default and logs a warning.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::{self, DbState};
use crate::error::StoreError;

const CATEGORY: &str = "billing";
const KEY_PAYMENT_METHODS: &str = "payment_methods";
const KEY_CURRENCY_SYMBOL: &str = "currency_symbol";
const KEY_STORE_NAME: &str = "store_name";
const KEY_REFRESH_INTERVAL: &str = "refresh_interval_secs";

pub const DEFAULT_PAYMENT_METHODS: &[&str] = &["cash", "card", "upi"];
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
pub const DEFAULT_STORE_NAME: &str = "Bamboo Garden";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub payment_methods: Vec<String>,
    pub currency_symbol: String,
    pub store_name: String,
    pub refresh_interval_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            payment_methods: DEFAULT_PAYMENT_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl BillingConfig {
    pub fn load(db: &DbState) -> Self {
        let mut config = Self::default();
        let conn = match db.lock() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "config unavailable, using defaults");
                return config;
            }
        };

        if let Some(raw) = db::get_setting(&conn, CATEGORY, KEY_PAYMENT_METHODS) {
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(methods) => {
                    let methods = normalize_methods(methods);
                    if methods.is_empty() {
                        warn!("no usable payment methods configured, using defaults");
                    } else {
                        config.payment_methods = methods;
                    }
                }
                Err(e) => warn!(error = %e, "invalid payment_methods setting, using defaults"),
            }
        }

        if let Some(symbol) = db::get_setting(&conn, CATEGORY, KEY_CURRENCY_SYMBOL) {
            config.currency_symbol = symbol;
        }

        if let Some(name) = db::get_setting(&conn, CATEGORY, KEY_STORE_NAME)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            config.store_name = name;
        }

        if let Some(raw) = db::get_setting(&conn, CATEGORY, KEY_REFRESH_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs >= 1 => config.refresh_interval_secs = secs,
                _ => warn!(value = %raw, "invalid refresh_interval_secs, using default"),
            }
        }

        config
    }

    pub fn save(&self, db: &DbState) -> Result<(), StoreError> {
        let methods = serde_json::to_string(&normalize_methods(self.payment_methods.clone()))?;
        let conn = db.lock()?;
        db::set_setting(&conn, CATEGORY, KEY_PAYMENT_METHODS, &methods)?;
        db::set_setting(&conn, CATEGORY, KEY_CURRENCY_SYMBOL, &self.currency_symbol)?;
        db::set_setting(&conn, CATEGORY, KEY_STORE_NAME, &self.store_name)?;
        db::set_setting(
            &conn,
            CATEGORY,
            KEY_REFRESH_INTERVAL,
            &self.refresh_interval_secs.max(1).to_string(),
        )?;
        Ok(())
    }

    /// The canonical spelling of `method` if it is an allowed payment method.
    pub fn resolve_payment_method(&self, method: &str) -> Option<&str> {
        let wanted = method.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.payment_methods
            .iter()
            .find(|m| m.eq_ignore_ascii_case(&wanted))
            .map(String::as_str)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Currency symbol prefix; whole amounts print without decimals.
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{}{}", self.currency_symbol, format_number(amount))
    }
}

fn format_number(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        let fixed = format!("{amount:.2}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn normalize_methods(methods: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(methods.len());
    for method in methods {
        let method = method.trim().to_ascii_lowercase();
        if !method.is_empty() && !out.contains(&method) {
            out.push(method);
        }
    }
    out
}
