//! Error taxonomy for the billing desk.
//!
//! Reads never surface [`StoreError`] to callers (they degrade to empty
//! collections); writes do. Everything a presenter may show to staff has a
//! short human-readable `Display`.

use thiserror::Error;

/// Failure while reading or writing a record collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database lock poisoned: {0}")]
    Lock(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The stored collection exists but is not a JSON array. Writing over it
    /// would discard whatever is there, so the write is refused.
    #[error("collection `{0}` is corrupt and was left untouched")]
    Corrupt(String),
}

/// Why a pay action was rejected. Persisted state is unchanged in every case.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("please select a valid payment method (got {0:?})")]
    InvalidPaymentMethod(String),
    #[error("bill not found: {0}")]
    UnknownBill(String),
    #[error("bill {0} is already paid")]
    AlreadyPaid(String),
    #[error("no bill selected")]
    NoBillSelected,
    #[error("could not record payment: {0}")]
    Store(#[from] StoreError),
}

/// A bill whose shape cannot be displayed.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("bill {bill_id}: invalid amount for {field}")]
    InvalidAmount { bill_id: String, field: String },
    #[error("bill {0} is marked paid but has no payment details")]
    MissingPaymentDetails(String),
}

/// Failure while writing a diagnostics bundle.
#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a receipt could not be produced.
#[derive(Debug, Error, PartialEq)]
pub enum ReceiptError {
    #[error("bill not found: {0}")]
    BillNotFound(String),
    #[error("bill {0} has not been paid yet")]
    NotPaid(String),
}
