//! Record collections persisted in the local settings table.
//!
//! Each collection is a JSON array stored under category `local`. Reads are
//! forgiving: a missing or corrupt collection reads as empty and a record that
//! fails to deserialize is skipped, with a `warn` either way. Writes are a
//! read-modify-write of the whole collection inside one `BEGIN IMMEDIATE`
//! transaction.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::{self, DbState};
use crate::error::StoreError;
use crate::models::{PaymentRecord, ReadyOrder};

pub const READY_ORDERS_KEY: &str = "ready_orders";
pub const PAID_BILLS_KEY: &str = "paid_bills";

const COLLECTION_CATEGORY: &str = "local";

/// Access to the two record collections the billing desk reconciles.
pub trait BillStore: Send + Sync {
    /// Ready orders in stored order. Never fails; see module docs.
    fn load_ready_orders(&self) -> Vec<ReadyOrder>;

    /// Payment records in arrival order. Never fails; see module docs.
    fn load_payment_records(&self) -> Vec<PaymentRecord>;

    /// Append one record to `paid_bills`. Either the whole collection is
    /// rewritten with the record appended, or nothing changes.
    fn append_payment_record(&self, record: &PaymentRecord) -> Result<(), StoreError>;
}

impl BillStore for DbState {
    fn load_ready_orders(&self) -> Vec<ReadyOrder> {
        load_collection(self, READY_ORDERS_KEY)
    }

    fn load_payment_records(&self) -> Vec<PaymentRecord> {
        load_collection(self, PAID_BILLS_KEY)
    }

    fn append_payment_record(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;

        let result = (|| -> Result<usize, StoreError> {
            let mut records = match read_raw_collection(&conn, PAID_BILLS_KEY) {
                RawCollection::Missing => Vec::new(),
                RawCollection::Records(records) => records,
                RawCollection::Corrupt(_) => {
                    return Err(StoreError::Corrupt(PAID_BILLS_KEY.to_string()))
                }
            };
            records.push(serde_json::to_value(record)?);
            let len = records.len();
            db::set_setting(
                &conn,
                COLLECTION_CATEGORY,
                PAID_BILLS_KEY,
                &Value::Array(records).to_string(),
            )?;
            conn.execute_batch("COMMIT")?;
            Ok(len)
        })();

        match result {
            Ok(len) => {
                debug!(bill_id = %record.id, stored = len, "payment record appended");
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves the transaction open on the shared connection.
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                        warn!(error = %rollback_err, "rollback after failed append also failed");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Replace the `ready_orders` collection. Used by the upstream kitchen feed.
pub fn save_ready_orders(db: &DbState, orders: &[ReadyOrder]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(orders)?;
    let conn = db.lock()?;
    db::set_setting(&conn, COLLECTION_CATEGORY, READY_ORDERS_KEY, &raw)?;
    info!(count = orders.len(), "ready orders replaced");
    Ok(())
}

/// The stored collection as raw JSON, `null` when absent or unreadable.
pub fn read_collection_json(db: &DbState, key: &str) -> Value {
    let Ok(conn) = db.lock() else {
        return Value::Null;
    };
    match read_raw_collection(&conn, key) {
        RawCollection::Missing => Value::Null,
        RawCollection::Records(records) => Value::Array(records),
        RawCollection::Corrupt(raw) => Value::String(raw),
    }
}

enum RawCollection {
    Missing,
    Records(Vec<Value>),
    Corrupt(String),
}

fn read_raw_collection(conn: &Connection, key: &str) -> RawCollection {
    let Some(raw) = db::get_setting(conn, COLLECTION_CATEGORY, key) else {
        return RawCollection::Missing;
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(records)) => RawCollection::Records(records),
        Ok(Value::Null) => RawCollection::Missing,
        _ => RawCollection::Corrupt(raw),
    }
}

fn load_collection<T: DeserializeOwned>(db: &DbState, key: &str) -> Vec<T> {
    let conn = match db.lock() {
        Ok(conn) => conn,
        Err(e) => {
            warn!(collection = key, error = %e, "store unavailable, reading as empty");
            return Vec::new();
        }
    };

    let records = match read_raw_collection(&conn, key) {
        RawCollection::Missing => return Vec::new(),
        RawCollection::Corrupt(raw) => {
            warn!(
                collection = key,
                bytes = raw.len(),
                "stored collection is not a JSON array, reading as empty"
            );
            return Vec::new();
        }
        RawCollection::Records(records) => records,
    };
    drop(conn);

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = key, index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use serde_json::json;

    fn put_raw(db: &DbState, key: &str, raw: &str) {
        let conn = db.conn.lock().unwrap();
        db::set_setting(&conn, COLLECTION_CATEGORY, key, raw).unwrap();
    }

    fn order(id: &str, table: u32, total: f64) -> ReadyOrder {
        serde_json::from_value(json!({ "id": id, "table": table, "items": {}, "total": total }))
            .unwrap()
    }

    #[test]
    fn test_missing_collections_read_as_empty() {
        let db = open_in_memory().unwrap();
        assert!(db.load_ready_orders().is_empty());
        assert!(db.load_payment_records().is_empty());
    }

    #[test]
    fn test_corrupt_collections_read_as_empty() {
        let db = open_in_memory().unwrap();
        put_raw(&db, READY_ORDERS_KEY, "{not json");
        put_raw(&db, PAID_BILLS_KEY, r#"{"id":"A"}"#);
        assert!(db.load_ready_orders().is_empty());
        assert!(db.load_payment_records().is_empty());
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let db = open_in_memory().unwrap();
        put_raw(
            &db,
            READY_ORDERS_KEY,
            r#"[{"id":"A","table":1,"items":{},"total":40},
                {"id":"B","table":"two"},
                {"id":"C","table":3,"items":{},"total":15}]"#,
        );
        let ids: Vec<String> = db.load_ready_orders().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_order_with_unreadable_ready_time_still_loads() {
        let db = open_in_memory().unwrap();
        put_raw(
            &db,
            READY_ORDERS_KEY,
            r#"[{"id":"A","table":1,"items":{"Tea":{"qty":2,"price":20}},"total":40,"readyTime":"just now"},
                {"id":"B","table":2,"items":{},"total":15,"readyTime":"2026-10-17 12:30:00"}]"#,
        );
        let orders = db.load_ready_orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, "A");
        assert_eq!(orders[0].ready_time, None);
        assert!(orders[1].ready_time.is_some());
    }

    #[test]
    fn test_save_ready_orders_keeps_order() {
        let db = open_in_memory().unwrap();
        save_ready_orders(&db, &[order("Z", 9, 10.0), order("A", 1, 20.0)]).unwrap();
        let ids: Vec<String> = db.load_ready_orders().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["Z", "A"]);
    }

    #[test]
    fn test_append_payment_record() {
        let db = open_in_memory().unwrap();
        db.append_payment_record(&PaymentRecord::new("A", "cash"))
            .unwrap();
        db.append_payment_record(&PaymentRecord::new("B", "upi"))
            .unwrap();

        let records = db.load_payment_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "A");
        assert_eq!(records[0].payment_method, "cash");
        assert_eq!(records[1].id, "B");
    }

    #[test]
    fn test_append_preserves_unreadable_records() {
        let db = open_in_memory().unwrap();
        put_raw(&db, PAID_BILLS_KEY, r#"[{"id":"legacy","note":"hand-written"}]"#);

        db.append_payment_record(&PaymentRecord::new("A", "card"))
            .unwrap();

        let raw = read_collection_json(&db, PAID_BILLS_KEY);
        let arr = raw.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0], json!({"id":"legacy","note":"hand-written"}));
        assert_eq!(arr[1]["id"], "A");
        assert_eq!(db.load_payment_records().len(), 1);
    }

    #[test]
    fn test_append_refuses_to_overwrite_corrupt_collection() {
        let db = open_in_memory().unwrap();
        put_raw(&db, PAID_BILLS_KEY, "garbage");

        let err = db
            .append_payment_record(&PaymentRecord::new("A", "cash"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref key) if key == PAID_BILLS_KEY));
        assert_eq!(
            read_collection_json(&db, PAID_BILLS_KEY),
            Value::String("garbage".into())
        );

        // The failed write must not leave a transaction open.
        save_ready_orders(&db, &[order("A", 1, 1.0)]).unwrap();
        assert_eq!(db.load_ready_orders().len(), 1);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let db = open_in_memory().unwrap();
        // Every write to local_settings leaves a deferred foreign-key violation,
        // which SQLite only reports at COMMIT.
        db.conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TABLE bill_parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE bill_child (
                     parent_id INTEGER REFERENCES bill_parent(id) DEFERRABLE INITIALLY DEFERRED
                 );
                 CREATE TRIGGER orphan_on_insert AFTER INSERT ON local_settings
                 BEGIN INSERT INTO bill_child VALUES (42); END;
                 CREATE TRIGGER orphan_on_update AFTER UPDATE ON local_settings
                 BEGIN INSERT INTO bill_child VALUES (42); END;",
            )
            .unwrap();

        let err = db
            .append_payment_record(&PaymentRecord::new("A", "cash"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));

        {
            let conn = db.conn.lock().unwrap();
            assert!(conn.is_autocommit());
            conn.execute_batch("DROP TRIGGER orphan_on_insert; DROP TRIGGER orphan_on_update;")
                .unwrap();
        }
        assert!(db.load_payment_records().is_empty());

        db.append_payment_record(&PaymentRecord::new("A", "cash"))
            .unwrap();
        assert_eq!(db.load_payment_records().len(), 1);
    }
}
