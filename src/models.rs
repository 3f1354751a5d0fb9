//! Record shapes shared by the store, reconciler and presentation layer.
//!
//! Field names follow the persisted JSON layout (camelCase), so the same
//! structs read the kitchen's `ready_orders` collection and write the
//! `paid_bills` collection.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

/// One line on an order: how many were served and the unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub qty: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn line_amount(&self) -> f64 {
        f64::from(self.qty) * self.price
    }
}

/// Order lines keyed by item name, in the order the kitchen listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderItems(Vec<(String, OrderItem)>);

impl OrderItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line. A repeated name replaces the earlier line in place.
    pub fn insert(&mut self, name: impl Into<String>, item: OrderItem) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = item,
            None => self.0.push((name, item)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OrderItem> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, OrderItem)> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a OrderItems {
    type Item = &'a (String, OrderItem);
    type IntoIter = std::slice::Iter<'a, (String, OrderItem)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for OrderItems {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, item) in &self.0 {
            map.serialize_entry(name, item)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderItems {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ItemsVisitor;

        impl<'de> Visitor<'de> for ItemsVisitor {
            type Value = OrderItems;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of item name to {qty, price}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OrderItems, A::Error> {
                let mut items = OrderItems(Vec::with_capacity(access.size_hint().unwrap_or(0)));
                while let Some((name, item)) = access.next_entry::<String, OrderItem>()? {
                    items.insert(name, item);
                }
                Ok(items)
            }
        }

        deserializer.deserialize_map(ItemsVisitor)
    }
}

/// An order the kitchen has completed. Produced upstream; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyOrder {
    pub id: String,
    pub table: u32,
    #[serde(default)]
    pub items: OrderItems,
    /// Trusted as produced upstream; never recomputed from `items`.
    pub total: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_ready_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_time: Option<DateTime<Utc>>,
}

/// Proof that an order was paid. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub paid_time: DateTime<Utc>,
    pub payment_method: String,
}

impl PaymentRecord {
    pub fn new(id: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            paid_time: Utc::now(),
            payment_method: payment_method.into(),
        }
    }
}

/// A ready order merged with its payment state.
///
/// Only built by [`crate::reconcile::reconcile`]; `paid_time` and
/// `payment_method` are set iff `paid`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(flatten)]
    pub order: ReadyOrder,
    pub paid: bool,
    pub paid_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
}

impl Bill {
    pub fn id(&self) -> &str {
        &self.order.id
    }

    pub fn table(&self) -> u32 {
        self.order.table
    }

    pub fn total(&self) -> f64 {
        self.order.total
    }
}

/// Upstream producers write `readyTime` as an ISO-8601 string or as epoch
/// milliseconds. The field is display-only: anything unreadable becomes
/// `None` and the order itself still loads.
fn deserialize_ready_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let parsed = match &raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => parse_time_text(text.trim()),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|ms| ms.is_finite()).map(|ms| ms as i64))
            .and_then(DateTime::from_timestamp_millis),
        Some(_) => None,
    };
    if parsed.is_none() {
        warn!(ready_time = ?raw, "unreadable readyTime, showing order without it");
    }
    Ok(parsed)
}

fn parse_time_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive "YYYY-MM-DD HH:MM:SS" as written by some kitchen screens, read as UTC.
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
