//! Plain-text receipt for a paid bill.
//!
//! The layout is a fixed-width slip; presenters that print HTML or ESC/POS
//! are free to ignore it and lay out the bill themselves.

use chrono::{DateTime, Local};

use crate::config::BillingConfig;
use crate::models::Bill;

const WIDTH: usize = 40;
const NAME_WIDTH: usize = 24;

pub fn format_receipt(bill: &Bill, config: &BillingConfig, printed_at: DateTime<Local>) -> String {
    let rule = "-".repeat(WIDTH);
    let mut out = String::new();

    push_centered(&mut out, &config.store_name);
    push_centered(&mut out, "Billing Statement");
    push_centered(&mut out, &printed_at.format("%Y-%m-%d %H:%M:%S").to_string());
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!("Table: {}\n", bill.table()));
    out.push_str(&format!("Bill No: {}\n", bill.id()));
    if bill.paid {
        let method = bill.payment_method.as_deref().unwrap_or("Unknown");
        out.push_str(&format!("Status: Paid ({method})\n"));
    } else {
        out.push_str("Status: Unpaid\n");
    }
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!(
        "{:<name$}{:>5}{:>11}\n",
        "Item",
        "Qty",
        "Amount",
        name = NAME_WIDTH
    ));
    for (name, item) in &bill.order.items {
        out.push_str(&format!(
            "{:<name$}{:>5}{:>11}\n",
            truncate(name, NAME_WIDTH - 1),
            item.qty,
            config.format_amount(item.line_amount()),
            name = NAME_WIDTH
        ));
    }
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!(
        "{:>width$}\n",
        format!("Total: {}", config.format_amount(bill.total())),
        width = WIDTH
    ));
    out.push_str(&rule);
    out.push('\n');
    push_centered(&mut out, "Thank you for dining with us!");
    out
}

fn push_centered(out: &mut String, text: &str) {
    out.push_str(format!("{text:^width$}", width = WIDTH).trim_end());
    out.push('\n');
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderItem, OrderItems, PaymentRecord, ReadyOrder};
    use crate::reconcile::reconcile;
    use chrono::TimeZone;

    fn paid_bill() -> Bill {
        let mut items = OrderItems::new();
        items.insert("Tea".to_string(), OrderItem { qty: 2, price: 20.0 });
        items.insert(
            "A remarkably long dumpling platter name".to_string(),
            OrderItem {
                qty: 1,
                price: 200.0,
            },
        );
        let order = ReadyOrder {
            id: "ord-17".into(),
            table: 5,
            items,
            total: 240.0,
            ready_time: None,
        };
        reconcile(&[order], &[PaymentRecord::new("ord-17", "card")]).remove(0)
    }

    #[test]
    fn test_receipt_contents() {
        let printed_at = Local.with_ymd_and_hms(2026, 10, 17, 20, 15, 0).unwrap();
        let text = format_receipt(&paid_bill(), &BillingConfig::default(), printed_at);

        assert!(text.contains("Bamboo Garden"));
        assert!(text.contains("Billing Statement"));
        assert!(text.contains("2026-10-17 20:15:00"));
        assert!(text.contains("Table: 5"));
        assert!(text.contains("Bill No: ord-17"));
        assert!(text.contains("Status: Paid (card)"));
        assert!(text.contains("₹40"));
        assert!(text.contains("Total: ₹240"));
        assert!(text.contains("Thank you for dining with us!"));
        assert!(text.contains("A remarkably long dumpl"));
        assert!(!text.contains("platter name"));
        // Lines follow the order the kitchen listed them.
        assert!(text.find("Tea").unwrap() < text.find("A remarkably").unwrap());
    }

    #[test]
    fn test_receipt_uses_configured_store_and_currency() {
        let config = BillingConfig {
            store_name: "Dockside Diner".into(),
            currency_symbol: "$".into(),
            ..BillingConfig::default()
        };
        let text = format_receipt(&paid_bill(), &config, Local::now());
        assert!(text.contains("Dockside Diner"));
        assert!(text.contains("Total: $240"));
        assert!(!text.contains('₹'));
    }
}
