//! Plain-text rendering of a notification payload.
//!
//! Monospace-friendly layout:
//!
//! ```text
//! ----------------------------------
//! Wallet:       Coldcard (NOX)
//! Direction:    Inbound
//! Date (UTC):   22/Nov/25 23:45:15
//! Date (GMT-3): 22/Nov/25 20:45:15
//! ----------------------------------
//! Original:     0.00100000 BTC
//! Transaction: +0.00050000 BTC
//! Balance:      0.00150000 BTC
//! ----------------------------------
//! https://mempool.space/tx/<txid>
//! ```

use crate::money::{format_btc, format_btc_signed};
use crate::watcher::composer::NotificationPayload;

use super::Message;

const SEPARATOR: &str = "----------------------------------";

const FIRST_TX_NOTE: &str = "Note: This is the first transaction observed for this wallet \
by txwatcher; earlier history may not be fully reflected in the Original/Balance values.";

pub fn render(payload: &NotificationPayload) -> Message {
    let subject = format!("[{}] Transaction in Monitored Wallet", payload.wallet_name);

    let mut lines = Vec::new();
    lines.push(SEPARATOR.to_string());
    lines.push(format!("Wallet:       {}", payload.wallet_name));
    lines.push(format!("Direction:    {}", payload.direction));
    lines.push(format!("Date (UTC):   {}", payload.utc_time));
    if let Some(local) = &payload.local_time {
        lines.push(format!("Date ({}): {}", local.label, local.rendered));
    }
    lines.push(SEPARATOR.to_string());
    lines.push(format!("Original:     {} BTC", format_btc(payload.original_sats)));
    lines.push(format!(
        "Transaction: {} BTC",
        format_btc_signed(payload.amount_sats)
    ));
    lines.push(format!("Balance:      {} BTC", format_btc(payload.ending_sats)));
    lines.push(SEPARATOR.to_string());

    for link in &payload.explorer_links {
        lines.push(link.clone());
    }

    if payload.first_transaction {
        lines.push(String::new());
        lines.push(FIRST_TX_NOTE.to_string());
    }

    Message {
        subject,
        body: lines.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::composer::LocalTime;
    use crate::watcher::processor::Direction;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            wallet_name: "Coldcard (NOX)".to_string(),
            direction: Direction::Inbound,
            txid: "deadbeef".to_string(),
            utc_time: "22/Nov/25 23:45:15".to_string(),
            local_time: Some(LocalTime {
                label: "GMT-3".to_string(),
                rendered: "22/Nov/25 20:45:15".to_string(),
            }),
            original_sats: 100_000,
            amount_sats: 50_000,
            ending_sats: 150_000,
            explorer_links: vec!["https://mempool.space/tx/deadbeef".to_string()],
            first_transaction: true,
        }
    }

    #[test]
    fn test_subject() {
        let message = render(&payload());
        assert_eq!(message.subject, "[Coldcard (NOX)] Transaction in Monitored Wallet");
    }

    #[test]
    fn test_body_layout() {
        let message = render(&payload());
        let lines: Vec<&str> = message.body.lines().collect();

        assert_eq!(lines[0], SEPARATOR);
        assert_eq!(lines[1], "Wallet:       Coldcard (NOX)");
        assert_eq!(lines[2], "Direction:    Inbound");
        assert_eq!(lines[3], "Date (UTC):   22/Nov/25 23:45:15");
        assert_eq!(lines[4], "Date (GMT-3): 22/Nov/25 20:45:15");
        assert_eq!(lines[5], SEPARATOR);
        assert_eq!(lines[6], "Original:     0.00100000 BTC");
        assert_eq!(lines[7], "Transaction: +0.00050000 BTC");
        assert_eq!(lines[8], "Balance:      0.00150000 BTC");
        assert_eq!(lines[9], SEPARATOR);
        assert_eq!(lines[10], "https://mempool.space/tx/deadbeef");
        assert!(message.body.contains("first transaction observed"));
    }

    #[test]
    fn test_outbound_amount_keeps_its_sign() {
        let mut p = payload();
        p.direction = Direction::Outbound;
        p.amount_sats = -20_000;
        p.first_transaction = false;

        let message = render(&p);
        assert!(message.body.contains("Transaction: -0.00020000 BTC"));
        assert!(!message.body.contains("Note:"));
    }

    #[test]
    fn test_no_local_time_no_links() {
        let mut p = payload();
        p.local_time = None;
        p.explorer_links.clear();
        p.first_transaction = false;

        let message = render(&p);
        assert!(!message.body.contains("Date (GMT-3)"));
        assert!(!message.body.contains("https://"));
    }
}
