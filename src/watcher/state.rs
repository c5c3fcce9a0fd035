//! Per-wallet notification bookkeeping.
//!
//! Idempotency lives here rather than in the stream client precisely
//! because reconnects can redeliver events. State is in-process only; a
//! restart starts fresh. Growth is unbounded for the process lifetime,
//! acceptable at typical per-wallet volumes.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct NotificationState {
    /// (wallet identifier, txid) pairs that already produced a notification.
    seen: HashSet<(String, String)>,
    /// Wallets that have had at least one notification sent.
    notified_wallets: HashSet<String>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no notification has been produced for this (wallet, txid).
    pub fn should_notify(&self, wallet_id: &str, txid: &str) -> bool {
        !self
            .seen
            .contains(&(wallet_id.to_string(), txid.to_string()))
    }

    pub fn record(&mut self, wallet_id: &str, txid: &str) {
        self.seen.insert((wallet_id.to_string(), txid.to_string()));
    }

    /// True when this wallet has never produced a notification; drives the
    /// first-transaction disclaimer.
    pub fn is_first_for_wallet(&self, wallet_id: &str) -> bool {
        !self.notified_wallets.contains(wallet_id)
    }

    pub fn mark_wallet_notified(&mut self, wallet_id: &str) {
        self.notified_wallets.insert(wallet_id.to_string());
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_per_wallet_and_txid() {
        let mut state = NotificationState::new();

        assert!(state.should_notify("xpubA", "tx1"));
        state.record("xpubA", "tx1");
        assert!(!state.should_notify("xpubA", "tx1"));

        // Same txid on a different wallet is a distinct key.
        assert!(state.should_notify("xpubB", "tx1"));
        // Different txid on the same wallet is a distinct key.
        assert!(state.should_notify("xpubA", "tx2"));
    }

    #[test]
    fn test_first_seen_tracking() {
        let mut state = NotificationState::new();

        assert!(state.is_first_for_wallet("xpubA"));
        state.mark_wallet_notified("xpubA");
        assert!(!state.is_first_for_wallet("xpubA"));
        assert!(state.is_first_for_wallet("xpubB"));
    }

    #[test]
    fn test_seen_count() {
        let mut state = NotificationState::new();
        state.record("xpubA", "tx1");
        state.record("xpubA", "tx1");
        state.record("xpubA", "tx2");
        assert_eq!(state.seen_count(), 2);
    }
}
