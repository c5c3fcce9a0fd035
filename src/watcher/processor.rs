//! Transaction processing: delta, direction and balance derivation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::backend::{TransactionEvent, WalletBackend};
use crate::error::BackendError;
use crate::watcher::registry::MonitoredWallet;

/// Net direction of a transaction from the wallet's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inbound => write!(f, "Inbound"),
            Direction::Outbound => write!(f, "Outbound"),
        }
    }
}

/// Deterministic digest of one transaction event. Direction and amount are
/// derived once from the event's value movements and never mutated.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub txid: String,
    pub direction: Direction,
    /// Unsigned magnitude in satoshis.
    pub amount_sats: i64,
    pub wallet_identifier: String,
}

/// Before/after balance figures in satoshis. `original` is derived from
/// `ending`, exact once every prior transaction has been observed and an
/// estimate for the first one.
#[derive(Debug, Clone, Copy)]
pub struct BalanceFigures {
    pub original: i64,
    pub ending: i64,
}

pub struct TransactionProcessor {
    backend: Arc<dyn WalletBackend>,
    balance_attempts: u32,
    balance_retry_delay: Duration,
}

impl TransactionProcessor {
    pub fn new(backend: Arc<dyn WalletBackend>) -> Self {
        Self {
            backend,
            balance_attempts: 3,
            balance_retry_delay: Duration::from_secs(2),
        }
    }

    /// Override the balance retry budget (shorter in tests).
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.balance_attempts = attempts;
        self.balance_retry_delay = delay;
        self
    }

    /// Process one transaction event for its owning wallet.
    ///
    /// Returns `Ok(None)` when the event is skipped (confirmation count is
    /// not zero: this watcher reports broadcasts, not confirmations), and an
    /// error when the balance cannot be determined after retries, in which
    /// case the event is dropped without a notification.
    pub async fn process(
        &self,
        wallet: &MonitoredWallet,
        event: &TransactionEvent,
    ) -> Result<Option<(TransactionRecord, BalanceFigures)>, BackendError> {
        let confirmations = event.confirmations();
        if confirmations != 0 {
            debug!(
                wallet = %wallet.name,
                txid = %event.transaction_data.transaction_hash,
                confirmations,
                "ignoring confirmation update"
            );
            return Ok(None);
        }

        // Net movement at the wallet's own addresses; fees are implicitly
        // included because inputs are measured there too.
        let gained: i64 = event.outputs.iter().map(|o| o.value).sum();
        let spent: i64 = event.inputs.iter().map(|i| i.value).sum();
        let delta = gained - spent;

        // Zero net effect (self-transfer) is still new activity; reported
        // as Outbound with amount 0 by convention.
        let (direction, amount_sats) = if delta > 0 {
            (Direction::Inbound, delta)
        } else {
            (Direction::Outbound, -delta)
        };

        let identifier = wallet.identity.as_str();
        let ending = self.balance_with_retry(identifier).await?;
        let original = match direction {
            Direction::Inbound => ending - amount_sats,
            Direction::Outbound => ending + amount_sats,
        };

        let record = TransactionRecord {
            txid: event.transaction_data.transaction_hash.clone(),
            direction,
            amount_sats,
            wallet_identifier: identifier.to_string(),
        };
        Ok(Some((record, BalanceFigures { original, ending })))
    }

    /// Bounded retries with a short delay; correctness over completeness.
    async fn balance_with_retry(&self, identifier: &str) -> Result<i64, BackendError> {
        let mut attempt = 1;
        loop {
            match self.backend.balance_sats(identifier).await {
                Ok(balance) => return Ok(balance),
                Err(e) if attempt < self.balance_attempts => {
                    warn!(
                        "balance query attempt {attempt} failed: {e}; retrying in {:?}",
                        self.balance_retry_delay
                    );
                    sleep(self.balance_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::registry::{RegistrationStatus, WalletIdentity};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeBackend {
        balances: Mutex<Vec<Result<i64, ()>>>,
        calls: Mutex<u32>,
    }

    impl FakeBackend {
        fn new(balances: Vec<Result<i64, ()>>) -> Arc<Self> {
            Arc::new(Self {
                balances: Mutex::new(balances),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl WalletBackend for FakeBackend {
        async fn register_derivation(&self, _identifier: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn balance_sats(&self, _identifier: &str) -> Result<i64, BackendError> {
            *self.calls.lock().unwrap() += 1;
            match self.balances.lock().unwrap().pop() {
                Some(Ok(balance)) => Ok(balance),
                _ => Err(BackendError::Status {
                    endpoint: "balance".to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn wallet() -> MonitoredWallet {
        MonitoredWallet {
            name: "Coldcard (NOX)".to_string(),
            identity: WalletIdentity::Xpub("xpubCOLD".to_string()),
            status: RegistrationStatus::Registered,
            balance_sats: 0,
        }
    }

    fn tx_event(confirmations: i64, inputs: &[i64], outputs: &[i64]) -> TransactionEvent {
        serde_json::from_value(json!({
            "derivationStrategy": "xpubCOLD",
            "transactionData": {
                "transactionHash": "txid-1",
                "confirmations": confirmations,
            },
            "inputs": inputs.iter().map(|v| json!({"value": v})).collect::<Vec<_>>(),
            "outputs": outputs.iter().map(|v| json!({"value": v})).collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    fn fast(processor: TransactionProcessor) -> TransactionProcessor {
        processor.with_retry(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_inbound_delta_and_balances() {
        let backend = FakeBackend::new(vec![Ok(150_000)]);
        let processor = fast(TransactionProcessor::new(backend));

        let (record, figures) = processor
            .process(&wallet(), &tx_event(0, &[], &[50_000]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.amount_sats, 50_000);
        assert_eq!(figures.ending, 150_000);
        assert_eq!(figures.original, 100_000);
        assert_eq!(figures.original + record.amount_sats, figures.ending);
    }

    #[tokio::test]
    async fn test_outbound_delta_and_balances() {
        let backend = FakeBackend::new(vec![Ok(130_000)]);
        let processor = fast(TransactionProcessor::new(backend));

        // 50k in, 70k out at the wallet's addresses: net -20k.
        let (record, figures) = processor
            .process(&wallet(), &tx_event(0, &[70_000], &[50_000]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.direction, Direction::Outbound);
        assert_eq!(record.amount_sats, 20_000);
        assert_eq!(figures.ending, 130_000);
        assert_eq!(figures.original, 150_000);
        assert_eq!(figures.original - record.amount_sats, figures.ending);
    }

    #[tokio::test]
    async fn test_zero_delta_is_outbound_zero() {
        let backend = FakeBackend::new(vec![Ok(99_000)]);
        let processor = fast(TransactionProcessor::new(backend));

        let (record, figures) = processor
            .process(&wallet(), &tx_event(0, &[40_000], &[40_000]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.direction, Direction::Outbound);
        assert_eq!(record.amount_sats, 0);
        assert_eq!(figures.original, figures.ending);
    }

    #[tokio::test]
    async fn test_confirmed_event_is_skipped_without_balance_query() {
        let backend = FakeBackend::new(vec![Ok(1)]);
        let processor = fast(TransactionProcessor::new(backend.clone()));

        let outcome = processor
            .process(&wallet(), &tx_event(1, &[], &[50_000]))
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(*backend.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_balance_retry_then_success() {
        // Popped from the back: one failure, then a balance.
        let backend = FakeBackend::new(vec![Ok(42_000), Err(())]);
        let processor = fast(TransactionProcessor::new(backend.clone()));

        let (_, figures) = processor
            .process(&wallet(), &tx_event(0, &[], &[1_000]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(figures.ending, 42_000);
        assert_eq!(*backend.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_balance_failure_exhausts_retries() {
        let backend = FakeBackend::new(vec![Err(()), Err(()), Err(())]);
        let processor = fast(TransactionProcessor::new(backend.clone()));

        let outcome = processor.process(&wallet(), &tx_event(0, &[], &[1_000])).await;

        assert!(outcome.is_err());
        assert_eq!(*backend.calls.lock().unwrap(), 3);
    }
}
