//! The watcher pipeline.
//!
//! One event stream, processed strictly sequentially: event N's notification
//! is fully resolved before event N+1 is read, because balance derivation
//! assumes the backend's reported balance reflects the event being processed
//! and no later one. All mutable state is single-owner inside `Watcher`, so
//! no locking is needed.

use tracing::{debug, error, info, warn};

use crate::backend::{EventSource, StreamEvent, TransactionEvent};
use crate::notify::{Encryptor, Message, Sender, message};
use crate::watcher::composer::NotificationComposer;
use crate::watcher::processor::TransactionProcessor;
use crate::watcher::registry::WalletRegistry;
use crate::watcher::state::NotificationState;

/// The context object built at startup and driving the whole pipeline.
pub struct Watcher<S: EventSource> {
    source: S,
    registry: WalletRegistry,
    processor: TransactionProcessor,
    state: NotificationState,
    composer: NotificationComposer,
    sender: Box<dyn Sender>,
    encryption: Option<(Box<dyn Encryptor>, String)>,
}

impl<S: EventSource> Watcher<S> {
    pub fn new(
        source: S,
        registry: WalletRegistry,
        processor: TransactionProcessor,
        composer: NotificationComposer,
        sender: Box<dyn Sender>,
    ) -> Self {
        Self {
            source,
            registry,
            processor,
            state: NotificationState::new(),
            composer,
            sender,
            encryption: None,
        }
    }

    /// Enable encrypt-then-send for the given recipient identity.
    pub fn with_encryption(mut self, encryptor: Box<dyn Encryptor>, recipient: String) -> Self {
        self.encryption = Some((encryptor, recipient));
        self
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// Consume the stream until it ends. The real stream is infinite; the
    /// caller races this against a shutdown signal and drops the future to
    /// cancel, which abandons the in-flight poll between notifications.
    pub async fn run(&mut self) {
        info!(
            "watching {} wallet(s) for new transactions",
            self.registry.active_count()
        );
        while let Some(event) = self.source.next_event().await {
            self.handle_event(event).await;
        }
        info!("event stream ended");
    }

    /// Dispatch one event.
    pub async fn handle_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::NewBlock(block) => {
                // Liveness signal only.
                info!(height = block.height, hash = %block.hash, "new block");
            }
            StreamEvent::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unrecognized event");
            }
            StreamEvent::NewTransaction(tx) => self.handle_transaction(tx).await,
        }
    }

    async fn handle_transaction(&mut self, tx: TransactionEvent) {
        let identifier = tx.derivation_strategy.clone();
        let txid = tx.transaction_data.transaction_hash.clone();

        let Some(wallet_id) = self.registry.resolve(&identifier) else {
            debug!(txid = %txid, "transaction for unknown wallet, skipping");
            return;
        };
        if !self.registry.wallet(wallet_id).is_active() {
            debug!(
                wallet = %self.registry.wallet(wallet_id).name,
                txid = %txid,
                "wallet disabled, skipping"
            );
            return;
        }

        // Reconnects can redeliver; idempotency is enforced here.
        if !self.state.should_notify(&identifier, &txid) {
            debug!(txid = %txid, "duplicate transaction, skipping");
            return;
        }

        let wallet = self.registry.wallet(wallet_id);
        let outcome = self.processor.process(wallet, &tx).await;
        match outcome {
            Ok(Some((record, balances))) => {
                let observed = NotificationComposer::observed_time(&tx);
                let first = self.state.is_first_for_wallet(&identifier);
                let payload =
                    self.composer
                        .compose(wallet, &record, &balances, observed, first);

                info!(
                    wallet = %payload.wallet_name,
                    txid = %txid,
                    direction = %record.direction,
                    amount_sats = record.amount_sats,
                    previous_balance_sats = wallet.balance_sats,
                    balance_sats = balances.ending,
                    "new transaction"
                );

                // Record before delivery: delivery failure still counts as
                // processed, never a resend with moved-on balances.
                self.state.record(&identifier, &txid);
                self.state.mark_wallet_notified(&identifier);
                self.registry.wallet_mut(wallet_id).balance_sats = balances.ending;

                self.dispatch(message::render(&payload)).await;
            }
            Ok(None) => {}
            Err(e) => {
                error!(txid = %txid, "dropping transaction, balance unavailable: {e}");
            }
        }
    }

    async fn dispatch(&self, mut message: Message) {
        if let Some((encryptor, recipient)) = &self.encryption {
            match encryptor.encrypt(&message.body, recipient).await {
                Ok(ciphertext) => message.body = ciphertext,
                Err(e) => {
                    // Fall back to plaintext rather than lose the notification.
                    warn!("encryption failed, sending unencrypted: {e}");
                }
            }
        }
        if let Err(e) = self.sender.send(&message).await {
            error!(subject = %message.subject, "notification delivery failed: {e}");
        }
    }
}
