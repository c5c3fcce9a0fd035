//! NBXplorer backend access: typed events, the HTTP client and the
//! resilient long-poll event stream.

pub mod client;
pub mod events;
pub mod stream;

use async_trait::async_trait;

use crate::error::BackendError;

/// Wallet-level backend operations the watcher core depends on.
/// `NbxClient` is the real implementation; tests substitute fakes.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Make the backend track a derivation. Idempotent: an already-known
    /// derivation is success.
    async fn register_derivation(&self, identifier: &str) -> Result<(), BackendError>;

    /// Current confirmed+unconfirmed balance in satoshis.
    async fn balance_sats(&self, identifier: &str) -> Result<i64, BackendError>;
}

pub use client::NbxClient;
pub use events::{BlockEvent, RawEvent, StreamEvent, TransactionData, TransactionEvent, ValueMovement};
pub use stream::{Backoff, EventPoller, EventSource, NbxEventStream};
