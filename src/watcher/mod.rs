//! The notification engine: wallet registry, transaction processing,
//! idempotency state, payload composition and the sequential pipeline.

pub mod composer;
pub mod processor;
pub mod registry;
pub mod state;
pub mod worker;

pub use composer::{LocalTime, NotificationComposer, NotificationPayload};
pub use processor::{BalanceFigures, Direction, TransactionProcessor, TransactionRecord};
pub use registry::{
    MonitoredWallet, RegistrationStatus, RetryPolicy, WalletId, WalletIdentity, WalletRegistry,
};
pub use state::NotificationState;
pub use worker::Watcher;
