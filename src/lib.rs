//! txwatcher - NBXplorer transaction watcher
//!
//! A long-running watcher that consumes NBXplorer's event feed and emits
//! exactly one notification per wallet per newly broadcast
//! (zero-confirmation) transaction, with a computed balance delta.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration and credentials sourcing
//! - [`logging`] - tracing setup (rolling file + stdout)
//! - [`error`] - error taxonomy
//! - [`money`] - satoshi amounts and BTC formatting
//! - [`backend`] - NBXplorer HTTP API client and resilient event stream
//! - [`watcher`] - registry, processor, state, composer and the pipeline
//! - [`notify`] - delivery and encryption collaborators

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod money;
pub mod notify;
pub mod watcher;

// Convenient re-exports at crate root
pub use backend::{EventPoller, EventSource, NbxClient, NbxEventStream, StreamEvent, WalletBackend};
pub use config::AppConfig;
pub use error::{BackendError, WatcherError};
pub use notify::{Encryptor, GpgEncryptor, LogSender, Message, Sender};
pub use watcher::{
    NotificationComposer, NotificationPayload, NotificationState, RetryPolicy,
    TransactionProcessor, Watcher, WalletRegistry,
};
