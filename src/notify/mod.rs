//! Delivery collaborators.
//!
//! The watcher core never talks SMTP or spawns gpg directly; it hands a
//! rendered message to a `Sender`, optionally pushing the body through an
//! `Encryptor` first (encrypt-then-send). Both are narrow capability traits
//! so the pipeline is testable with fakes.

pub mod gpg;
pub mod message;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct SendError(pub String);

#[derive(Debug, Error)]
#[error("encryption failed: {0}")]
pub struct EncryptError(pub String);

/// Delivers one message. Failure is logged by the caller and the event
/// still counts as processed; delivery is never retried.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), SendError>;
}

/// Encrypts a plaintext body for a recipient identity.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String, EncryptError>;
}

/// Default sender: emits the rendered message through the log stream.
/// Operators wire a real transport behind the `Sender` trait.
pub struct LogSender;

#[async_trait]
impl Sender for LogSender {
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        info!(subject = %message.subject, "notification:\n{}", message.body);
        Ok(())
    }
}

pub use gpg::GpgEncryptor;
