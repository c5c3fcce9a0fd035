//! NBXplorer event feed data model.
//!
//! The events endpoint returns an array of envelopes tagged by `type`.
//! Envelopes are decoded in two steps: the outer shape first (so the event
//! cursor can advance even past event kinds this watcher does not handle),
//! then the typed payload.

use serde::Deserialize;

/// Raw envelope from the events endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A typed event consumed by the watcher pipeline.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    NewTransaction(TransactionEvent),
    /// Surfaced for liveness logging only; never drives notifications.
    NewBlock(BlockEvent),
    /// Event kinds this watcher does not know; skipped with a log entry.
    Unknown { kind: String },
}

impl RawEvent {
    /// Decode the typed payload for known event kinds.
    pub fn classify(self) -> Result<StreamEvent, serde_json::Error> {
        match self.kind.as_str() {
            "newtransaction" => Ok(StreamEvent::NewTransaction(serde_json::from_value(
                self.data,
            )?)),
            "newblock" => Ok(StreamEvent::NewBlock(serde_json::from_value(self.data)?)),
            _ => Ok(StreamEvent::Unknown { kind: self.kind }),
        }
    }
}

/// `newtransaction` payload: the wallet-identifying derivation strategy,
/// transaction metadata and the value movements affecting this wallet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    #[serde(default)]
    pub derivation_strategy: String,
    pub transaction_data: TransactionData,
    /// Value leaving the wallet.
    #[serde(default)]
    pub inputs: Vec<ValueMovement>,
    /// Value entering the wallet (payments, change, pay-to-self).
    #[serde(default)]
    pub outputs: Vec<ValueMovement>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub seen_at: Option<String>,
    #[serde(default)]
    pub first_seen: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub transaction_hash: String,
    #[serde(default)]
    pub confirmations: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMovement {
    #[serde(default)]
    pub value: i64,
}

/// `newblock` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEvent {
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub hash: String,
}

impl TransactionEvent {
    /// Confirmation count; a missing field means the transaction is still
    /// in the mempool (0 confirmations).
    pub fn confirmations(&self) -> i64 {
        self.transaction_data.confirmations.unwrap_or(0)
    }

    /// First present of the timestamp fields the backend may carry.
    pub fn observed_at(&self) -> Option<&str> {
        self.timestamp
            .as_deref()
            .or(self.seen_at.as_deref())
            .or(self.first_seen.as_deref())
    }
}
