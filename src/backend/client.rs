//! NBXplorer HTTP API client.
//!
//! Three operations are consumed: derivation registration, balance query and
//! one round of the long-polling events endpoint. All requests carry HTTP
//! Basic credentials.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::WalletBackend;
use crate::config::BackendConfig;
use crate::error::{BackendError, WatcherError};

use super::events::RawEvent;

/// HTTP client for the NBXplorer API. Cheap to clone; the underlying
/// connection pool is shared.
#[derive(Clone)]
pub struct NbxClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    long_polling_secs: u64,
}

impl NbxClient {
    pub fn new(config: &BackendConfig) -> Result<Self, WatcherError> {
        let credentials = config.credentials()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(BackendError::from)?;

        info!("NBXplorer client for {}", config.url);

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: credentials.user,
            password: credentials.password,
            long_polling_secs: config.long_polling_secs,
        })
    }

    fn derivation_url(&self, identifier: &str, suffix: &str) -> String {
        format!(
            "{}/v1/cryptos/BTC/derivations/{}{}",
            self.base_url,
            encode_path_segment(identifier),
            suffix
        )
    }

    fn check_status(endpoint: &str, status: reqwest::StatusCode) -> Result<(), BackendError> {
        match status.as_u16() {
            200..=299 => Ok(()),
            401 | 403 => Err(BackendError::AuthRejected(status.as_u16())),
            code => Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: code,
            }),
        }
    }

    /// One long-poll round against the events endpoint. Returns an empty
    /// batch when the server-side hold time elapses without new events.
    pub async fn poll_events(&self, last_event_id: i64) -> Result<Vec<RawEvent>, BackendError> {
        let url = format!("{}/v1/cryptos/BTC/events", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .query(&[
                ("lastEventId", last_event_id.to_string()),
                ("longPolling", self.long_polling_secs.to_string()),
            ])
            .send()
            .await?;

        Self::check_status("events", response.status())?;
        response
            .json::<Vec<RawEvent>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default, alias = "confirmedBalance")]
    confirmed: i64,
    #[serde(default, alias = "unconfirmedBalance")]
    unconfirmed: i64,
}

#[async_trait]
impl WalletBackend for NbxClient {
    /// Register a single-key derivation. 409 means the backend already
    /// tracks it, which is success for our purposes.
    async fn register_derivation(&self, identifier: &str) -> Result<(), BackendError> {
        let url = self.derivation_url(identifier, "");
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        if response.status().as_u16() == 409 {
            return Ok(());
        }
        Self::check_status("derivations", response.status())
    }

    /// Current balance in satoshis, confirmed plus unconfirmed, so the
    /// figure already reflects the zero-confirmation transaction that
    /// triggered the query.
    async fn balance_sats(&self, identifier: &str) -> Result<i64, BackendError> {
        let url = self.derivation_url(identifier, "/balance");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        Self::check_status("balance", response.status())?;
        let balance: BalanceResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(balance.confirmed + balance.unconfirmed)
    }
}

/// Percent-encode a derivation string for use as a URL path segment.
/// Derivation strategies carry characters like `-`, `[` and `/`.
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
