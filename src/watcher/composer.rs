//! Notification payload assembly.

use chrono::{DateTime, Duration, Utc};

use crate::backend::TransactionEvent;
use crate::config::NotifyConfig;
use crate::watcher::processor::{BalanceFigures, Direction, TransactionRecord};
use crate::watcher::registry::MonitoredWallet;

const DATE_FORMAT: &str = "%d/%b/%y %H:%M:%S";

/// Localized timestamp rendering: a cosmetic label plus the formatted time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTime {
    pub label: String,
    pub rendered: String,
}

/// Everything the delivery collaborator needs, immutable once built and
/// consumed exactly once.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub wallet_name: String,
    pub direction: Direction,
    pub txid: String,
    pub utc_time: String,
    pub local_time: Option<LocalTime>,
    pub original_sats: i64,
    /// Signed: positive for Inbound, negative for Outbound.
    pub amount_sats: i64,
    pub ending_sats: i64,
    pub explorer_links: Vec<String>,
    pub first_transaction: bool,
}

pub struct NotificationComposer {
    timezone_label: Option<String>,
    timezone_offset: Duration,
    explorer_bases: Vec<String>,
}

impl NotificationComposer {
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut explorer_bases = Vec::new();
        for base in [&config.local_explorer_url, &config.explorer_url]
            .into_iter()
            .flatten()
        {
            let trimmed = base.trim_end_matches('/');
            if !trimmed.is_empty() {
                explorer_bases.push(trimmed.to_string());
            }
        }
        Self {
            timezone_label: config.timezone_label.clone(),
            timezone_offset: Duration::milliseconds(
                (config.timezone_offset_hours * 3_600_000.0) as i64,
            ),
            explorer_bases,
        }
    }

    /// When the backend first saw the transaction; now if it did not say.
    pub fn observed_time(event: &TransactionEvent) -> DateTime<Utc> {
        event
            .observed_at()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }

    pub fn compose(
        &self,
        wallet: &MonitoredWallet,
        record: &TransactionRecord,
        balances: &BalanceFigures,
        observed: DateTime<Utc>,
        first_transaction: bool,
    ) -> NotificationPayload {
        let local_time = self.timezone_label.as_ref().map(|label| LocalTime {
            label: label.clone(),
            rendered: (observed + self.timezone_offset)
                .format(DATE_FORMAT)
                .to_string(),
        });

        let amount_sats = match record.direction {
            Direction::Inbound => record.amount_sats,
            Direction::Outbound => -record.amount_sats,
        };

        NotificationPayload {
            wallet_name: wallet.name.clone(),
            direction: record.direction,
            txid: record.txid.clone(),
            utc_time: observed.format(DATE_FORMAT).to_string(),
            local_time,
            original_sats: balances.original,
            amount_sats,
            ending_sats: balances.ending,
            explorer_links: self
                .explorer_bases
                .iter()
                .map(|base| format!("{base}/tx/{}", record.txid))
                .collect(),
            first_transaction,
        }
    }
}
