//! Monitored wallet registry.
//!
//! Maps configured wallet identifiers to wallet records with O(1) lookup by
//! the `derivationStrategy` string carried on incoming events. Single-key
//! wallets are registered against the backend at startup; multisig
//! derivation strings are assumed to be tracked already by the backend's
//! own workflow and are never registered here.

use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::backend::{Backoff, WalletBackend};
use crate::config::WalletConfig;
use crate::error::WatcherError;

/// How a wallet is identified on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletIdentity {
    /// Single extended public key; registered proactively at startup.
    Xpub(String),
    /// Multi-party derivation descriptor; matched by exact string equality,
    /// never registered by us.
    Derivation(String),
}

impl WalletIdentity {
    pub fn as_str(&self) -> &str {
        match self {
            WalletIdentity::Xpub(s) | WalletIdentity::Derivation(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Unregistered,
    Pending,
    Registered,
    /// Retry budget exhausted; the wallet is excluded from processing but
    /// other wallets continue.
    Failed,
}

#[derive(Debug, Clone)]
pub struct MonitoredWallet {
    pub name: String,
    pub identity: WalletIdentity,
    pub status: RegistrationStatus,
    /// Last balance reported by the backend for this wallet, in satoshis.
    pub balance_sats: i64,
}

impl MonitoredWallet {
    /// Only registered wallets are matched against incoming events.
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}

/// Index into the registry's wallet table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletId(usize);

/// Retry budget for startup registration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

pub struct WalletRegistry {
    wallets: Vec<MonitoredWallet>,
    by_identifier: HashMap<String, usize>,
}

impl WalletRegistry {
    /// Build the registry from configuration. Duplicate identifiers are a
    /// configuration error, never silently merged.
    pub fn from_config(configs: &[WalletConfig]) -> Result<Self, WatcherError> {
        let mut wallets = Vec::with_capacity(configs.len());
        let mut by_identifier = HashMap::with_capacity(configs.len());

        for config in configs {
            let Some(identifier) = config.identifier() else {
                return Err(WatcherError::Config(format!(
                    "wallet '{}' has neither xpub nor derivation",
                    config.name
                )));
            };
            let (identity, status) = if config.derivation.as_deref().is_some_and(|d| !d.trim().is_empty()) {
                // Backend-managed derivation: trackable from the start.
                (
                    WalletIdentity::Derivation(identifier.to_string()),
                    RegistrationStatus::Registered,
                )
            } else {
                (
                    WalletIdentity::Xpub(identifier.to_string()),
                    RegistrationStatus::Unregistered,
                )
            };

            if by_identifier
                .insert(identifier.to_string(), wallets.len())
                .is_some()
            {
                return Err(WatcherError::Config(format!(
                    "duplicate wallet identifier configured for '{}'",
                    config.name
                )));
            }
            wallets.push(MonitoredWallet {
                name: config.name.clone(),
                identity,
                status,
                balance_sats: 0,
            });
        }

        Ok(Self {
            wallets,
            by_identifier,
        })
    }

    /// Exact-string lookup by the identifier carried on an event.
    pub fn resolve(&self, identifier: &str) -> Option<WalletId> {
        self.by_identifier.get(identifier).copied().map(WalletId)
    }

    pub fn wallet(&self, id: WalletId) -> &MonitoredWallet {
        &self.wallets[id.0]
    }

    pub fn wallet_mut(&mut self, id: WalletId) -> &mut MonitoredWallet {
        &mut self.wallets[id.0]
    }

    pub fn wallets(&self) -> &[MonitoredWallet] {
        &self.wallets
    }

    pub fn active_count(&self) -> usize {
        self.wallets.iter().filter(|w| w.is_active()).count()
    }

    /// Register every single-key wallet, retrying each with bounded backoff.
    /// Permanent failure disables only that wallet. Must complete before the
    /// first event is matched (the readiness gate of the single pipeline).
    pub async fn register_all(&mut self, backend: &dyn WalletBackend, policy: &RetryPolicy) {
        for wallet in &mut self.wallets {
            let WalletIdentity::Xpub(xpub) = &wallet.identity else {
                info!(
                    wallet = %wallet.name,
                    "using existing derivation, not registering"
                );
                continue;
            };

            wallet.status = RegistrationStatus::Pending;
            let mut backoff = Backoff::new(policy.base_delay, policy.max_delay);

            for attempt in 1..=policy.attempts {
                match backend.register_derivation(xpub).await {
                    Ok(()) => {
                        info!(wallet = %wallet.name, "wallet registered");
                        wallet.status = RegistrationStatus::Registered;
                        break;
                    }
                    Err(e) if attempt == policy.attempts => {
                        error!(
                            wallet = %wallet.name,
                            "registration failed after {attempt} attempts, disabling wallet: {e}"
                        );
                        wallet.status = RegistrationStatus::Failed;
                    }
                    Err(e) => {
                        let delay = backoff.next_delay();
                        if e.is_auth_rejection() {
                            error!(
                                wallet = %wallet.name,
                                "registration rejected by backend auth (attempt {attempt}): {e}; retrying in {delay:?}"
                            );
                        } else {
                            warn!(
                                wallet = %wallet.name,
                                "registration attempt {attempt} failed: {e}; retrying in {delay:?}"
                            );
                        }
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn wallet_config(name: &str, xpub: Option<&str>, derivation: Option<&str>) -> WalletConfig {
        WalletConfig {
            name: name.to_string(),
            xpub: xpub.map(str::to_string),
            derivation: derivation.map(str::to_string),
        }
    }

    struct ScriptedBackend {
        // One entry per registration call: Ok or Err.
        outcomes: Mutex<Vec<Result<(), ()>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<(), ()>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WalletBackend for ScriptedBackend {
        async fn register_derivation(&self, identifier: &str) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(identifier.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            match outcomes.pop() {
                Some(Ok(())) | None => Ok(()),
                Some(Err(())) => Err(BackendError::Status {
                    endpoint: "derivations".to_string(),
                    status: 500,
                }),
            }
        }

        async fn balance_sats(&self, _identifier: &str) -> Result<i64, BackendError> {
            Ok(0)
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_resolve_is_exact_match() {
        let registry = WalletRegistry::from_config(&[wallet_config(
            "multisig",
            None,
            Some("2-of-xpubA-xpubB"),
        )])
        .unwrap();

        assert!(registry.resolve("2-of-xpubA-xpubB").is_some());
        // A single-character difference must not match.
        assert!(registry.resolve("2-of-xpubA-xpubC").is_none());
        assert!(registry.resolve("2-of-xpubA-xpub").is_none());
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let result = WalletRegistry::from_config(&[
            wallet_config("a", Some("xpubSAME"), None),
            wallet_config("b", None, Some("xpubSAME")),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_derivation_wallets_start_registered() {
        let registry = WalletRegistry::from_config(&[
            wallet_config("multisig", None, Some("2-of-xpubA-xpubB")),
            wallet_config("single", Some("xpubCOLD"), None),
        ])
        .unwrap();

        assert_eq!(registry.wallets()[0].status, RegistrationStatus::Registered);
        assert_eq!(
            registry.wallets()[1].status,
            RegistrationStatus::Unregistered
        );
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_register_all_skips_derivation_wallets() {
        let mut registry = WalletRegistry::from_config(&[wallet_config(
            "multisig",
            None,
            Some("2-of-xpubA-xpubB"),
        )])
        .unwrap();
        let backend = ScriptedBackend::new(vec![]);

        registry.register_all(&backend, &fast_policy(3)).await;

        assert!(backend.calls.lock().unwrap().is_empty());
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_register_all_retries_then_succeeds() {
        let mut registry =
            WalletRegistry::from_config(&[wallet_config("single", Some("xpubCOLD"), None)])
                .unwrap();
        // Popped from the back: two failures, then success.
        let backend = ScriptedBackend::new(vec![Ok(()), Err(()), Err(())]);

        registry.register_all(&backend, &fast_policy(5)).await;

        assert_eq!(backend.calls.lock().unwrap().len(), 3);
        assert_eq!(registry.wallets()[0].status, RegistrationStatus::Registered);
    }

    #[tokio::test]
    async fn test_register_all_disables_wallet_after_budget() {
        let mut registry = WalletRegistry::from_config(&[
            wallet_config("doomed", Some("xpubBAD"), None),
            wallet_config("fine", Some("xpubGOOD"), None),
        ])
        .unwrap();
        // Three failures for the first wallet, success for the second.
        let backend = ScriptedBackend::new(vec![Ok(()), Err(()), Err(()), Err(())]);

        registry.register_all(&backend, &fast_policy(3)).await;

        assert_eq!(registry.wallets()[0].status, RegistrationStatus::Failed);
        assert_eq!(registry.wallets()[1].status, RegistrationStatus::Registered);
        assert_eq!(registry.active_count(), 1);
    }
}
