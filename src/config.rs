use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use crate::error::WatcherError;

/// Top-level watcher configuration, loaded from `config/{env}.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    pub backend: BackendConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    pub wallets: Vec<WalletConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> String {
    "./logs".to_string()
}
fn default_log_file() -> String {
    "txwatcher.log".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// NBXplorer endpoint and credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub url: String,
    /// Cookie file with a single `user:password` line. Takes precedence
    /// over inline credentials when set.
    #[serde(default)]
    pub cookie_file: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Server-side long-poll hold time for the events endpoint.
    #[serde(default = "default_long_polling_secs")]
    pub long_polling_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_long_polling_secs() -> u64 {
    20
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// HTTP Basic credentials resolved from the backend config.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl BackendConfig {
    /// Resolve credentials: cookie file first, then inline values.
    /// Missing both is fatal at startup.
    pub fn credentials(&self) -> Result<Credentials, WatcherError> {
        if let Some(path) = &self.cookie_file {
            let line = fs::read_to_string(path).map_err(|e| {
                WatcherError::Config(format!("failed to read cookie file {path}: {e}"))
            })?;
            let line = line.trim();
            return Ok(match line.split_once(':') {
                Some((user, password)) => Credentials {
                    user: user.to_string(),
                    password: password.to_string(),
                },
                // A bare line is a password for the conventional cookie user.
                None => Credentials {
                    user: "__cookie__".to_string(),
                    password: line.to_string(),
                },
            });
        }
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Ok(Credentials {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => Err(WatcherError::Config(
                "backend credentials missing: set cookie_file or user/password".to_string(),
            )),
        }
    }
}

/// Notification rendering and delivery options.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    /// Cosmetic label for the localized timestamp, e.g. "GMT-3".
    /// No timezone-database lookup happens; the offset below is applied as-is.
    #[serde(default)]
    pub timezone_label: Option<String>,
    #[serde(default)]
    pub timezone_offset_hours: f64,
    #[serde(default)]
    pub local_explorer_url: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default)]
    pub pgp_enabled: bool,
    #[serde(default)]
    pub pgp_recipient: Option<String>,
}

/// One monitored wallet. Exactly one of `xpub` / `derivation` must be set;
/// `derivation` wins when both are present (it identifies a wallet the
/// backend already tracks, e.g. a BTCPay-managed multisig).
#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    pub name: String,
    #[serde(default)]
    pub xpub: Option<String>,
    #[serde(default)]
    pub derivation: Option<String>,
}

impl WalletConfig {
    pub fn identifier(&self) -> Option<&str> {
        fn nonempty(s: &Option<String>) -> Option<&str> {
            s.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        nonempty(&self.derivation).or_else(|| nonempty(&self.xpub))
    }
}

impl AppConfig {
    /// Load configuration for an environment (`config/{env}.yaml`).
    pub fn load(env: &str) -> Result<Self, WatcherError> {
        Self::from_file(&format!("config/{env}.yaml"))
    }

    /// Load configuration from an explicit YAML file.
    pub fn from_file(path: &str) -> Result<Self, WatcherError> {
        let content = fs::read_to_string(path)
            .map_err(|e| WatcherError::Config(format!("failed to read {path}: {e}")))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| WatcherError::Config(format!("failed to parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation. Everything here is fatal: the process exits
    /// non-zero and waits for the supervisor to restart it with a fixed file.
    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.wallets.is_empty() {
            return Err(WatcherError::Config("no wallets configured".to_string()));
        }
        let mut seen = HashSet::new();
        for wallet in &self.wallets {
            let Some(identifier) = wallet.identifier() else {
                return Err(WatcherError::Config(format!(
                    "wallet '{}' has neither xpub nor derivation",
                    wallet.name
                )));
            };
            if !seen.insert(identifier) {
                return Err(WatcherError::Config(format!(
                    "duplicate wallet identifier configured for '{}'",
                    wallet.name
                )));
            }
        }
        // pgp_enabled without a recipient is deliberately not checked here:
        // it is not fatal, and startup warns about it once logging is up.
        Ok(())
    }
}
