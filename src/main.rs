//! txwatcher entry point.
//!
//! Startup order matters: configuration and credentials are fatal when
//! broken (the supervisor restarts us), wallet registration must finish
//! before the first event is matched, and only then does the stream loop
//! begin.

use anyhow::{Context, bail};
use std::sync::Arc;

use txwatcher::backend::{NbxClient, NbxEventStream};
use txwatcher::notify::{GpgEncryptor, LogSender};
use txwatcher::watcher::{
    NotificationComposer, RetryPolicy, TransactionProcessor, Watcher, WalletRegistry,
};
use txwatcher::{AppConfig, logging};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Explicit config file path (--config), overriding the env convention.
fn get_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let env = get_env();
    let config = match get_config_path() {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::load(&env)?,
    };
    let _log_guard = logging::init_logging(&config);

    tracing::info!("Starting txwatcher ({}) in {} mode", env!("GIT_HASH"), env);

    let client = NbxClient::new(&config.backend).context("backend client setup failed")?;

    let mut registry = WalletRegistry::from_config(&config.wallets)?;
    registry
        .register_all(&client, &RetryPolicy::default())
        .await;
    if registry.active_count() == 0 {
        bail!("no wallets available for monitoring after registration");
    }

    let processor = TransactionProcessor::new(Arc::new(client.clone()));
    let composer = NotificationComposer::from_config(&config.notify);
    let source = NbxEventStream::new(client);

    let mut watcher = Watcher::new(source, registry, processor, composer, Box::new(LogSender));
    if config.notify.pgp_enabled {
        match &config.notify.pgp_recipient {
            Some(recipient) => {
                tracing::info!("PGP encryption enabled for {recipient}");
                watcher =
                    watcher.with_encryption(Box::new(GpgEncryptor::new()), recipient.clone());
            }
            None => {
                tracing::warn!("pgp_enabled but pgp_recipient is empty; sending unencrypted");
            }
        }
    }

    tokio::select! {
        _ = watcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested, closing event stream");
        }
    }

    Ok(())
}
