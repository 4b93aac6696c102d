mod app;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use consist_core::{
    account::{AccountStore, AccountWatcher, Roster},
    config::{self, AppConfig},
};
use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;

    let roster = Roster::load(&config.account_path)?;
    let store = AccountStore::new(&config.account_path);

    let mut app = app::ConsistApp::new(roster, store, &config);

    // Keep the watcher alive for the whole session.
    let _watcher = if config.watch_account {
        let (account_tx, account_rx) = mpsc::channel(8);
        match AccountWatcher::spawn(&config.account_path, account_tx) {
            Ok(watcher) => {
                tracing::info!(path = %watcher.path().display(), "Watching account file");
                app.attach_watcher(account_rx);
                Some(watcher)
            }
            Err(err) => {
                tracing::error!("Account watcher unavailable: {err:#}");
                None
            }
        }
    } else {
        None
    };

    app.run().await
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("consist.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so everything goes to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
