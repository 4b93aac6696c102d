//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user config dir holding consist files.
pub const CONFIG_DIR: &str = "consist";
/// Name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix of environment variable overrides (`CONSIST_ACCOUNT_PATH`, ...).
pub const ENV_PREFIX: &str = "CONSIST";

/// Settings shared by the core library and the terminal front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Account snapshot used as data source and persistence target.
    pub account_path: PathBuf,
    /// Directory receiving log files.
    pub log_dir: PathBuf,
    /// Train opened by default in the composition view.
    #[serde(default)]
    pub default_train: Option<String>,
    /// Cross-fade between drawer states instead of redrawing immediately.
    #[serde(default = "default_true")]
    pub animate: bool,
    /// Reload the account when the file changes on disk.
    #[serde(default = "default_true")]
    pub watch_account: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        let root = config_root();
        Self {
            account_path: root.join("account.json"),
            log_dir: root.join("logs"),
            default_train: None,
            animate: true,
            watch_account: true,
        }
    }
}

impl AppConfig {
    /// Default location of the configuration file.
    pub fn config_path() -> PathBuf {
        config_root().join(CONFIG_FILE)
    }

    /// Load configuration from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path` plus environment overrides. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default(
                "account_path",
                defaults.account_path.to_string_lossy().to_string(),
            )?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().to_string())?
            .set_default("animate", defaults.animate)?
            .set_default("watch_account", defaults.watch_account)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid configuration values")
    }
}

/// Write a default configuration file if none exists yet. Returns its path.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    write_config(path, &AppConfig::default())?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize configuration")?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}
