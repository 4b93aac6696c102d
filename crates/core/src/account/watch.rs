use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::snapshot::AccountSnapshot;

/// Events emitted when the account file changes on disk.
#[derive(Debug)]
pub enum AccountEvent {
    /// The file was re-read successfully.
    Reloaded {
        /// Path of the account file.
        path: PathBuf,
        /// Freshly parsed snapshot.
        snapshot: AccountSnapshot,
    },
    /// Reading or parsing the changed file failed.
    Error(anyhow::Error),
}

/// Watches the account file so ownership changes made elsewhere reach the roster.
///
/// Dropping the watcher stops delivery.
pub struct AccountWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl AccountWatcher {
    /// Start watching `path`, forwarding events to `sender`.
    pub fn spawn(path: impl Into<PathBuf>, sender: mpsc::Sender<AccountEvent>) -> Result<Self> {
        let path = path.into();
        let target = path.clone();
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) if is_content_change(&event.kind) => event,
                Ok(_) => return,
                Err(err) => {
                    let _ = sender.blocking_send(AccountEvent::Error(err.into()));
                    return;
                }
            };
            if !event.paths.iter().any(|changed| changed.ends_with(file_name(&target))) {
                return;
            }
            debug!(path = %target.display(), "Account file changed");
            let outcome = match AccountSnapshot::load(&target) {
                Ok(snapshot) => AccountEvent::Reloaded {
                    path: target.clone(),
                    snapshot,
                },
                Err(err) => {
                    warn!(path = %target.display(), "Failed to reload account: {err}");
                    AccountEvent::Error(err)
                }
            };
            let _ = sender.blocking_send(outcome);
        })
        .context("failed to create account watcher")?;

        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", directory.display()))?;

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    /// Path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn file_name(path: &Path) -> &Path {
    path.file_name().map(Path::new).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use tempfile::tempdir;
    use tokio::time::timeout;

    const ACCOUNT: &str = r#"{ "player": "alice", "cards": [], "trains": [] }"#;

    #[tokio::test]
    async fn rewritten_file_is_reloaded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("account.json");
        std::fs::write(&path, ACCOUNT)?;

        let (sender, mut receiver) = mpsc::channel(8);
        let watcher = AccountWatcher::spawn(&path, sender)?;
        assert_eq!(watcher.path(), path.as_path());

        std::fs::write(&path, ACCOUNT.replace("alice", "bob"))?;

        // Partial writes may surface as parse errors before the final content lands.
        let reloaded = timeout(Duration::from_secs(5), async {
            while let Some(event) = receiver.recv().await {
                if let AccountEvent::Reloaded { path, snapshot } = event {
                    if snapshot.player == "bob" {
                        return Some(path);
                    }
                }
            }
            None
        })
        .await?;
        assert_eq!(reloaded, Some(path));
        Ok(())
    }
}
