//! Persistence of committed train compositions.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::models::{AssetId, Train};

use super::snapshot::{cargo_entries, AccountSnapshot, CargoEntry};

/// Failure reported by a [`CompositionStore`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("account json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("train {0} is not part of the stored account")]
    UnknownTrain(String),
    #[error("{0}")]
    Rejected(String),
}

/// Edited composition handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionUpdate {
    /// Name of the train being updated.
    pub train: String,
    /// Locomotive identities (zero or one).
    pub locomotive_ids: Vec<AssetId>,
    /// Conductor identities (zero or one).
    pub conductor_ids: Vec<AssetId>,
    /// Rail cars with their loads, in coupling order.
    pub cargo: Vec<CargoEntry>,
}

impl CompositionUpdate {
    /// Describe the composition of `train`.
    pub fn from_train(train: &Train) -> Self {
        Self {
            train: train.name.clone(),
            locomotive_ids: train.locomotive.iter().map(|card| card.id).collect(),
            conductor_ids: train.conductor.iter().map(|card| card.id).collect(),
            cargo: cargo_entries(train),
        }
    }
}

/// Persistence collaborator. Either fully succeeds or returns an error.
#[allow(async_fn_in_trait)]
pub trait CompositionStore {
    /// Persist the composition of one train.
    async fn update_composition(&self, update: &CompositionUpdate) -> Result<(), StoreError>;
}

/// Store that rewrites the account snapshot file in place.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    /// Create a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the account file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(&self) -> Result<AccountSnapshot, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_snapshot(&self, snapshot: &AccountSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let serialised = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, serialised)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CompositionStore for AccountStore {
    async fn update_composition(&self, update: &CompositionUpdate) -> Result<(), StoreError> {
        let mut snapshot = self.read_snapshot().await?;
        let record = snapshot
            .trains
            .iter_mut()
            .find(|record| record.name == update.train)
            .ok_or_else(|| StoreError::UnknownTrain(update.train.clone()))?;

        record.locomotive = update.locomotive_ids.first().copied();
        record.conductor = update.conductor_ids.first().copied();
        record.cars = update.cargo.clone();
        snapshot.updated_at = Some(Utc::now());

        self.write_snapshot(&snapshot).await?;
        info!(
            train = %update.train,
            path = %self.path.display(),
            cars = update.cargo.len(),
            "Composition persisted"
        );
        Ok(())
    }
}
