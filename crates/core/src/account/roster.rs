use std::{path::Path, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::models::{Card, CardKind, Train};

use super::snapshot::AccountSnapshot;

/// Read access to a player's cards and trains, plus write-back of committed trains.
///
/// Every call returns a snapshot taken at call time.
pub trait CardSource {
    /// Every card the player owns.
    fn cards(&self) -> Vec<Card>;

    /// Every card the player owns of one kind.
    fn cards_of(&self, kind: CardKind) -> Vec<Card> {
        self.cards()
            .into_iter()
            .filter(|card| card.kind() == kind)
            .collect()
    }

    /// Every train the player owns.
    fn trains(&self) -> Vec<Train>;

    /// The train with the given name.
    fn train(&self, name: &str) -> Option<Train> {
        self.trains().into_iter().find(|train| train.name == name)
    }

    /// Overwrite the canonical train with the same name. Returns `false` if none exists.
    fn replace_train(&self, train: Train) -> bool;
}

/// Thread-safe handle over one player's account.
#[derive(Clone)]
pub struct Roster {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    player: String,
    cards: Vec<Card>,
    trains: Vec<Train>,
    loaded_at: DateTime<Utc>,
}

impl Roster {
    /// Build a roster from already resolved cards and trains.
    pub fn new(player: impl Into<String>, cards: Vec<Card>, trains: Vec<Train>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                player: player.into(),
                cards,
                trains,
                loaded_at: Utc::now(),
            })),
        }
    }

    /// Resolve a snapshot into a roster.
    pub fn from_snapshot(snapshot: AccountSnapshot) -> Result<Self> {
        let trains = snapshot.resolve_trains()?;
        Ok(Self::new(snapshot.player, snapshot.cards, trains))
    }

    /// Load the account snapshot stored at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let roster = Self::from_snapshot(AccountSnapshot::load(path)?)?;
        info!(
            path = %path.display(),
            cards = roster.inner.read().cards.len(),
            trains = roster.inner.read().trains.len(),
            "Account loaded"
        );
        Ok(roster)
    }

    /// Replace the whole account with a freshly read snapshot.
    pub fn refresh(&self, snapshot: AccountSnapshot) -> Result<()> {
        let trains = snapshot.resolve_trains()?;
        let mut inner = self.inner.write();
        inner.player = snapshot.player;
        inner.cards = snapshot.cards;
        inner.trains = trains;
        inner.loaded_at = Utc::now();
        debug!(cards = inner.cards.len(), trains = inner.trains.len(), "Account refreshed");
        Ok(())
    }

    /// Owning player's name.
    pub fn player(&self) -> String {
        self.inner.read().player.clone()
    }

    /// When the account data was last (re)loaded.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.read().loaded_at
    }
}

impl CardSource for Roster {
    fn cards(&self) -> Vec<Card> {
        self.inner.read().cards.clone()
    }

    fn cards_of(&self, kind: CardKind) -> Vec<Card> {
        self.inner
            .read()
            .cards
            .iter()
            .filter(|card| card.kind() == kind)
            .cloned()
            .collect()
    }

    fn trains(&self) -> Vec<Train> {
        self.inner.read().trains.clone()
    }

    fn train(&self, name: &str) -> Option<Train> {
        self.inner
            .read()
            .trains
            .iter()
            .find(|train| train.name == name)
            .cloned()
    }

    fn replace_train(&self, train: Train) -> bool {
        let mut inner = self.inner.write();
        match inner.trains.iter_mut().find(|slot| slot.name == train.name) {
            Some(slot) => {
                *slot = train;
                true
            }
            None => false,
        }
    }
}
