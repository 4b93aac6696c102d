#![allow(missing_docs)]

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssetId, Card, CardKind, RailCar, Train};

/// Rail car entry of a persisted composition: the wagon and what it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoEntry {
    /// Wagon identity.
    pub railcar: AssetId,
    /// Loaded card identities.
    #[serde(default)]
    pub loads: Vec<AssetId>,
}

/// Persisted train referencing cards by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRecord {
    pub name: String,
    #[serde(default)]
    pub conductor: Option<AssetId>,
    #[serde(default)]
    pub locomotive: Option<AssetId>,
    #[serde(default)]
    pub cars: Vec<CargoEntry>,
    pub base_slots: u32,
    #[serde(default)]
    pub extra_slots: u32,
}

impl TrainRecord {
    /// Capture the identities of a resolved train.
    pub fn from_train(train: &Train) -> Self {
        Self {
            name: train.name.clone(),
            conductor: train.conductor.as_ref().map(|card| card.id),
            locomotive: train.locomotive.as_ref().map(|card| card.id),
            cars: cargo_entries(train),
            base_slots: train.base_slots,
            extra_slots: train.extra_slots,
        }
    }
}

/// Build the per-car identity list of a train.
pub fn cargo_entries(train: &Train) -> Vec<CargoEntry> {
    train
        .cars
        .iter()
        .map(|slot| CargoEntry {
            railcar: slot.car.id,
            loads: slot.loads.iter().map(|load| load.id).collect(),
        })
        .collect()
}

/// On-disk representation of one player's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub player: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub trains: Vec<TrainRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AccountSnapshot {
    /// Read a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse a snapshot from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        Ok(snapshot)
    }

    /// Resolve every train record against the owned cards.
    pub fn resolve_trains(&self) -> Result<Vec<Train>> {
        let index: HashMap<AssetId, &Card> = self.cards.iter().map(|card| (card.id, card)).collect();
        self.trains
            .iter()
            .map(|record| resolve_train(record, &index))
            .collect()
    }
}

fn resolve_train(record: &TrainRecord, index: &HashMap<AssetId, &Card>) -> Result<Train> {
    let lookup = |id: AssetId, expected: CardKind| -> Result<Card> {
        let card = index
            .get(&id)
            .ok_or_else(|| anyhow!("train {} references unknown card {id}", record.name))?;
        if card.kind() != expected {
            return Err(anyhow!(
                "train {} expects a {:?} at {id}, found {:?}",
                record.name,
                expected,
                card.kind()
            ));
        }
        Ok((*card).clone())
    };

    let mut cars = Vec::with_capacity(record.cars.len());
    for entry in &record.cars {
        let mut slot = RailCar::empty(lookup(entry.railcar, CardKind::Wagon)?);
        for load in &entry.loads {
            slot.loads.push(lookup(*load, CardKind::Loadable)?);
        }
        cars.push(slot);
    }

    Ok(Train {
        name: record.name.clone(),
        conductor: record
            .conductor
            .map(|id| lookup(id, CardKind::Conductor))
            .transpose()?,
        locomotive: record
            .locomotive
            .map(|id| lookup(id, CardKind::Locomotive))
            .transpose()?,
        cars,
        base_slots: record.base_slots,
        extra_slots: record.extra_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "player": "alice",
        "cards": [
            { "id": 1, "name": "Ada", "rarity": "rare",
              "stats": { "kind": "conductor", "level": 4 } },
            { "id": 2, "name": "Big Boy", "rarity": "epic",
              "stats": { "kind": "locomotive", "hauling_power": 900, "weight": 100,
                         "speed": 50, "distance": 300, "conductor_threshold": 3 } },
            { "id": 3, "name": "Hopper", "rarity": "common",
              "stats": { "kind": "wagon", "weight": 20,
                         "capacity": { "type": "cargo", "volume": 100, "accepts": ["ore", "grain"] } } },
            { "id": 4, "name": "Iron", "rarity": "common",
              "stats": { "kind": "loadable", "type": "commodity", "commodity": "ore",
                         "volume": 30, "weight": 40 } }
        ],
        "trains": [
            { "name": "Alpha", "conductor": 1, "locomotive": 2,
              "cars": [ { "railcar": 3, "loads": [4] } ], "base_slots": 2 }
        ]
    }"#;

    #[test]
    fn resolves_train_records() -> Result<()> {
        let snapshot = AccountSnapshot::parse(SAMPLE)?;
        let trains = snapshot.resolve_trains()?;
        assert_eq!(trains.len(), 1);
        let train = &trains[0];
        assert_eq!(train.conductor.as_ref().map(|card| card.id), Some(AssetId(1)));
        assert_eq!(train.cars[0].loads[0].name, "Iron");
        assert_eq!(train.total_weight(), 100 + 20 + 40);
        assert_eq!(TrainRecord::from_train(train), snapshot.trains[0]);
        Ok(())
    }

    #[test]
    fn rejects_dangling_and_mistyped_references() -> Result<()> {
        let mut snapshot = AccountSnapshot::parse(SAMPLE)?;
        snapshot.trains[0].conductor = Some(AssetId(99));
        let err = snapshot.resolve_trains().unwrap_err();
        assert!(err.to_string().contains("unknown card #99"));

        snapshot.trains[0].conductor = Some(AssetId(2));
        let err = snapshot.resolve_trains().unwrap_err();
        assert!(err.to_string().contains("expects a Conductor"));
        Ok(())
    }
}
