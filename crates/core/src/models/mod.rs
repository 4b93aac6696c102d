//! Shared domain models.

mod train;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use train::{RailCar, Train, TrainStats, Utilization};

/// Stable identity of a collectible card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broad card category used for queries and slot matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    /// Pulls the train and caps its weight.
    Locomotive,
    /// Operates the locomotive.
    Conductor,
    /// Rail car carrying passengers or commodities.
    Wagon,
    /// Commodity or passenger loaded into a rail car.
    Loadable,
}

impl CardKind {
    /// All kinds in inventory display order.
    pub const ALL: [CardKind; 4] = [
        Self::Conductor,
        Self::Locomotive,
        Self::Wagon,
        Self::Loadable,
    ];

    /// Human-readable plural label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Locomotive => "Locomotives",
            Self::Conductor => "Conductors",
            Self::Wagon => "Rail cars",
            Self::Loadable => "Loads",
        }
    }
}

/// Card rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    /// Most frequent tier.
    Common,
    /// Second tier.
    Uncommon,
    /// Third tier.
    Rare,
    /// Fourth tier.
    Epic,
    /// Fifth tier.
    Legendary,
    /// Rarest tier.
    Mythic,
}

/// Commodity families a cargo car may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CommodityType {
    Aggregate,
    Grain,
    Liquid,
    Ore,
    Granule,
    Crate,
    Building,
    Gas,
    TopSecret,
    Oversized,
}

/// Passenger class served by a passenger car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PassengerClass {
    Commuter,
    Tourist,
    Executive,
    Inmate,
}

/// Type-specific statistics. The card's [`CardKind`] is derived from this payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardStats {
    /// Locomotive statistics.
    Locomotive {
        /// Maximum train weight the locomotive can pull.
        hauling_power: u32,
        /// Weight of the locomotive itself.
        weight: u32,
        /// Top speed.
        speed: u32,
        /// Range before refuelling.
        distance: u32,
        /// Minimum conductor level required to operate it.
        conductor_threshold: u32,
        /// Fuel label, informational only.
        #[serde(default)]
        fuel: String,
    },
    /// Conductor statistics.
    Conductor {
        /// Gear level compared against locomotive thresholds.
        level: u32,
        /// Optional perk label.
        #[serde(default)]
        perk: Option<String>,
    },
    /// Rail car statistics.
    Wagon(WagonStats),
    /// Commodity or passenger statistics.
    Loadable(LoadableStats),
}

/// Rail car statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagonStats {
    /// Empty weight of the car.
    pub weight: u32,
    /// What the car can carry.
    #[serde(default)]
    pub capacity: WagonCapacity,
}

/// Carrying capacity of a rail car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum WagonCapacity {
    /// Seats for one passenger class.
    Passenger {
        seats: u32,
        class: PassengerClass,
    },
    /// Volume for up to two commodity families.
    Cargo {
        volume: u32,
        accepts: [CommodityType; 2],
    },
    /// Car without a recognised carrying type.
    #[default]
    Unsupported,
}

/// Commodity or passenger statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LoadableStats {
    /// Freight occupying volume.
    Commodity {
        commodity: CommodityType,
        volume: u32,
        weight: u32,
    },
    /// A passenger occupying one seat.
    Passenger { class: PassengerClass, weight: u32 },
}

impl LoadableStats {
    /// Weight contributed to the train.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Commodity { weight, .. } | Self::Passenger { weight, .. } => *weight,
        }
    }

    /// Whether this load may be placed into a car with the given capacity.
    pub fn fits(&self, capacity: &WagonCapacity) -> bool {
        match (self, capacity) {
            (Self::Passenger { class, .. }, WagonCapacity::Passenger { class: accepted, .. }) => {
                class == accepted
            }
            (Self::Commodity { commodity, .. }, WagonCapacity::Cargo { accepts, .. }) => {
                accepts.contains(commodity)
            }
            _ => false,
        }
    }
}

/// A collectible card owned by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique asset identifier.
    pub id: AssetId,
    /// Display name.
    pub name: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Type-specific statistics.
    pub stats: CardStats,
}

impl Card {
    /// Category derived from the statistics payload.
    pub fn kind(&self) -> CardKind {
        match self.stats {
            CardStats::Locomotive { .. } => CardKind::Locomotive,
            CardStats::Conductor { .. } => CardKind::Conductor,
            CardStats::Wagon(_) => CardKind::Wagon,
            CardStats::Loadable(_) => CardKind::Loadable,
        }
    }

    /// Rail car statistics, when this card is a wagon.
    pub fn wagon(&self) -> Option<&WagonStats> {
        match &self.stats {
            CardStats::Wagon(stats) => Some(stats),
            _ => None,
        }
    }

    /// Load statistics, when this card is a loadable.
    pub fn loadable(&self) -> Option<&LoadableStats> {
        match &self.stats {
            CardStats::Loadable(stats) => Some(stats),
            _ => None,
        }
    }

    /// Conductor level, when this card is a conductor.
    pub fn conductor_level(&self) -> Option<u32> {
        match self.stats {
            CardStats::Conductor { level, .. } => Some(level),
            _ => None,
        }
    }

    /// Weight this card adds to a train.
    pub fn weight(&self) -> u32 {
        match &self.stats {
            CardStats::Locomotive { weight, .. } => *weight,
            CardStats::Conductor { .. } => 0,
            CardStats::Wagon(stats) => stats.weight,
            CardStats::Loadable(stats) => stats.weight(),
        }
    }

    /// Short label combining name and identity.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.id)
    }
}
