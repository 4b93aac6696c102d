use serde::{Deserialize, Serialize};

use super::{AssetId, Card, CardStats, LoadableStats, WagonCapacity};

/// A rail car together with the loads it currently carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailCar {
    /// The wagon card.
    pub car: Card,
    /// Loaded commodities or passengers, in boarding order.
    #[serde(default)]
    pub loads: Vec<Card>,
}

/// Seat or volume usage of a single rail car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utilization {
    /// Passenger car seat usage.
    Seats {
        /// Occupied seats.
        used: u32,
        /// Rated seat count.
        max: u32,
    },
    /// Cargo car volume usage.
    Volume {
        /// Loaded volume.
        used: u32,
        /// Rated volume.
        max: u32,
    },
    /// The car has no recognised carrying type.
    Unsupported,
}

impl Utilization {
    /// Whether usage stays within the rated maximum.
    pub fn within_capacity(&self) -> bool {
        match *self {
            Self::Seats { used, max } | Self::Volume { used, max } => used <= max,
            Self::Unsupported => true,
        }
    }
}

impl RailCar {
    /// Wrap an empty wagon.
    pub fn empty(car: Card) -> Self {
        Self {
            car,
            loads: Vec::new(),
        }
    }

    /// Carrying capacity of the wagon.
    pub fn capacity(&self) -> WagonCapacity {
        self.car
            .wagon()
            .map(|stats| stats.capacity)
            .unwrap_or_default()
    }

    /// Current seat or volume usage.
    pub fn utilization(&self) -> Utilization {
        match self.capacity() {
            WagonCapacity::Passenger { seats, .. } => Utilization::Seats {
                used: self
                    .loads
                    .iter()
                    .filter(|load| matches!(load.loadable(), Some(LoadableStats::Passenger { .. })))
                    .count() as u32,
                max: seats,
            },
            WagonCapacity::Cargo { volume, .. } => Utilization::Volume {
                used: self
                    .loads
                    .iter()
                    .filter_map(|load| match load.loadable() {
                        Some(LoadableStats::Commodity { volume, .. }) => Some(*volume),
                        _ => None,
                    })
                    .fold(0, u32::saturating_add),
                max: volume,
            },
            WagonCapacity::Unsupported => Utilization::Unsupported,
        }
    }

    /// Weight of the car plus everything loaded into it, saturating at `u32::MAX`.
    pub fn weight(&self) -> u32 {
        self.loads
            .iter()
            .map(Card::weight)
            .fold(self.car.weight(), u32::saturating_add)
    }
}

/// Snapshot of a train's derived statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrainStats {
    /// Locomotive, cars and loads combined.
    pub total_weight: u32,
    /// Hauling power of the locomotive, or zero without one.
    pub max_weight: u32,
    /// Number of rail cars attached.
    pub car_count: u32,
    /// Rail car slots the train may use.
    pub slot_count: u32,
    /// Locomotive speed, or zero without one.
    pub speed: u32,
}

/// A player's train composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    /// Unique train name within the player's account.
    pub name: String,
    /// Equipped conductor.
    #[serde(default)]
    pub conductor: Option<Card>,
    /// Equipped locomotive.
    #[serde(default)]
    pub locomotive: Option<Card>,
    /// Attached rail cars in coupling order.
    #[serde(default)]
    pub cars: Vec<RailCar>,
    /// Rail car slots granted by the train itself.
    pub base_slots: u32,
    /// Additional purchased slots.
    #[serde(default)]
    pub extra_slots: u32,
}

impl Train {
    /// Empty train with the given slot allowance.
    pub fn new(name: impl Into<String>, base_slots: u32) -> Self {
        Self {
            name: name.into(),
            conductor: None,
            locomotive: None,
            cars: Vec::new(),
            base_slots,
            extra_slots: 0,
        }
    }

    /// Total rail car slots available.
    pub fn slot_count(&self) -> u32 {
        self.base_slots.saturating_add(self.extra_slots)
    }

    /// Weight of the whole composition, saturating at `u32::MAX`.
    pub fn total_weight(&self) -> u32 {
        let locomotive = self.locomotive.as_ref().map(Card::weight).unwrap_or(0);
        self.cars
            .iter()
            .map(RailCar::weight)
            .fold(locomotive, u32::saturating_add)
    }

    /// Maximum weight the locomotive can haul.
    pub fn max_weight(&self) -> u32 {
        match self.locomotive.as_ref().map(|card| &card.stats) {
            Some(CardStats::Locomotive { hauling_power, .. }) => *hauling_power,
            _ => 0,
        }
    }

    /// Conductor level the locomotive requires, if a locomotive is equipped.
    pub fn conductor_threshold(&self) -> Option<u32> {
        match self.locomotive.as_ref().map(|card| &card.stats) {
            Some(CardStats::Locomotive {
                conductor_threshold,
                ..
            }) => Some(*conductor_threshold),
            _ => None,
        }
    }

    /// Derived statistics.
    pub fn stats(&self) -> TrainStats {
        let speed = match self.locomotive.as_ref().map(|card| &card.stats) {
            Some(CardStats::Locomotive { speed, .. }) => *speed,
            _ => 0,
        };
        TrainStats {
            total_weight: self.total_weight(),
            max_weight: self.max_weight(),
            car_count: self.cars.len() as u32,
            slot_count: self.slot_count(),
            speed,
        }
    }

    /// Find an attached rail car by its wagon identity.
    pub fn car(&self, id: AssetId) -> Option<&RailCar> {
        self.cars.iter().find(|slot| slot.car.id == id)
    }

    /// Mutable access to an attached rail car.
    pub fn car_mut(&mut self, id: AssetId) -> Option<&mut RailCar> {
        self.cars.iter_mut().find(|slot| slot.car.id == id)
    }

    /// Whether the card occupies any slot of this train.
    pub fn holds(&self, id: AssetId) -> bool {
        self.conductor.as_ref().is_some_and(|card| card.id == id)
            || self.locomotive.as_ref().is_some_and(|card| card.id == id)
            || self
                .cars
                .iter()
                .any(|slot| slot.car.id == id || slot.loads.iter().any(|load| load.id == id))
    }

    /// Identities of every card on the train.
    pub fn card_ids(&self) -> Vec<AssetId> {
        let mut ids = Vec::new();
        ids.extend(self.conductor.as_ref().map(|card| card.id));
        ids.extend(self.locomotive.as_ref().map(|card| card.id));
        for slot in &self.cars {
            ids.push(slot.car.id);
            ids.extend(slot.loads.iter().map(|load| load.id));
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use crate::models::{CommodityType, PassengerClass};

    #[test]
    fn weight_sums_locomotive_cars_and_loads() {
        let mut train = Train::new("Alpha", 3);
        train.locomotive = Some(locomotive(1, 900, 1));
        let mut car = RailCar::empty(cargo_car(2, 100, [CommodityType::Ore, CommodityType::Grain]));
        car.loads.push(commodity(3, CommodityType::Ore, 40, 25));
        car.loads.push(commodity(4, CommodityType::Grain, 30, 15));
        train.cars.push(car);

        let stats = train.stats();
        assert_eq!(stats.total_weight, 10 + 25 + 15);
        assert_eq!(stats.max_weight, 900);
        assert_eq!(stats.car_count, 1);
        assert_eq!(stats.slot_count, 3);
    }

    #[test]
    fn huge_weights_saturate() {
        let mut train = Train::new("Heavy", 1);
        let mut engine = locomotive(1, 900, 1);
        if let CardStats::Locomotive { weight, .. } = &mut engine.stats {
            *weight = u32::MAX;
        }
        train.locomotive = Some(engine);
        let mut car = RailCar::empty(cargo_car(2, 100, [CommodityType::Ore, CommodityType::Grain]));
        car.loads.push(commodity(3, CommodityType::Ore, 10, u32::MAX));
        assert_eq!(car.weight(), u32::MAX);
        train.cars.push(car);

        assert_eq!(train.total_weight(), u32::MAX);
    }

    #[test]
    fn utilization_counts_seats_and_volume() {
        let mut coach = RailCar::empty(passenger_car(1, 2, PassengerClass::Tourist));
        coach.loads.push(passenger(2, PassengerClass::Tourist));
        coach.loads.push(passenger(3, PassengerClass::Tourist));
        coach.loads.push(passenger(4, PassengerClass::Tourist));
        assert_eq!(coach.utilization(), Utilization::Seats { used: 3, max: 2 });
        assert!(!coach.utilization().within_capacity());

        let mut hopper = RailCar::empty(cargo_car(5, 100, [CommodityType::Ore, CommodityType::Gas]));
        hopper.loads.push(commodity(6, CommodityType::Ore, 60, 1));
        hopper.loads.push(commodity(7, CommodityType::Gas, 40, 1));
        assert_eq!(hopper.utilization(), Utilization::Volume { used: 100, max: 100 });
        assert!(hopper.utilization().within_capacity());
    }

    #[test]
    fn holds_checks_every_slot() {
        let mut train = Train::new("Alpha", 2);
        train.conductor = Some(conductor(1, 3));
        let mut car = RailCar::empty(cargo_car(2, 10, [CommodityType::Ore, CommodityType::Ore]));
        car.loads.push(commodity(3, CommodityType::Ore, 1, 1));
        train.cars.push(car);

        assert!(train.holds(AssetId(1)));
        assert!(train.holds(AssetId(2)));
        assert!(train.holds(AssetId(3)));
        assert!(!train.holds(AssetId(4)));
        assert_eq!(train.card_ids(), vec![AssetId(1), AssetId(2), AssetId(3)]);
    }
}
