use crate::models::{Card, CardKind, Rarity};

/// Whether a card is currently used by one of the player's trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipStatus {
    /// On a train or loaded into a rail car.
    Equipped,
    /// Free to equip.
    Available,
}

/// Client-side inventory filter. Every set criterion must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    /// Equip status criterion.
    pub status: Option<EquipStatus>,
    /// Card kind criterion.
    pub kind: Option<CardKind>,
    /// Rarity criterion.
    pub rarity: Option<Rarity>,
}

impl InventoryFilter {
    /// Filter matching every card.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equip status criterion.
    pub fn with_status(mut self, status: EquipStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a kind criterion.
    pub fn with_kind(mut self, kind: CardKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add a rarity criterion.
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Whether `card` passes; `equipped` tells whether any train uses it.
    pub fn matches(&self, card: &Card, equipped: bool) -> bool {
        let status = if equipped {
            EquipStatus::Equipped
        } else {
            EquipStatus::Available
        };
        self.status.map_or(true, |wanted| wanted == status)
            && self.kind.map_or(true, |wanted| wanted == card.kind())
            && self.rarity.map_or(true, |wanted| wanted == card.rarity)
    }

    /// Whether no criterion is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
