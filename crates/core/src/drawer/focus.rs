use crate::models::AssetId;

/// Selected card position within one group.
///
/// The focus index is always an integer within `[0, len - 1]`. The animated index is
/// owned by the renderer and only stored here for reading.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusManager {
    cards: Vec<AssetId>,
    index: usize,
    animated_index: f64,
}

impl FocusManager {
    /// Focus over `cards`, starting at the clamped `hint` or the middle card.
    pub fn new(cards: Vec<AssetId>, hint: Option<usize>) -> Self {
        let mut focus = Self {
            index: 0,
            animated_index: 0.0,
            cards,
        };
        focus.index = match hint {
            Some(hint) => focus.clamp(hint),
            None => focus.cards.len() / 2,
        };
        focus.index = focus.clamp(focus.index);
        focus.animated_index = focus.index as f64;
        focus
    }

    /// Current focus index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Largest valid index, or zero for an empty group.
    pub fn max_index(&self) -> usize {
        self.cards.len().saturating_sub(1)
    }

    /// Number of cards in the group.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the group is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Move one card forward; stays put at the last card.
    pub fn next(&mut self) -> usize {
        self.index = self.clamp(self.index.saturating_add(1));
        self.index
    }

    /// Move one card back; stays put at the first card.
    pub fn prev(&mut self) -> usize {
        self.index = self.clamp(self.index.saturating_sub(1));
        self.index
    }

    /// Focus the nearest valid integer position to `index`.
    pub fn set(&mut self, index: f64) -> usize {
        let rounded = if index.is_nan() || index <= 0.0 {
            0
        } else {
            index.round() as usize
        };
        self.index = self.clamp(rounded);
        self.index
    }

    /// Identity of the focused card, or `None` for an empty group.
    pub fn card(&self) -> Option<AssetId> {
        self.cards.get(self.index).copied()
    }

    /// Interpolated position last reported by the renderer.
    pub fn animated_index(&self) -> f64 {
        self.animated_index
    }

    /// Record the renderer's interpolated position.
    pub fn set_animated_index(&mut self, value: f64) {
        self.animated_index = value;
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.max_index())
    }
}
