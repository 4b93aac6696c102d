use std::{cell::Cell, collections::HashMap, rc::Rc};

use tracing::debug;

use crate::models::{AssetId, Card};

/// Reusable view-model of one card.
///
/// The pool hands out the same `Rc` for a given identity until it is cleared, so
/// observers attached to a view keep seeing it across re-renders.
#[derive(Debug)]
pub struct CardView {
    card: Card,
    visible: Cell<bool>,
    destroyed: Cell<bool>,
}

impl CardView {
    fn new(card: Card) -> Self {
        Self {
            card,
            visible: Cell::new(true),
            destroyed: Cell::new(false),
        }
    }

    /// Card shown by this view.
    pub fn card(&self) -> &Card {
        &self.card
    }

    /// Identity of the card shown by this view.
    pub fn id(&self) -> AssetId {
        self.card.id
    }

    /// Whether the renderer should draw this view.
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Set renderer visibility.
    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    /// Whether the pool evicted this view.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

/// Identity-keyed registry of card views for one drawer session.
#[derive(Debug, Default)]
pub struct CardPool {
    views: HashMap<AssetId, Rc<CardView>>,
}

impl CardPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing view for `id`, if any.
    pub fn get(&self, id: AssetId) -> Option<Rc<CardView>> {
        self.views.get(&id).cloned()
    }

    /// Existing view for the card, or a newly registered one.
    pub fn get_or_create(&mut self, card: &Card) -> Rc<CardView> {
        self.views
            .entry(card.id)
            .or_insert_with(|| Rc::new(CardView::new(card.clone())))
            .clone()
    }

    /// Destroy every pooled view.
    pub fn clear(&mut self) {
        if self.views.is_empty() {
            return;
        }
        debug!(views = self.views.len(), "Clearing card pool");
        for (_, view) in self.views.drain() {
            view.destroyed.set(true);
            view.visible.set(false);
        }
    }

    /// Hide every pooled view until [`CardPool::show_all`] runs on the next frame.
    pub fn hide_all(&self) {
        for view in self.views.values() {
            view.set_visible(false);
        }
    }

    /// Make every pooled view visible again.
    pub fn show_all(&self) {
        for view in self.views.values() {
            view.set_visible(true);
        }
    }

    /// Number of live views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the pool holds no views.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;

    #[test]
    fn same_identity_returns_same_view() {
        let mut pool = CardPool::new();
        let first = pool.get_or_create(&conductor(1, 2));
        let again = pool.get_or_create(&conductor(1, 2));
        assert!(Rc::ptr_eq(&first, &again));
        assert!(Rc::ptr_eq(&first, &pool.get(AssetId(1)).unwrap()));
        assert!(pool.get(AssetId(2)).is_none());
    }

    #[test]
    fn clear_destroys_and_recreates() {
        let mut pool = CardPool::new();
        let first = pool.get_or_create(&conductor(1, 2));
        pool.clear();
        assert!(first.is_destroyed());
        assert!(pool.is_empty());

        let fresh = pool.get_or_create(&conductor(1, 2));
        assert!(!Rc::ptr_eq(&first, &fresh));
        assert!(!fresh.is_destroyed());
    }

    #[test]
    fn hide_then_show_toggles_visibility() {
        let mut pool = CardPool::new();
        let view = pool.get_or_create(&conductor(1, 2));
        pool.hide_all();
        assert!(!view.is_visible());
        pool.show_all();
        assert!(view.is_visible());
    }
}
