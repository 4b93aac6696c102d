//! Card drawer: the train-composition editing workflow.
//!
//! The [`Drawer`] owns the current [`DrawerState`], the unsaved working train and the
//! pooled card views. Every transition goes through [`Drawer::set_state`], which
//! rebuilds the [`CardGroup`]s the renderer consumes and broadcasts [`DrawerEvent`]s.

mod commit;
mod error;
mod filter;
mod focus;
mod groups;
mod pool;
mod query;
mod state;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::account::{CardSource, CompositionStore};
use crate::models::{AssetId, Card, CardKind, RailCar, Train, TrainStats};

pub use commit::{commit, validate, CommitOutcome, ValidationError};
pub use error::DrawerError;
pub use filter::{EquipStatus, InventoryFilter};
pub use focus::FocusManager;
pub use groups::{CardGroup, GroupKey, SlotFlags};
pub use pool::{CardPool, CardView};
pub use query::{equipped_on, unequipped_cards};
pub use state::{DrawerState, ResumeFocus, StateKind};

use groups::{build_groups, GroupContext};

const EVENT_CAPACITY: usize = 64;

/// How the renderer should present a rebuilt group list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Do not hand the groups to the renderer.
    Skip,
    /// Swap groups at once. Pooled views are hidden and must be shown on the next frame.
    Immediate,
    /// Cross-fade from the previous groups.
    CrossFade,
}

/// Preview of a train with a candidate card swapped in.
#[derive(Debug, Clone, PartialEq)]
pub struct HypotheticalPreview {
    /// The disposable preview train.
    pub train: Train,
    /// Statistics of the unsaved train.
    pub baseline: TrainStats,
    /// Statistics of the preview train.
    pub preview: TrainStats,
}

/// Notifications broadcast to drawer observers.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawerEvent {
    /// A transition finished.
    StateChanged(StateKind),
    /// A preview was produced, or cleared with `None`.
    Hypothetical(Option<HypotheticalPreview>),
    /// Groups were rebuilt and should be presented.
    Render(RenderMode),
    /// User-facing warning, such as a rejected commit.
    Warning(String),
    /// A composition was persisted.
    Committed {
        /// Name of the committed train.
        train: String,
    },
}

/// What a confirm action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// No confirm subscription was active.
    Ignored,
    /// The drawer moved back to an overview.
    Returned(StateKind),
    /// A commit was attempted.
    Commit(CommitOutcome),
}

/// Interactive card drawer over a data source `S` and persistence store `P`.
pub struct Drawer<S, P> {
    source: S,
    store: P,
    state: DrawerState,
    unsaved: Option<Train>,
    hypothetical: Option<Train>,
    groups: Vec<CardGroup>,
    pool: CardPool,
    filter: InventoryFilter,
    has_unsaved_diff: bool,
    animate: bool,
    confirm_armed: bool,
    on_leave: Vec<Box<dyn FnOnce()>>,
    events: broadcast::Sender<DrawerEvent>,
}

impl<S, P> Drawer<S, P>
where
    S: CardSource,
    P: CompositionStore,
{
    /// Closed drawer over the given collaborators.
    pub fn new(source: S, store: P) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            store,
            state: DrawerState::Closed,
            unsaved: None,
            hypothetical: None,
            groups: Vec::new(),
            pool: CardPool::new(),
            filter: InventoryFilter::default(),
            has_unsaved_diff: false,
            animate: true,
            confirm_armed: false,
            on_leave: Vec::new(),
            events,
        }
    }

    /// Choose between cross-fades and immediate redraws for user-driven transitions.
    pub fn with_animation(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    /// Receive future drawer events.
    pub fn subscribe(&self) -> broadcast::Receiver<DrawerEvent> {
        self.events.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> &DrawerState {
        &self.state
    }

    /// Groups for the current state, in display order.
    pub fn groups(&self) -> &[CardGroup] {
        &self.groups
    }

    /// Group with the given key, if the current state shows it.
    pub fn group(&self, key: GroupKey) -> Option<&CardGroup> {
        self.groups.iter().find(|group| group.key == key)
    }

    /// Mutable group access, used by the renderer to move the focus.
    pub fn group_mut(&mut self, key: GroupKey) -> Option<&mut CardGroup> {
        self.groups.iter_mut().find(|group| group.key == key)
    }

    /// Working copy of the train being edited.
    pub fn unsaved(&self) -> Option<&Train> {
        self.unsaved.as_ref()
    }

    /// Current preview train, if a candidate is hovered.
    pub fn hypothetical(&self) -> Option<&Train> {
        self.hypothetical.as_ref()
    }

    /// Whether the working train differs from the persisted target train.
    pub fn has_unsaved_diff(&self) -> bool {
        self.has_unsaved_diff
    }

    /// Pooled card views.
    pub fn pool(&self) -> &CardPool {
        &self.pool
    }

    /// Data source collaborator.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Active inventory filter.
    pub fn filter(&self) -> InventoryFilter {
        self.filter
    }

    /// Replace the inventory filter, refreshing the inventory when it is shown.
    pub fn set_filter(&mut self, filter: InventoryFilter) -> Result<(), DrawerError> {
        self.filter = filter;
        if self.state == DrawerState::Inventory {
            self.refresh(RenderMode::Immediate)?;
        }
        Ok(())
    }

    /// Register a callback run once when the current state is left.
    pub fn on_leave(&mut self, callback: impl FnOnce() + 'static) {
        self.on_leave.push(Box::new(callback));
    }

    /// Whether a confirm action is currently subscribed.
    pub fn confirm_armed(&self) -> bool {
        self.confirm_armed
    }

    /// Open the inventory browser.
    pub fn open_inventory(&mut self) -> Result<(), DrawerError> {
        self.set_state(DrawerState::Inventory, self.transition_mode())
    }

    /// Start editing the composition of `train`.
    pub fn open_composition(&mut self, train: impl Into<String>) -> Result<(), DrawerError> {
        let train = train.into();
        self.set_state(DrawerState::CompositionOverview { train }, self.transition_mode())
    }

    /// Start editing the loadout of `train`.
    pub fn open_loadout(&mut self, train: impl Into<String>) -> Result<(), DrawerError> {
        let train = train.into();
        self.set_state(DrawerState::LoadoutOverview { train }, self.transition_mode())
    }

    /// Close the drawer, discarding unsaved edits and pooled views.
    pub fn close(&mut self) -> Result<(), DrawerError> {
        self.set_state(DrawerState::Closed, RenderMode::Skip)
    }

    /// Rebuild the current state's groups. Without animation the pool starts over.
    pub fn rebuild(&mut self, animate: bool) -> Result<(), DrawerError> {
        if animate {
            self.refresh(RenderMode::CrossFade)
        } else {
            self.pool.clear();
            self.refresh(RenderMode::Immediate)
        }
    }

    /// Re-enter the current state in place.
    pub fn refresh(&mut self, render: RenderMode) -> Result<(), DrawerError> {
        self.set_state(self.state.clone(), render)
    }

    /// Replace the state wholesale.
    ///
    /// Runs and clears on-leave callbacks, cancels the confirm subscription, drops the
    /// preview, rebuilds the groups, signals the renderer, recomputes the unsaved-diff
    /// flag and notifies observers. If the new groups cannot be built the drawer is left
    /// exactly as it was.
    pub fn set_state(&mut self, next: DrawerState, render: RenderMode) -> Result<(), DrawerError> {
        let working = self.working_train_for(&next)?;
        self.enter(next, working, render)
    }

    fn working_train_for(&self, next: &DrawerState) -> Result<Option<Train>, DrawerError> {
        let Some(name) = next.target_train() else {
            return Ok(None);
        };
        match &self.unsaved {
            Some(train) if train.name == name => Ok(Some(train.clone())),
            _ => self
                .source
                .train(name)
                .map(Some)
                .ok_or_else(|| DrawerError::TrainNotFound(name.to_string())),
        }
    }

    fn enter(
        &mut self,
        next: DrawerState,
        working: Option<Train>,
        render: RenderMode,
    ) -> Result<(), DrawerError> {
        debug!(from = ?self.state.kind(), to = ?next.kind(), ?render, "Drawer transition");

        if next == DrawerState::Closed {
            self.pool.clear();
        }
        let groups = build_groups(
            &next,
            GroupContext {
                source: &self.source,
                unsaved: working.as_ref(),
                pool: &mut self.pool,
                filter: &self.filter,
            },
        )?;

        for callback in self.on_leave.drain(..) {
            callback();
        }
        self.confirm_armed = false;
        self.clear_hypothetical();

        self.unsaved = working;
        self.state = next;
        self.groups = groups;

        match render {
            RenderMode::Skip => {}
            RenderMode::Immediate => {
                self.pool.hide_all();
                self.emit(DrawerEvent::Render(RenderMode::Immediate));
            }
            RenderMode::CrossFade => self.emit(DrawerEvent::Render(RenderMode::CrossFade)),
        }

        self.has_unsaved_diff = match self.state.target_train() {
            Some(name) => self.source.train(name).as_ref() != self.unsaved.as_ref(),
            None => false,
        };

        self.confirm_armed =
            self.state.confirm_destination().is_some() || self.state.confirm_commits();
        self.emit(DrawerEvent::StateChanged(self.state.kind()));
        Ok(())
    }

    /// Handle a click on a card (`Some(index)`) or on a group itself (`None`).
    pub fn activate(&mut self, key: GroupKey, index: Option<usize>) -> Result<(), DrawerError> {
        let group = self.group(key).ok_or(DrawerError::NoSuchGroup(key))?;
        let card = match index {
            Some(index) if !group.flags(index).enabled => return Ok(()),
            Some(index) => group.card(index).cloned(),
            None => None,
        };
        let mode = self.transition_mode();

        match (self.state.clone(), key) {
            (DrawerState::CompositionOverview { train }, GroupKey::Conductor) => {
                self.set_state(DrawerState::ChangeConductor { train }, mode)
            }
            (DrawerState::CompositionOverview { train }, GroupKey::Locomotive) => {
                self.set_state(DrawerState::ChangeLocomotive { train }, mode)
            }
            (DrawerState::CompositionOverview { train }, GroupKey::Railcars) => {
                self.set_state(DrawerState::ChangeRailcars { train }, mode)
            }
            (DrawerState::LoadoutOverview { train }, GroupKey::Loadout) => match card {
                Some(car) => self.set_state(
                    DrawerState::ChangeCommodities {
                        train,
                        railcar: car.id,
                        resume_focus: None,
                    },
                    mode,
                ),
                None => Ok(()),
            },
            (DrawerState::ChangeConductor { .. }, _) => {
                self.swap_slot(CardKind::Conductor, key, card)
            }
            (DrawerState::ChangeLocomotive { .. }, _) => {
                self.swap_slot(CardKind::Locomotive, key, card)
            }
            (DrawerState::ChangeRailcars { .. }, _) => self.change_railcars(key, index, card),
            (
                DrawerState::ChangeCommodities {
                    train, railcar, ..
                },
                _,
            ) => self.change_commodities(train, railcar, key, index, card),
            _ => Ok(()),
        }
    }

    /// Handle the pointer entering (`Some(index)`) or leaving (`None`) a card.
    pub fn hover(&mut self, key: GroupKey, index: Option<usize>) -> Result<(), DrawerError> {
        let candidate = match (key, index) {
            (GroupKey::Unequipped, Some(index)) => self
                .group(key)
                .ok_or(DrawerError::NoSuchGroup(key))?
                .card(index)
                .cloned(),
            _ => None,
        };

        let preview = match (&self.state, candidate) {
            (DrawerState::ChangeConductor { .. }, Some(card)) => {
                Some(self.preview_with(|train| train.conductor = Some(card))?)
            }
            (DrawerState::ChangeLocomotive { .. }, Some(card)) => {
                Some(self.preview_with(|train| train.locomotive = Some(card))?)
            }
            (DrawerState::ChangeRailcars { .. }, Some(card)) => {
                Some(self.preview_with(|train| train.cars.push(RailCar::empty(card)))?)
            }
            _ => None,
        };

        match preview {
            Some(preview) => {
                self.hypothetical = Some(preview.train.clone());
                self.emit(DrawerEvent::Hypothetical(Some(preview)));
            }
            None => self.clear_hypothetical(),
        }
        Ok(())
    }

    /// Deliver the confirm input to the active state.
    ///
    /// In a change state this returns to the matching overview. In an overview it
    /// validates and commits the working train; a rejected or failed commit leaves the
    /// working train untouched and keeps the confirm subscription active.
    pub async fn confirm(&mut self) -> Result<ConfirmOutcome, DrawerError> {
        if !self.confirm_armed {
            return Ok(ConfirmOutcome::Ignored);
        }
        self.confirm_armed = false;

        if let Some(next) = self.state.confirm_destination() {
            let kind = next.kind();
            self.set_state(next, self.transition_mode())?;
            return Ok(ConfirmOutcome::Returned(kind));
        }
        if !self.state.confirm_commits() {
            return Ok(ConfirmOutcome::Ignored);
        }

        let edited = self.unsaved.clone().ok_or(DrawerError::NoUnsavedTrain)?;
        let outcome = match commit(&self.source, &self.store, &edited).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(train = %edited.name, "Commit failed: {err}");
                self.confirm_armed = true;
                return Err(err);
            }
        };

        match &outcome {
            CommitOutcome::Rejected(violation) => {
                self.emit(DrawerEvent::Warning(violation.to_string()));
                self.confirm_armed = true;
            }
            CommitOutcome::Unchanged => self.close()?,
            CommitOutcome::Persisted => {
                info!(train = %edited.name, "Leaving editor after commit");
                self.emit(DrawerEvent::Committed {
                    train: edited.name.clone(),
                });
                self.close()?;
            }
        }
        Ok(ConfirmOutcome::Commit(outcome))
    }

    fn swap_slot(
        &mut self,
        kind: CardKind,
        key: GroupKey,
        card: Option<Card>,
    ) -> Result<(), DrawerError> {
        let mut edited = self.unsaved.clone().ok_or(DrawerError::NoUnsavedTrain)?;
        let slot = match kind {
            CardKind::Conductor => &mut edited.conductor,
            _ => &mut edited.locomotive,
        };
        match (key, card) {
            (GroupKey::Unequipped, Some(card)) => *slot = Some(card),
            (GroupKey::Equipped, Some(_)) => *slot = None,
            _ => return Ok(()),
        }
        self.enter(self.state.clone(), Some(edited), RenderMode::Immediate)
    }

    fn change_railcars(
        &mut self,
        key: GroupKey,
        index: Option<usize>,
        card: Option<Card>,
    ) -> Result<(), DrawerError> {
        let mut edited = self.unsaved.clone().ok_or(DrawerError::NoUnsavedTrain)?;
        match (key, index, card) {
            (GroupKey::Equipped, Some(index), Some(_)) if index < edited.cars.len() => {
                edited.cars.remove(index);
            }
            (GroupKey::Unequipped, _, Some(card)) => edited.cars.push(RailCar::empty(card)),
            _ => return Ok(()),
        }
        self.enter(self.state.clone(), Some(edited), RenderMode::Immediate)
    }

    fn change_commodities(
        &mut self,
        train: String,
        railcar: AssetId,
        key: GroupKey,
        index: Option<usize>,
        card: Option<Card>,
    ) -> Result<(), DrawerError> {
        let Some(card) = card else {
            return Ok(());
        };
        let mut edited = self.unsaved.clone().ok_or(DrawerError::NoUnsavedTrain)?;
        let slot = edited
            .car_mut(railcar)
            .ok_or(DrawerError::RailCarNotFound(railcar))?;

        let resume_focus = match (key, index) {
            (GroupKey::Unequipped, _) => {
                slot.loads.push(card);
                Some(ResumeFocus {
                    group: GroupKey::Equipped,
                    index: slot.loads.len() - 1,
                })
            }
            (GroupKey::Equipped, Some(index)) if index < slot.loads.len() => {
                let removed = slot.loads.remove(index);
                let available = unequipped_cards(&self.source, CardKind::Loadable, &edited)?;
                let capacity = edited
                    .car(railcar)
                    .map(RailCar::capacity)
                    .unwrap_or_default();
                available
                    .iter()
                    .filter(|card| card.loadable().is_some_and(|stats| stats.fits(&capacity)))
                    .position(|card| card.id == removed.id)
                    .map(|index| ResumeFocus {
                        group: GroupKey::Unequipped,
                        index,
                    })
            }
            _ => return Ok(()),
        };

        self.enter(
            DrawerState::ChangeCommodities {
                train,
                railcar,
                resume_focus,
            },
            Some(edited),
            RenderMode::Immediate,
        )
    }

    fn preview_with(
        &self,
        apply: impl FnOnce(&mut Train),
    ) -> Result<HypotheticalPreview, DrawerError> {
        let unsaved = self.unsaved.as_ref().ok_or(DrawerError::NoUnsavedTrain)?;
        let mut train = unsaved.clone();
        apply(&mut train);
        Ok(HypotheticalPreview {
            baseline: unsaved.stats(),
            preview: train.stats(),
            train,
        })
    }

    fn clear_hypothetical(&mut self) {
        self.hypothetical = None;
        self.emit(DrawerEvent::Hypothetical(None));
    }

    fn transition_mode(&self) -> RenderMode {
        if self.animate {
            RenderMode::CrossFade
        } else {
            RenderMode::Immediate
        }
    }

    fn emit(&self, event: DrawerEvent) {
        // No receivers is fine; observers are optional.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::account::{CompositionUpdate, Roster, StoreError};
    use crate::models::fixtures::*;
    use crate::models::{CardStats, CommodityType, PassengerClass, WagonCapacity, WagonStats};

    #[derive(Clone, Default)]
    struct RecordingStore {
        updates: Rc<RefCell<Vec<CompositionUpdate>>>,
        fail: bool,
    }

    impl CompositionStore for RecordingStore {
        async fn update_composition(&self, update: &CompositionUpdate) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Rejected("server unavailable".to_string()));
            }
            self.updates.borrow_mut().push(update.clone());
            Ok(())
        }
    }

    fn roster() -> Roster {
        let mut alpha = Train::new("Alpha", 2);
        alpha.conductor = Some(conductor(1, 5));
        alpha.locomotive = Some(locomotive(3, 900, 3));
        let mut hopper = RailCar::empty(cargo_car(5, 100, [CommodityType::Ore, CommodityType::Grain]));
        hopper.loads.push(commodity(8, CommodityType::Ore, 30, 5));
        alpha.cars.push(hopper);

        let mut beta = Train::new("Beta", 1);
        beta.conductor = Some(conductor(2, 2));
        beta.locomotive = Some(locomotive(4, 600, 1));

        Roster::new(
            "alice",
            vec![
                conductor(1, 5),
                conductor(2, 2),
                locomotive(3, 900, 3),
                locomotive(4, 600, 1),
                cargo_car(5, 100, [CommodityType::Ore, CommodityType::Grain]),
                cargo_car(6, 50, [CommodityType::Gas, CommodityType::Liquid]),
                passenger_car(7, 2, PassengerClass::Commuter),
                commodity(8, CommodityType::Ore, 30, 5),
                commodity(9, CommodityType::Grain, 80, 5),
                commodity(10, CommodityType::Gas, 10, 2),
                passenger(11, PassengerClass::Commuter),
                conductor(13, 4),
                locomotive(14, 1200, 6),
                commodity(15, CommodityType::Ore, 5, 1),
            ],
            vec![alpha, beta],
        )
    }

    fn unsupported_car(id: u64) -> Card {
        let mut card = cargo_car(id, 10, [CommodityType::Ore, CommodityType::Ore]);
        card.stats = CardStats::Wagon(WagonStats {
            weight: 10,
            capacity: WagonCapacity::Unsupported,
        });
        card
    }

    fn drawer(roster: &Roster, store: &RecordingStore) -> Drawer<Roster, RecordingStore> {
        Drawer::new(roster.clone(), store.clone())
    }

    fn ids(group: &CardGroup) -> Vec<AssetId> {
        group.cards.iter().map(|view| view.id()).collect()
    }

    fn drain(rx: &mut broadcast::Receiver<DrawerEvent>) -> Vec<DrawerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn composition_overview_shows_three_groups() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;

        let keys: Vec<_> = drawer.groups().iter().map(|group| group.key).collect();
        assert_eq!(
            keys,
            vec![GroupKey::Conductor, GroupKey::Locomotive, GroupKey::Railcars]
        );
        assert_eq!(drawer.unsaved(), roster.train("Alpha").as_ref());
        assert!(!drawer.has_unsaved_diff());
        assert!(drawer.confirm_armed());
        Ok(())
    }

    #[tokio::test]
    async fn change_state_round_trip_keeps_unsaved_train() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;
        let before = drawer.unsaved().cloned();

        drawer.activate(GroupKey::Conductor, None)?;
        assert_eq!(drawer.state().kind(), StateKind::ChangeConductor);
        let equipped = drawer.group(GroupKey::Equipped).unwrap();
        assert_eq!(ids(equipped), vec![AssetId(1)]);
        let available = drawer.group(GroupKey::Unequipped).unwrap();
        assert_eq!(ids(available), vec![AssetId(13)]);
        assert!(available.flags(0).highlighted);

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Returned(StateKind::CompositionOverview));
        assert_eq!(drawer.unsaved().cloned(), before);
        assert!(!drawer.has_unsaved_diff());
        Ok(())
    }

    #[test]
    fn equipping_swaps_slot_and_reuses_views() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Conductor, None)?;
        let candidate = drawer.pool().get(AssetId(13)).unwrap();

        drawer.activate(GroupKey::Unequipped, Some(0))?;

        let unsaved = drawer.unsaved().unwrap();
        assert_eq!(unsaved.conductor.as_ref().map(|card| card.id), Some(AssetId(13)));
        assert!(drawer.has_unsaved_diff());
        assert_eq!(
            ids(drawer.group(GroupKey::Unequipped).unwrap()),
            vec![AssetId(1)]
        );
        let equipped = drawer.group(GroupKey::Equipped).unwrap();
        assert!(Rc::ptr_eq(&equipped.cards[0], &candidate));
        // Canonical train is untouched until commit.
        assert_eq!(
            roster.train("Alpha").and_then(|train| train.conductor).map(|card| card.id),
            Some(AssetId(1))
        );
        Ok(())
    }

    #[test]
    fn hover_broadcasts_and_clears_preview() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        let mut events = drawer.subscribe();
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Locomotive, None)?;
        drain(&mut events);

        drawer.hover(GroupKey::Unequipped, Some(0))?;
        let preview = match drain(&mut events).pop() {
            Some(DrawerEvent::Hypothetical(Some(preview))) => preview,
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(preview.baseline.max_weight, 900);
        assert_eq!(preview.preview.max_weight, 1200);
        assert_eq!(
            preview.train.locomotive.as_ref().map(|card| card.id),
            Some(AssetId(14))
        );
        assert!(drawer.hypothetical().is_some());
        assert_eq!(
            drawer.unsaved().and_then(|train| train.locomotive.as_ref()).map(|card| card.id),
            Some(AssetId(3))
        );

        drawer.hover(GroupKey::Unequipped, None)?;
        assert_eq!(drain(&mut events), vec![DrawerEvent::Hypothetical(None)]);
        assert!(drawer.hypothetical().is_none());
        Ok(())
    }

    #[test]
    fn leaving_a_state_clears_preview() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Railcars, None)?;
        drawer.hover(GroupKey::Unequipped, Some(0))?;
        assert_eq!(drawer.hypothetical().map(|train| train.cars.len()), Some(2));

        drawer.refresh(RenderMode::Skip)?;
        assert!(drawer.hypothetical().is_none());
        Ok(())
    }

    #[test]
    fn on_leave_callbacks_run_once() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_inventory()?;
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        drawer.on_leave(move || counter.set(counter.get() + 1));

        drawer.refresh(RenderMode::Skip)?;
        drawer.refresh(RenderMode::Skip)?;
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_commit_warns_and_keeps_editing() -> anyhow::Result<()> {
        let roster = roster();
        let store = RecordingStore::default();
        let mut drawer = drawer(&roster, &store);
        let mut events = drawer.subscribe();
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Conductor, None)?;
        drawer.activate(GroupKey::Equipped, Some(0))?;
        drawer.confirm().await?;
        drain(&mut events);

        let outcome = drawer.confirm().await?;
        assert_eq!(
            outcome,
            ConfirmOutcome::Commit(CommitOutcome::Rejected(ValidationError::MissingConductor))
        );
        assert_eq!(
            drain(&mut events),
            vec![DrawerEvent::Warning("You must select a conductor".to_string())]
        );
        assert!(store.updates.borrow().is_empty());
        assert_eq!(drawer.state().kind(), StateKind::CompositionOverview);
        assert!(drawer.unsaved().is_some_and(|train| train.conductor.is_none()));
        assert!(drawer.confirm_armed());
        Ok(())
    }

    #[tokio::test]
    async fn valid_commit_persists_and_closes() -> anyhow::Result<()> {
        let roster = roster();
        let store = RecordingStore::default();
        let mut drawer = drawer(&roster, &store);
        let mut events = drawer.subscribe();
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Railcars, None)?;
        assert_eq!(
            ids(drawer.group(GroupKey::Unequipped).unwrap()),
            vec![AssetId(6), AssetId(7)]
        );
        drawer.activate(GroupKey::Unequipped, Some(0))?;
        drawer.confirm().await?;

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Commit(CommitOutcome::Persisted));

        let updates = store.updates.borrow();
        assert_eq!(updates.len(), 1);
        let railcars: Vec<_> = updates[0].cargo.iter().map(|entry| entry.railcar).collect();
        assert_eq!(railcars, vec![AssetId(5), AssetId(6)]);
        assert_eq!(roster.train("Alpha").map(|train| train.cars.len()), Some(2));
        assert_eq!(drawer.state(), &DrawerState::Closed);
        assert!(drawer.unsaved().is_none());
        assert!(drain(&mut events).contains(&DrawerEvent::Committed {
            train: "Alpha".to_string()
        }));
        Ok(())
    }

    #[tokio::test]
    async fn unchanged_commit_skips_persistence() -> anyhow::Result<()> {
        let roster = roster();
        let store = RecordingStore::default();
        let mut drawer = drawer(&roster, &store);
        drawer.open_composition("Alpha")?;

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Commit(CommitOutcome::Unchanged));
        assert!(store.updates.borrow().is_empty());
        assert_eq!(drawer.state(), &DrawerState::Closed);
        Ok(())
    }

    #[tokio::test]
    async fn failed_persistence_leaves_canonical_train() -> anyhow::Result<()> {
        let roster = roster();
        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let mut drawer = drawer(&roster, &store);
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Conductor, None)?;
        drawer.activate(GroupKey::Unequipped, Some(0))?;
        drawer.confirm().await?;

        let result = drawer.confirm().await;
        assert!(matches!(result, Err(DrawerError::Persistence(_))));
        assert_eq!(
            roster.train("Alpha").and_then(|train| train.conductor).map(|card| card.id),
            Some(AssetId(1))
        );
        assert_eq!(drawer.state().kind(), StateKind::CompositionOverview);
        assert!(drawer.has_unsaved_diff());
        assert!(drawer.confirm_armed());
        Ok(())
    }

    #[tokio::test]
    async fn loading_restores_focus_near_moved_card() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_loadout("Alpha")?;
        drawer.activate(GroupKey::Loadout, Some(0))?;
        assert_eq!(drawer.state().kind(), StateKind::ChangeCommodities);
        assert_eq!(
            ids(drawer.group(GroupKey::Unequipped).unwrap()),
            vec![AssetId(9), AssetId(15)]
        );

        drawer.activate(GroupKey::Unequipped, Some(1))?;
        let loaded = drawer.group(GroupKey::Equipped).unwrap();
        assert_eq!(ids(loaded), vec![AssetId(8), AssetId(15)]);
        assert_eq!(loaded.focus.index(), 1);

        drawer.activate(GroupKey::Equipped, Some(1))?;
        let available = drawer.group(GroupKey::Unequipped).unwrap();
        assert_eq!(ids(available), vec![AssetId(9), AssetId(15)]);
        assert_eq!(available.focus.index(), 1);

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Returned(StateKind::LoadoutOverview));
        Ok(())
    }

    #[test]
    fn inventory_filter_narrows_group() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_inventory()?;
        assert_eq!(drawer.groups()[0].len(), roster.cards().len());

        drawer.set_filter(
            InventoryFilter::all()
                .with_kind(CardKind::Conductor)
                .with_status(EquipStatus::Available),
        )?;
        assert_eq!(ids(&drawer.groups()[0]), vec![AssetId(13)]);
        Ok(())
    }

    #[test]
    fn close_destroys_pooled_views() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;
        let view = drawer.pool().get(AssetId(1)).unwrap();

        drawer.close()?;
        assert!(view.is_destroyed());
        assert!(drawer.pool().is_empty());
        assert!(drawer.groups().is_empty());
        assert!(!drawer.confirm_armed());
        Ok(())
    }

    #[test]
    fn rebuild_without_animation_starts_a_fresh_pool() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default()).with_animation(false);
        let mut events = drawer.subscribe();
        drawer.open_composition("Alpha")?;
        let before = drawer.pool().get(AssetId(1)).unwrap();
        assert!(!before.is_visible());
        assert!(drain(&mut events).contains(&DrawerEvent::Render(RenderMode::Immediate)));

        drawer.rebuild(false)?;
        let after = drawer.pool().get(AssetId(1)).unwrap();
        assert!(before.is_destroyed());
        assert!(!Rc::ptr_eq(&before, &after));
        Ok(())
    }

    #[tokio::test]
    async fn equipped_conductor_survives_confirm_and_reentry() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_composition("Alpha")?;
        drawer.activate(GroupKey::Conductor, None)?;
        drawer.activate(GroupKey::Unequipped, Some(0))?;

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Returned(StateKind::CompositionOverview));
        assert_eq!(
            ids(drawer.group(GroupKey::Conductor).unwrap()),
            vec![AssetId(13)]
        );

        drawer.activate(GroupKey::Conductor, None)?;
        assert_eq!(drawer.state().kind(), StateKind::ChangeConductor);
        assert_eq!(
            ids(drawer.group(GroupKey::Equipped).unwrap()),
            vec![AssetId(13)]
        );
        let available = ids(drawer.group(GroupKey::Unequipped).unwrap());
        assert!(!available.contains(&AssetId(13)));
        assert_eq!(available, vec![AssetId(1)]);
        assert!(drawer.has_unsaved_diff());
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_railcar_leaves_loadout_untouched() -> anyhow::Result<()> {
        let mut gamma = Train::new("Gamma", 2);
        gamma.conductor = Some(conductor(1, 5));
        gamma.locomotive = Some(locomotive(3, 900, 3));
        gamma.cars.push(RailCar::empty(unsupported_car(50)));
        let roster = Roster::new(
            "alice",
            vec![conductor(1, 5), locomotive(3, 900, 3), unsupported_car(50)],
            vec![gamma],
        );
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_loadout("Gamma")?;
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        drawer.on_leave(move || counter.set(counter.get() + 1));
        let mut events = drawer.subscribe();

        let result = drawer.activate(GroupKey::Loadout, Some(0));
        assert!(matches!(
            result,
            Err(DrawerError::UnsupportedRailCar(AssetId(50)))
        ));
        assert_eq!(drawer.state().kind(), StateKind::LoadoutOverview);
        assert_eq!(drawer.group(GroupKey::Loadout).map(CardGroup::len), Some(1));
        assert!(drawer.confirm_armed());
        assert_eq!(calls.get(), 0);
        assert!(drain(&mut events).is_empty());

        let outcome = drawer.confirm().await?;
        assert_eq!(outcome, ConfirmOutcome::Commit(CommitOutcome::Unchanged));
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[test]
    fn detached_railcar_cannot_be_loaded() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        drawer.open_loadout("Alpha")?;

        let result = drawer.set_state(
            DrawerState::ChangeCommodities {
                train: "Alpha".to_string(),
                railcar: AssetId(6),
                resume_focus: None,
            },
            RenderMode::Immediate,
        );
        assert!(matches!(
            result,
            Err(DrawerError::RailCarNotFound(AssetId(6)))
        ));
        assert_eq!(drawer.state().kind(), StateKind::LoadoutOverview);
        assert_eq!(drawer.unsaved(), roster.train("Alpha").as_ref());
        assert!(drawer.confirm_armed());
        Ok(())
    }

    #[test]
    fn every_transition_broadcasts_cleared_preview() -> anyhow::Result<()> {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        let mut events = drawer.subscribe();
        drawer.open_composition("Alpha")?;

        let events = drain(&mut events);
        assert_eq!(events[0], DrawerEvent::Hypothetical(None));
        assert_eq!(
            events.last(),
            Some(&DrawerEvent::StateChanged(StateKind::CompositionOverview))
        );
        Ok(())
    }

    #[test]
    fn unknown_group_and_train_are_errors() {
        let roster = roster();
        let mut drawer = drawer(&roster, &RecordingStore::default());
        assert!(matches!(
            drawer.open_composition("Gamma"),
            Err(DrawerError::TrainNotFound(_))
        ));
        assert!(drawer.open_inventory().is_ok());
        assert!(matches!(
            drawer.activate(GroupKey::Conductor, None),
            Err(DrawerError::NoSuchGroup(GroupKey::Conductor))
        ));
    }
}
