//! View-model groups derived from the drawer state.

use std::rc::Rc;

use crate::account::CardSource;
use crate::models::{AssetId, Card, CardKind, Train, Utilization, WagonCapacity};

use super::{
    filter::InventoryFilter,
    focus::FocusManager,
    pool::{CardPool, CardView},
    query::unequipped_cards,
    state::{DrawerState, ResumeFocus},
    DrawerError,
};

/// Named handle of a group shown by the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Every owned card.
    Inventory,
    /// Equipped conductor on the composition overview.
    Conductor,
    /// Equipped locomotive on the composition overview.
    Locomotive,
    /// Attached rail cars on the composition overview.
    Railcars,
    /// Attached rail cars on the loadout overview.
    Loadout,
    /// Cards currently in the slot being edited.
    Equipped,
    /// Cards available for the slot being edited.
    Unequipped,
}

/// Per-card presentation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotFlags {
    /// Draw attention to the card.
    pub highlighted: bool,
    /// The card reacts to clicks.
    pub enabled: bool,
    /// The card is in use on some train.
    pub equipped_elsewhere: bool,
}

impl SlotFlags {
    fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// One horizontally arranged set of cards, ready for the renderer.
#[derive(Debug, Clone)]
pub struct CardGroup {
    /// Handle used to route clicks and hovers back to the drawer.
    pub key: GroupKey,
    /// Group heading.
    pub title: String,
    /// Pooled card views in display order.
    pub cards: Vec<Rc<CardView>>,
    /// Flags parallel to `cards`.
    pub flags: Vec<SlotFlags>,
    /// Optional explanatory text.
    pub hint: Option<String>,
    /// Selected card position.
    pub focus: FocusManager,
}

impl CardGroup {
    fn new(
        key: GroupKey,
        title: impl Into<String>,
        cards: Vec<(Card, SlotFlags)>,
        pool: &mut CardPool,
        focus_hint: Option<usize>,
    ) -> Self {
        let focus = FocusManager::new(cards.iter().map(|(card, _)| card.id).collect(), focus_hint);
        let (views, flags): (Vec<_>, Vec<_>) = cards
            .iter()
            .map(|(card, flags)| (pool.get_or_create(card), *flags))
            .unzip();
        Self {
            key,
            title: title.into(),
            cards: views,
            flags,
            hint: None,
            focus,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Card at `index`.
    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index).map(|view| view.card())
    }

    /// Card under the focus.
    pub fn focused_card(&self) -> Option<&Card> {
        self.card(self.focus.index())
    }

    /// Flags of the card at `index`.
    pub fn flags(&self, index: usize) -> SlotFlags {
        self.flags.get(index).copied().unwrap_or_default()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the group shows no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Inputs shared by every group builder.
pub(crate) struct GroupContext<'a, S: ?Sized> {
    pub source: &'a S,
    pub unsaved: Option<&'a Train>,
    pub pool: &'a mut CardPool,
    pub filter: &'a InventoryFilter,
}

impl<'a, S: CardSource + ?Sized> GroupContext<'a, S> {
    fn unsaved(&self) -> Result<&'a Train, DrawerError> {
        self.unsaved.ok_or(DrawerError::NoUnsavedTrain)
    }
}

/// Compute the groups shown for `state`.
pub(crate) fn build_groups<S>(
    state: &DrawerState,
    ctx: GroupContext<'_, S>,
) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    match state {
        DrawerState::Closed => Ok(Vec::new()),
        DrawerState::Inventory => Ok(vec![inventory_group(ctx)]),
        DrawerState::CompositionOverview { .. } => composition_groups(ctx),
        DrawerState::ChangeConductor { .. } => slot_groups(ctx, CardKind::Conductor),
        DrawerState::ChangeLocomotive { .. } => slot_groups(ctx, CardKind::Locomotive),
        DrawerState::ChangeRailcars { .. } => railcar_groups(ctx),
        DrawerState::LoadoutOverview { .. } => loadout_groups(ctx),
        DrawerState::ChangeCommodities {
            railcar,
            resume_focus,
            ..
        } => commodity_groups(ctx, *railcar, *resume_focus),
    }
}

fn inventory_group<S>(mut ctx: GroupContext<'_, S>) -> CardGroup
where
    S: CardSource + ?Sized,
{
    let trains = ctx.source.trains();
    let mut cards: Vec<(Card, SlotFlags)> = ctx
        .source
        .cards()
        .into_iter()
        .filter_map(|card| {
            let equipped = trains.iter().any(|train| train.holds(card.id));
            ctx.filter.matches(&card, equipped).then(|| {
                let flags = SlotFlags {
                    equipped_elsewhere: equipped,
                    ..SlotFlags::enabled()
                };
                (card, flags)
            })
        })
        .collect();
    cards.sort_by_key(|(card, _)| {
        let rank = CardKind::ALL
            .iter()
            .position(|kind| *kind == card.kind())
            .unwrap_or(CardKind::ALL.len());
        (rank, card.id)
    });

    let title = format!("Inventory ({})", cards.len());
    let group = CardGroup::new(GroupKey::Inventory, title, cards, ctx.pool, None);
    if group.is_empty() {
        group.with_hint("No cards match the current filter")
    } else {
        group
    }
}

fn composition_groups<S>(mut ctx: GroupContext<'_, S>) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let train = ctx.unsaved()?;
    let single = |card: &Option<Card>| -> Vec<(Card, SlotFlags)> {
        card.iter()
            .map(|card| (card.clone(), SlotFlags::enabled()))
            .collect()
    };

    let mut conductor = CardGroup::new(
        GroupKey::Conductor,
        "Conductor",
        single(&train.conductor),
        ctx.pool,
        None,
    );
    if conductor.is_empty() {
        conductor = conductor.with_hint("No conductor · select to choose one");
    }

    let mut locomotive = CardGroup::new(
        GroupKey::Locomotive,
        "Locomotive",
        single(&train.locomotive),
        ctx.pool,
        None,
    );
    if locomotive.is_empty() {
        locomotive = locomotive.with_hint("No locomotive · select to choose one");
    }

    let cars = train
        .cars
        .iter()
        .map(|slot| (slot.car.clone(), SlotFlags::enabled()))
        .collect();
    let railcars = CardGroup::new(GroupKey::Railcars, "Rail cars", cars, ctx.pool, None)
        .with_hint(slot_usage(train));

    Ok(vec![conductor, locomotive, railcars])
}

fn slot_groups<S>(mut ctx: GroupContext<'_, S>, kind: CardKind) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let train = ctx.unsaved()?;
    let current = match kind {
        CardKind::Conductor => train.conductor.clone(),
        _ => train.locomotive.clone(),
    };
    let compatible = |card: &Card| match kind {
        CardKind::Conductor => match (train.conductor_threshold(), card.conductor_level()) {
            (Some(threshold), Some(level)) => level >= threshold,
            _ => true,
        },
        _ => {
            let mut candidate = train.clone();
            candidate.locomotive = Some(card.clone());
            match (candidate.conductor_threshold(), train.conductor.as_ref()) {
                (Some(threshold), Some(conductor)) => {
                    conductor.conductor_level().unwrap_or(0) >= threshold
                }
                _ => true,
            }
        }
    };

    let equipped = current
        .into_iter()
        .map(|card| {
            let flags = SlotFlags {
                highlighted: true,
                ..SlotFlags::enabled()
            };
            (card, flags)
        })
        .collect();
    let available = unequipped_cards(ctx.source, kind, train)?
        .into_iter()
        .map(|card| {
            let flags = SlotFlags {
                highlighted: compatible(&card),
                ..SlotFlags::enabled()
            };
            (card, flags)
        })
        .collect::<Vec<_>>();

    let noun = match kind {
        CardKind::Conductor => "conductor",
        _ => "locomotive",
    };
    let equipped = CardGroup::new(
        GroupKey::Equipped,
        format!("Equipped {noun}"),
        equipped,
        ctx.pool,
        None,
    );
    let unequipped = CardGroup::new(
        GroupKey::Unequipped,
        format!("Available {noun}s"),
        available,
        ctx.pool,
        None,
    );
    let unequipped = if unequipped.is_empty() {
        unequipped.with_hint(format!("Every {noun} is already in use"))
    } else {
        unequipped.with_hint("Hover to preview · select to equip")
    };
    Ok(vec![equipped, unequipped])
}

fn railcar_groups<S>(mut ctx: GroupContext<'_, S>) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let train = ctx.unsaved()?;
    let attached = train
        .cars
        .iter()
        .map(|slot| (slot.car.clone(), SlotFlags::enabled()))
        .collect();
    let free_slots = train.cars.len() < train.slot_count() as usize;
    let available = unequipped_cards(ctx.source, CardKind::Wagon, train)?
        .into_iter()
        .map(|card| {
            let flags = SlotFlags {
                highlighted: free_slots,
                ..SlotFlags::enabled()
            };
            (card, flags)
        })
        .collect();

    let equipped = CardGroup::new(
        GroupKey::Equipped,
        "Attached rail cars",
        attached,
        ctx.pool,
        None,
    )
    .with_hint(format!("{} · select to detach", slot_usage(train)));
    let unequipped = CardGroup::new(
        GroupKey::Unequipped,
        "Available rail cars",
        available,
        ctx.pool,
        None,
    )
    .with_hint("Select to attach");
    Ok(vec![equipped, unequipped])
}

fn loadout_groups<S>(mut ctx: GroupContext<'_, S>) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let train = ctx.unsaved()?;
    let cars = train
        .cars
        .iter()
        .map(|slot| {
            let flags = SlotFlags {
                highlighted: !slot.utilization().within_capacity(),
                ..SlotFlags::enabled()
            };
            (slot.car.clone(), flags)
        })
        .collect();
    let group = CardGroup::new(GroupKey::Loadout, "Rail cars", cars, ctx.pool, None);
    let group = if group.is_empty() {
        group.with_hint("No rail cars attached")
    } else {
        group.with_hint("Select a rail car to load it")
    };
    Ok(vec![group])
}

fn commodity_groups<S>(
    mut ctx: GroupContext<'_, S>,
    railcar: AssetId,
    resume_focus: Option<ResumeFocus>,
) -> Result<Vec<CardGroup>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let train = ctx.unsaved()?;
    let slot = train
        .car(railcar)
        .ok_or(DrawerError::RailCarNotFound(railcar))?;
    let capacity = slot.capacity();
    if capacity == WagonCapacity::Unsupported {
        return Err(DrawerError::UnsupportedRailCar(railcar));
    }

    let loaded = slot
        .loads
        .iter()
        .map(|load| (load.clone(), SlotFlags::enabled()))
        .collect();
    let available = unequipped_cards(ctx.source, CardKind::Loadable, train)?
        .into_iter()
        .filter(|card| {
            card.loadable()
                .is_some_and(|stats| stats.fits(&capacity))
        })
        .map(|card| (card, SlotFlags::enabled()))
        .collect();

    let hint_for = |group: GroupKey| {
        resume_focus
            .filter(|focus| focus.group == group)
            .map(|focus| focus.index)
    };
    let usage = match slot.utilization() {
        Utilization::Seats { used, max } => format!("{used}/{max} seats"),
        Utilization::Volume { used, max } => format!("{used}/{max} volume"),
        Utilization::Unsupported => String::new(),
    };

    let equipped = CardGroup::new(
        GroupKey::Equipped,
        format!("Loaded in {}", slot.car.name),
        loaded,
        ctx.pool,
        hint_for(GroupKey::Equipped),
    )
    .with_hint(format!("{usage} · select to unload"));
    let unequipped = CardGroup::new(
        GroupKey::Unequipped,
        "Compatible loads",
        available,
        ctx.pool,
        hint_for(GroupKey::Unequipped),
    );
    let unequipped = if unequipped.is_empty() {
        unequipped.with_hint("No compatible loads available")
    } else {
        unequipped.with_hint("Select to load")
    };
    Ok(vec![equipped, unequipped])
}

fn slot_usage(train: &Train) -> String {
    format!("{}/{} slots used", train.cars.len(), train.slot_count())
}
