use tracing::trace;

use crate::account::CardSource;
use crate::models::{Card, CardKind, Train};

use super::DrawerError;

/// Cards of `kind` that no train uses, with `replacement` standing in for the
/// player's train of the same name.
///
/// The replacement must name one of the player's trains. The result is recomputed on
/// every call so a card equipped on another train is never offered.
pub fn unequipped_cards<S>(
    source: &S,
    kind: CardKind,
    replacement: &Train,
) -> Result<Vec<Card>, DrawerError>
where
    S: CardSource + ?Sized,
{
    let mut trains = source.trains();
    let index = trains
        .iter()
        .position(|train| train.name == replacement.name)
        .ok_or_else(|| DrawerError::TrainNotFound(replacement.name.clone()))?;
    trains[index] = replacement.clone();

    let available: Vec<Card> = source
        .cards_of(kind)
        .into_iter()
        .filter(|card| !trains.iter().any(|train| equipped_on(train, card, kind)))
        .collect();
    trace!(?kind, train = %replacement.name, available = available.len(), "Unequipped cards");
    Ok(available)
}

/// Whether `card` occupies the slot matching `kind` on `train`.
pub fn equipped_on(train: &Train, card: &Card, kind: CardKind) -> bool {
    let same = |slot: &Option<Card>| slot.as_ref().is_some_and(|held| held.id == card.id);
    match kind {
        CardKind::Conductor => same(&train.conductor),
        CardKind::Locomotive => same(&train.locomotive),
        CardKind::Wagon => train.cars.iter().any(|slot| slot.car.id == card.id),
        CardKind::Loadable => train
            .cars
            .iter()
            .any(|slot| slot.loads.iter().any(|load| load.id == card.id)),
    }
}
