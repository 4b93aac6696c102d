//! Commit-time validation of an edited train.

use thiserror::Error;
use tracing::{info, warn};

use crate::account::{CardSource, CompositionStore, CompositionUpdate};
use crate::models::{Train, Utilization};

use super::DrawerError;

/// First composition rule an edited train breaks. The message is shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No conductor equipped.
    #[error("You must select a conductor")]
    MissingConductor,
    /// No locomotive equipped.
    #[error("You must select a locomotive")]
    MissingLocomotive,
    /// Cargo car loaded beyond its rated volume.
    #[error("Rail car {car} can carry {max} volume but is loaded with {used}")]
    VolumeExceeded {
        /// Zero-based position of the car in the train.
        car: usize,
        /// Rated volume.
        max: u32,
        /// Loaded volume.
        used: u32,
    },
    /// Passenger car carrying more passengers than seats.
    #[error("Rail car {car} has {max} seats but carries {used} passengers")]
    SeatsExceeded {
        /// Zero-based position of the car in the train.
        car: usize,
        /// Rated seat count.
        max: u32,
        /// Boarded passengers.
        used: u32,
    },
    /// Locomotive requires a better conductor.
    #[error("The locomotive requires conductor level {required} but the conductor is level {level}")]
    ConductorLevelTooLow {
        /// Level required by the locomotive.
        required: u32,
        /// Level of the equipped conductor.
        level: u32,
    },
    /// Train too heavy for the locomotive.
    #[error("The locomotive can pull {max} but the train weighs {total}")]
    Overweight {
        /// Hauling power of the locomotive.
        max: u32,
        /// Total train weight.
        total: u32,
    },
    /// More rail cars than slots.
    #[error("The train has {slots} rail car slots but {cars} rail cars are attached")]
    TooManyRailcars {
        /// Allowed slot count.
        slots: u32,
        /// Attached rail cars.
        cars: u32,
    },
}

/// Result of a commit attempt that did not hit a precondition error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A rule was broken; nothing was persisted.
    Rejected(ValidationError),
    /// The edited train equals the persisted one; nothing was persisted.
    Unchanged,
    /// The composition was persisted and copied onto the canonical train.
    Persisted,
}

/// Check every composition rule in order, stopping at the first violation.
///
/// `target` is the persisted train and supplies the slot allowance.
pub fn validate(edited: &Train, target: &Train) -> Result<(), ValidationError> {
    let conductor = edited
        .conductor
        .as_ref()
        .ok_or(ValidationError::MissingConductor)?;
    if edited.locomotive.is_none() {
        return Err(ValidationError::MissingLocomotive);
    }

    for (car, slot) in edited.cars.iter().enumerate() {
        match slot.utilization() {
            Utilization::Volume { used, max } if used > max => {
                return Err(ValidationError::VolumeExceeded { car, max, used });
            }
            Utilization::Seats { used, max } if used > max => {
                return Err(ValidationError::SeatsExceeded { car, max, used });
            }
            _ => {}
        }
    }

    let level = conductor.conductor_level().unwrap_or(0);
    if let Some(required) = edited.conductor_threshold() {
        if required > level {
            return Err(ValidationError::ConductorLevelTooLow { required, level });
        }
    }

    let (total, max) = (edited.total_weight(), edited.max_weight());
    if total > max {
        return Err(ValidationError::Overweight { max, total });
    }

    let (cars, slots) = (edited.cars.len() as u32, target.slot_count());
    if cars > slots {
        return Err(ValidationError::TooManyRailcars { slots, cars });
    }

    Ok(())
}

/// Validate `edited` and, if it passes and differs from the canonical train, persist
/// it and copy it back onto the source.
pub async fn commit<S, P>(
    source: &S,
    store: &P,
    edited: &Train,
) -> Result<CommitOutcome, DrawerError>
where
    S: CardSource + ?Sized,
    P: CompositionStore,
{
    let target = source
        .train(&edited.name)
        .ok_or_else(|| DrawerError::TrainNotFound(edited.name.clone()))?;

    if let Err(violation) = validate(edited, &target) {
        warn!(train = %edited.name, "Composition rejected: {violation}");
        return Ok(CommitOutcome::Rejected(violation));
    }
    if *edited == target {
        info!(train = %edited.name, "Composition unchanged; nothing to persist");
        return Ok(CommitOutcome::Unchanged);
    }

    store
        .update_composition(&CompositionUpdate::from_train(edited))
        .await?;
    if !source.replace_train(edited.clone()) {
        return Err(DrawerError::TrainNotFound(edited.name.clone()));
    }
    info!(train = %edited.name, cars = edited.cars.len(), "Composition committed");
    Ok(CommitOutcome::Persisted)
}
