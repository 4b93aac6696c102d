use thiserror::Error;

use crate::account::StoreError;
use crate::models::AssetId;

use super::groups::GroupKey;

/// Precondition violated by the surrounding application.
///
/// These are not user-correctable; callers are expected to log them and recover at a
/// coarser level, for example by closing the drawer. User-facing composition problems
/// are reported through [`super::ValidationError`] instead.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DrawerError {
    #[error("no unsaved train is being edited")]
    NoUnsavedTrain,
    #[error("train {0} is not one of the player's trains")]
    TrainNotFound(String),
    #[error("rail car {0} is not attached to the edited train")]
    RailCarNotFound(AssetId),
    #[error("rail car {0} is neither a passenger nor a cargo car")]
    UnsupportedRailCar(AssetId),
    #[error("group {0:?} is not shown in the current state")]
    NoSuchGroup(GroupKey),
    #[error("persisting the composition failed: {0}")]
    Persistence(#[from] StoreError),
}
