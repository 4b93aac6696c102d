//! Player account: the card/train data source and its persistence.

mod roster;
mod snapshot;
mod store;
mod watch;

pub use roster::{CardSource, Roster};
pub use snapshot::{cargo_entries, AccountSnapshot, CargoEntry, TrainRecord};
pub use store::{AccountStore, CompositionStore, CompositionUpdate, StoreError};
pub use watch::{AccountEvent, AccountWatcher};
