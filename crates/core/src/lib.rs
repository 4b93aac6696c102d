#![warn(clippy::all, missing_docs)]

//! Core domain logic for the consist train editor.
//!
//! This crate hosts the card and train models, the player account
//! source and its persistence, configuration handling, and the
//! drawer state machine used by the terminal UI and any future frontends.

pub mod account;
pub mod config;
pub mod drawer;
pub mod models;

pub use account::{AccountStore, CardSource, CompositionStore, Roster};
pub use config::AppConfig;
pub use drawer::{Drawer, DrawerEvent, DrawerState, GroupKey};
pub use models::{Card, CardKind, Train};
