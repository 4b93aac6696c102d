use crate::models::AssetId;

use super::groups::GroupKey;

/// Focus to restore in a group after an in-place refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeFocus {
    /// Group receiving the focus.
    pub group: GroupKey,
    /// Card position within that group.
    pub index: usize,
}

/// Position of the editing workflow. Transitions replace the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DrawerState {
    /// Drawer not shown.
    #[default]
    Closed,
    /// Browsing every owned card.
    Inventory,
    /// Conductor, locomotive and rail cars of a train.
    CompositionOverview {
        /// Target train name.
        train: String,
    },
    /// Swapping the conductor.
    ChangeConductor {
        /// Target train name.
        train: String,
    },
    /// Swapping the locomotive.
    ChangeLocomotive {
        /// Target train name.
        train: String,
    },
    /// Adding or removing rail cars.
    ChangeRailcars {
        /// Target train name.
        train: String,
    },
    /// Rail cars of a train, as entry points into their loads.
    LoadoutOverview {
        /// Target train name.
        train: String,
    },
    /// Loading or unloading one rail car.
    ChangeCommodities {
        /// Target train name.
        train: String,
        /// Rail car being loaded.
        railcar: AssetId,
        /// Focus to restore after the refresh.
        resume_focus: Option<ResumeFocus>,
    },
}

/// Field-less discriminant of [`DrawerState`], handy for events and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StateKind {
    Closed,
    Inventory,
    CompositionOverview,
    ChangeConductor,
    ChangeLocomotive,
    ChangeRailcars,
    LoadoutOverview,
    ChangeCommodities,
}

impl DrawerState {
    /// Discriminant of this state.
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Closed => StateKind::Closed,
            Self::Inventory => StateKind::Inventory,
            Self::CompositionOverview { .. } => StateKind::CompositionOverview,
            Self::ChangeConductor { .. } => StateKind::ChangeConductor,
            Self::ChangeLocomotive { .. } => StateKind::ChangeLocomotive,
            Self::ChangeRailcars { .. } => StateKind::ChangeRailcars,
            Self::LoadoutOverview { .. } => StateKind::LoadoutOverview,
            Self::ChangeCommodities { .. } => StateKind::ChangeCommodities,
        }
    }

    /// Name of the train this state edits, if any.
    pub fn target_train(&self) -> Option<&str> {
        match self {
            Self::Closed | Self::Inventory => None,
            Self::CompositionOverview { train }
            | Self::ChangeConductor { train }
            | Self::ChangeLocomotive { train }
            | Self::ChangeRailcars { train }
            | Self::LoadoutOverview { train }
            | Self::ChangeCommodities { train, .. } => Some(train),
        }
    }

    /// State the confirm action leads to, or `None` when confirming commits or is not
    /// offered.
    pub fn confirm_destination(&self) -> Option<DrawerState> {
        match self {
            Self::ChangeConductor { train }
            | Self::ChangeLocomotive { train }
            | Self::ChangeRailcars { train } => Some(Self::CompositionOverview {
                train: train.clone(),
            }),
            Self::ChangeCommodities { train, .. } => Some(Self::LoadoutOverview {
                train: train.clone(),
            }),
            _ => None,
        }
    }

    /// Whether confirming in this state commits the edited train.
    pub fn confirm_commits(&self) -> bool {
        matches!(
            self,
            Self::CompositionOverview { .. } | Self::LoadoutOverview { .. }
        )
    }

    /// Short title for the drawer header.
    pub fn title(&self) -> String {
        match self {
            Self::Closed => "Closed".to_string(),
            Self::Inventory => "Inventory".to_string(),
            Self::CompositionOverview { train } => format!("{train} · composition"),
            Self::ChangeConductor { train } => format!("{train} · conductor"),
            Self::ChangeLocomotive { train } => format!("{train} · locomotive"),
            Self::ChangeRailcars { train } => format!("{train} · rail cars"),
            Self::LoadoutOverview { train } => format!("{train} · loadout"),
            Self::ChangeCommodities { train, railcar, .. } => {
                format!("{train} · loading {railcar}")
            }
        }
    }
}
