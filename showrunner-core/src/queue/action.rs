//! The closed set of queue actions, their priority tiers and which actions
//! may not coexist for the same show.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority tiers; the pending set is drained highest tier first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QueuePriority {
    Normal = 10,
    High = 20,
    VeryHigh = 30,
}

impl fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuePriority::Normal => write!(f, "normal"),
            QueuePriority::High => write!(f, "high"),
            QueuePriority::VeryHigh => write!(f, "very-high"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Refresh,
    Add,
    Update,
    ForceUpdate,
    Rename,
    Subtitle,
    Remove,
}

pub const UPDATE_ACTIONS: &[ActionKind] = &[ActionKind::Update, ActionKind::ForceUpdate];
pub const REFRESH_ACTIONS: &[ActionKind] = &[ActionKind::Refresh];
pub const ADD_ACTIONS: &[ActionKind] = &[ActionKind::Add];
pub const RENAME_ACTIONS: &[ActionKind] = &[ActionKind::Rename];
pub const SUBTITLE_ACTIONS: &[ActionKind] = &[ActionKind::Subtitle];
pub const REMOVE_ACTIONS: &[ActionKind] = &[ActionKind::Remove];

const UPDATE_CONFLICTS: &[ActionKind] = &[
    ActionKind::Add,
    ActionKind::Update,
    ActionKind::ForceUpdate,
];
const REFRESH_CONFLICTS: &[ActionKind] = &[
    ActionKind::Refresh,
    ActionKind::Update,
    ActionKind::ForceUpdate,
];

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Refresh,
        ActionKind::Add,
        ActionKind::Update,
        ActionKind::ForceUpdate,
        ActionKind::Rename,
        ActionKind::Subtitle,
        ActionKind::Remove,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Refresh => "Refresh",
            ActionKind::Add => "Add",
            ActionKind::Update => "Update",
            ActionKind::ForceUpdate => "Force Update",
            ActionKind::Rename => "Rename",
            ActionKind::Subtitle => "Subtitle",
            ActionKind::Remove => "Remove Show",
        }
    }

    pub fn priority(&self) -> QueuePriority {
        match self {
            ActionKind::Remove => QueuePriority::VeryHigh,
            ActionKind::Add => QueuePriority::High,
            _ => QueuePriority::Normal,
        }
    }

    /// Actions that may not be pending or running for the same show when
    /// this one is requested. A forced refresh conflicts with nothing.
    pub fn conflicts(&self, force: bool) -> &'static [ActionKind] {
        match self {
            ActionKind::Update | ActionKind::ForceUpdate => UPDATE_CONFLICTS,
            ActionKind::Refresh if force => &[],
            ActionKind::Refresh => REFRESH_CONFLICTS,
            ActionKind::Remove => REMOVE_ACTIONS,
            ActionKind::Add | ActionKind::Rename | ActionKind::Subtitle => &[],
        }
    }

    /// Whether the target show must still be registered when the item is
    /// dispatched. Add creates the show and Remove may roll back one that
    /// never got registered.
    pub fn requires_registered_show(&self) -> bool {
        !matches!(self, ActionKind::Add | ActionKind::Remove)
    }

    pub fn is_update(&self) -> bool {
        UPDATE_ACTIONS.contains(self)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_outranks_add_which_outranks_routine_work() {
        assert!(ActionKind::Remove.priority() > ActionKind::Add.priority());
        assert!(ActionKind::Add.priority() > ActionKind::Refresh.priority());
        for kind in [
            ActionKind::Refresh,
            ActionKind::Update,
            ActionKind::ForceUpdate,
            ActionKind::Rename,
            ActionKind::Subtitle,
        ] {
            assert_eq!(kind.priority(), QueuePriority::Normal, "{kind}");
        }
    }

    #[test]
    fn update_conflicts_with_add_and_updates() {
        for kind in UPDATE_ACTIONS {
            let conflicts = kind.conflicts(false);
            assert!(conflicts.contains(&ActionKind::Add));
            assert!(conflicts.contains(&ActionKind::Update));
            assert!(conflicts.contains(&ActionKind::ForceUpdate));
            assert!(!conflicts.contains(&ActionKind::Refresh));
        }
    }

    #[test]
    fn forced_refresh_has_no_conflicts() {
        assert_eq!(ActionKind::Refresh.conflicts(true), &[] as &[ActionKind]);
        assert_eq!(ActionKind::Refresh.conflicts(false).len(), 3);
    }

    #[test]
    fn rename_and_subtitle_never_conflict() {
        assert!(ActionKind::Rename.conflicts(false).is_empty());
        assert!(ActionKind::Subtitle.conflicts(false).is_empty());
    }

    #[test]
    fn names_are_stable() {
        let names: Vec<_> = ActionKind::ALL.iter().map(ActionKind::name).collect();
        assert_eq!(
            names,
            [
                "Refresh",
                "Add",
                "Update",
                "Force Update",
                "Rename",
                "Subtitle",
                "Remove Show"
            ]
        );
    }
}
