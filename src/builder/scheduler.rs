use crate::error::Result;

use super::GuiBuilder;

/// Execution tier of a queued configuration action. Lower tiers run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionTier {
    GlobalEvent = 1,
    GlobalItems = 2,
    PageManagement = 3,
    PageEvent = 4,
    Navigation = 5,
}

impl ActionTier {
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionTier::GlobalEvent => "global_event",
            ActionTier::GlobalItems => "global_items",
            ActionTier::PageManagement => "page_management",
            ActionTier::PageEvent => "page_event",
            ActionTier::Navigation => "navigation",
        }
    }
}

pub(crate) type Action = Box<dyn FnOnce(&mut GuiBuilder) -> Result<()>>;

pub(crate) struct QueuedAction {
    pub(crate) tier: ActionTier,
    pub(crate) label: &'static str,
    pub(crate) run: Action,
}

/// Tier-tagged job queue with a marker for the tier currently executing.
#[derive(Default)]
pub(crate) struct ActionQueue {
    entries: Vec<QueuedAction>,
    executing: Option<ActionTier>,
}

impl ActionQueue {
    pub(crate) fn push(&mut self, tier: ActionTier, label: &'static str, run: Action) {
        self.entries.push(QueuedAction { tier, label, run });
    }

    /// Whether an action scheduled for `tier` must run now: its tier is
    /// already draining, so queueing it would never run it in order.
    pub(crate) fn runs_immediately(&self, tier: ActionTier) -> bool {
        self.executing == Some(tier)
    }

    pub(crate) fn executing(&self) -> Option<ActionTier> {
        self.executing
    }

    pub(crate) fn set_executing(&mut self, tier: Option<ActionTier>) {
        self.executing = tier;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes the next action to run: lowest tier first, call order within
    /// a tier. Actions queued while others run are picked up in tier order.
    pub(crate) fn pop_next(&mut self) -> Option<QueuedAction> {
        let position = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(index, action)| (action.tier, *index))
            .map(|(index, _)| index)?;
        Some(self.entries.remove(position))
    }
}
