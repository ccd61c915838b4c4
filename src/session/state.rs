//! Session-scoped expansion and pin sets.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::node::ItemType;

/// Expanded and pinned ids for one loaded entity.
///
/// Steps and containers live in separate sets because a step id and the id
/// of its own container are the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    expanded_steps: BTreeSet<String>,
    expanded_groups: BTreeSet<String>,
    pinned: BTreeSet<String>,
}

impl UiState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if step details for `id` are expanded.
    #[must_use]
    pub fn is_step_expanded(&self, id: &str) -> bool {
        self.expanded_steps.contains(id)
    }

    /// Returns true if the container `id` is expanded.
    #[must_use]
    pub fn is_group_expanded(&self, id: &str) -> bool {
        self.expanded_groups.contains(id)
    }

    /// Returns true if `id` has been pinned out of its stack.
    #[must_use]
    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.contains(id)
    }

    /// Returns true if a node of `item_type` with this id is expanded.
    #[must_use]
    pub fn is_expanded(&self, item_type: ItemType, id: &str) -> bool {
        if item_type.is_container() {
            self.is_group_expanded(id)
        } else {
            self.is_step_expanded(id)
        }
    }

    /// Marks a node expanded. Returns true if it was collapsed.
    pub fn mark_expanded(&mut self, item_type: ItemType, id: &str) -> bool {
        if item_type.is_container() {
            self.expanded_groups.insert(id.to_string())
        } else {
            self.expanded_steps.insert(id.to_string())
        }
    }

    /// Marks a node collapsed. Returns true if it was expanded.
    pub fn mark_collapsed(&mut self, item_type: ItemType, id: &str) -> bool {
        if item_type.is_container() {
            self.expanded_groups.remove(id)
        } else {
            self.expanded_steps.remove(id)
        }
    }

    /// Drops all state for a container that no longer exists.
    pub fn forget_group(&mut self, id: &str) {
        self.expanded_groups.remove(id);
    }

    /// Records a pin.
    pub fn pin(&mut self, id: &str) {
        self.pinned.insert(id.to_string());
    }

    /// Removes a pin. Returns true if it was pinned.
    pub fn unpin(&mut self, id: &str) -> bool {
        self.pinned.remove(id)
    }

    /// Empties both expanded sets except for `exclude`.
    pub fn collapse_all(&mut self, exclude: &[&str]) {
        self.expanded_steps.retain(|id| exclude.contains(&id.as_str()));
        self.expanded_groups.retain(|id| exclude.contains(&id.as_str()));
    }

    /// Expanded step ids.
    pub fn expanded_steps(&self) -> impl Iterator<Item = &str> {
        self.expanded_steps.iter().map(String::as_str)
    }

    /// Expanded container ids.
    pub fn expanded_groups(&self) -> impl Iterator<Item = &str> {
        self.expanded_groups.iter().map(String::as_str)
    }

    /// Pinned step ids.
    pub fn pinned(&self) -> impl Iterator<Item = &str> {
        self.pinned.iter().map(String::as_str)
    }
}
