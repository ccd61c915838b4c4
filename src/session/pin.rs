//! Pin and unpin commands.
//!
//! Pinning promotes one step out of its stack to the stack's level, splitting
//! the stack around it. Unpinning folds a plain `ADD` step back together with
//! its stackable neighbors. A stack is never left with fewer than two
//! members: a one-member remainder becomes a plain step and an empty one is
//! removed.
//!
//! Both commands come straight from user interaction, so a failed lookup is
//! logged and ignored. The `try_` variants return the reason instead.

use crate::builder::fresh_stack_id;
use crate::error::StructuralError;
use crate::node::{ItemType, NodePath, StepNode};
use crate::session::HowSession;

/// Where an unpin would happen and which neighbors it would absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UnpinSite {
    parent: NodePath,
    slot: usize,
    absorb_left: bool,
    absorb_right: bool,
}

impl HowSession {
    /// Pins `step_id` out of `stack_id`. Returns false, leaving everything
    /// unchanged, if the step cannot be pinned.
    pub fn pin_step(&mut self, step_id: &str, stack_id: &str) -> bool {
        match self.try_pin_step(step_id, stack_id) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(step_id, stack_id, error = %err, "pin ignored");
                false
            }
        }
    }

    /// Folds `step_id` back into a neighboring stack. Returns false, leaving
    /// everything unchanged, if there is nothing to fold into.
    pub fn unpin_step(&mut self, step_id: &str) -> bool {
        match self.try_unpin_step(step_id) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(step_id, error = %err, "unpin ignored");
                false
            }
        }
    }

    /// Returns true if [`HowSession::unpin_step`] would succeed for `step_id`.
    #[must_use]
    pub fn step_can_be_unpinned(&self, step_id: &str) -> bool {
        self.unpin_site(step_id).is_ok()
    }

    /// Pins `step_id` out of `stack_id`.
    pub fn try_pin_step(&mut self, step_id: &str, stack_id: &str) -> Result<(), StructuralError> {
        if self.state.is_pinned(step_id) {
            return Err(StructuralError::AlreadyPinned {
                id: step_id.to_string(),
            });
        }

        let stack_path = self
            .index
            .find(stack_id, ItemType::Stack)
            .cloned()
            .ok_or_else(|| StructuralError::StackNotFound {
                id: stack_id.to_string(),
            })?;
        let parent_not_found = || StructuralError::ParentNotFound {
            id: stack_id.to_string(),
        };
        let parent_path = stack_path.parent().ok_or_else(parent_not_found)?;
        let slot = stack_path.last().ok_or_else(parent_not_found)?;

        let position = self
            .forest
            .node(&stack_path)
            .and_then(|stack| stack.children.iter().position(|c| c.id == step_id))
            .ok_or_else(|| StructuralError::NotStackMember {
                step_id: step_id.to_string(),
                stack_id: stack_id.to_string(),
            })?;

        let stack_was_expanded = self.state.is_group_expanded(stack_id);
        let siblings = self.forest.children_mut(&parent_path).ok_or_else(parent_not_found)?;
        let mut stack = siblings.remove(slot);
        let mut before = std::mem::take(&mut stack.children);
        let after = before.split_off(position + 1);
        let Some(pinned) = before.pop() else {
            // position was found above, so the split always leaves the step last
            siblings.insert(slot, stack);
            return Err(StructuralError::NotStackMember {
                step_id: step_id.to_string(),
                stack_id: stack_id.to_string(),
            });
        };

        let mut replacement = Vec::with_capacity(3);
        let mut new_stack_id = None;
        let keeps_stack = before.len() >= 2;
        match before.len() {
            0 => {}
            1 => replacement.append(&mut before),
            _ => {
                stack.children = before;
                replacement.push(stack);
            }
        }
        replacement.push(pinned);
        match after.len() {
            0 => {}
            1 => replacement.extend(after),
            _ => {
                let remainder = StepNode::stack(fresh_stack_id(), after);
                new_stack_id = Some(remainder.id.clone());
                replacement.push(remainder);
            }
        }
        let tail = siblings.split_off(slot);
        siblings.extend(replacement);
        siblings.extend(tail);

        if !keeps_stack {
            self.state.forget_group(stack_id);
        }
        if let (Some(id), true) = (&new_stack_id, stack_was_expanded) {
            self.state.mark_expanded(ItemType::Stack, id);
        }
        self.state.pin(step_id);
        self.reindex();
        tracing::debug!(step_id, stack_id, kept_stack = keeps_stack, remainder = ?new_stack_id, "pinned step");
        Ok(())
    }

    /// Folds `step_id` back into its stackable neighbors.
    pub fn try_unpin_step(&mut self, step_id: &str) -> Result<(), StructuralError> {
        let site = self.unpin_site(step_id)?;
        let start = if site.absorb_left { site.slot - 1 } else { site.slot };
        let end = if site.absorb_right { site.slot + 1 } else { site.slot };

        let siblings = self
            .forest
            .children_mut(&site.parent)
            .ok_or_else(|| StructuralError::ParentNotFound {
                id: step_id.to_string(),
            })?;

        let mut reused_id = None;
        let mut dropped_ids = Vec::new();
        let mut members = Vec::new();
        let mut any_expanded = false;
        for node in siblings.drain(start..=end) {
            any_expanded |= self.state.is_expanded(node.item_type, &node.id)
                || node
                    .children
                    .iter()
                    .any(|c| self.state.is_expanded(c.item_type, &c.id));
            if node.item_type == ItemType::Stack {
                if reused_id.is_none() {
                    reused_id = Some(node.id);
                } else {
                    dropped_ids.push(node.id);
                }
                members.extend(node.children);
            } else {
                members.push(node);
            }
        }
        let stack = StepNode::stack(reused_id.unwrap_or_else(fresh_stack_id), members);
        let merged_id = stack.id.clone();
        siblings.insert(start, stack);

        for id in &dropped_ids {
            self.state.forget_group(id);
        }
        // an open member must stay reachable through its new stack
        if any_expanded {
            self.state.mark_expanded(ItemType::Stack, &merged_id);
        }
        self.state.unpin(step_id);
        self.reindex();
        tracing::debug!(step_id, stack_id = %merged_id, merged = dropped_ids.len(), "unpinned step");
        Ok(())
    }

    /// Finds the plain occurrence of a pinned `step_id` (not inside a stack,
    /// not a container's anchor) and which neighbors an unpin would absorb.
    fn unpin_site(&self, step_id: &str) -> Result<UnpinSite, StructuralError> {
        let occurrences = self.index.lookup(step_id);
        if occurrences.is_empty() {
            return Err(StructuralError::NodeNotFound {
                id: step_id.to_string(),
            });
        }
        if !self.state.is_pinned(step_id) {
            return Err(StructuralError::NotPinned {
                id: step_id.to_string(),
            });
        }

        let mut result = Err(StructuralError::NotStackable {
            id: step_id.to_string(),
        });
        for occurrence in occurrences.iter().filter(|o| o.item_type == ItemType::Step) {
            let (Some(parent), Some(slot)) = (occurrence.path.parent(), occurrence.path.last()) else {
                continue;
            };
            let Some(owner) = self.forest.node(&parent) else {
                continue;
            };
            if owner.item_type == ItemType::Stack || owner.is_anchor_index(slot) {
                continue;
            }
            if !owner.children[slot].is_add_step() {
                continue;
            }

            let absorb_left = slot > 0
                && !owner.is_anchor_index(slot - 1)
                && self.is_stackable(&owner.children[slot - 1]);
            let absorb_right = owner
                .children
                .get(slot + 1)
                .is_some_and(|n| self.is_stackable(n));
            if !absorb_left && !absorb_right {
                result = Err(StructuralError::NoStackableNeighbor {
                    id: step_id.to_string(),
                });
                continue;
            }
            return Ok(UnpinSite {
                parent,
                slot,
                absorb_left,
                absorb_right,
            });
        }
        result
    }

    fn is_stackable(&self, node: &StepNode) -> bool {
        node.item_type == ItemType::Stack || (node.is_add_step() && !self.state.is_pinned(&node.id))
    }
}
