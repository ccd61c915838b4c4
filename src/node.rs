//! Display nodes of the resolution forest.
//!
//! Each node carries an explicit [`ItemType`] × [`StepType`] tag assigned once
//! at construction. Containers own their children; the owning container is
//! recorded by id only, so a `GROUP` and its embedded anchor step never point
//! at each other.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::step::{ResolutionStep, VirtualEntityRef};

/// What role a node plays in the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    /// A single resolution step.
    Step,
    /// Two or more contiguous `ADD` steps grouped for display.
    Stack,
    /// An interim entity: an input of a `MERGE` step and its history.
    Group,
    /// A final state and its history.
    Final,
}

impl ItemType {
    /// Returns true for nodes that own children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        !matches!(self, Self::Step)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "STEP"),
            Self::Stack => write!(f, "STACK"),
            Self::Group => write!(f, "GROUP"),
            Self::Final => write!(f, "FINAL"),
        }
    }
}

/// What kind of resolution a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    /// Two records combined into a new virtual entity.
    Create,
    /// One record added to an existing virtual entity.
    Add,
    /// Two virtual entities combined.
    Merge,
    /// Container for an interim entity.
    Interim,
    /// Container for a final state.
    Final,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Add => write!(f, "ADD"),
            Self::Merge => write!(f, "MERGE"),
            Self::Interim => write!(f, "INTERIM"),
            Self::Final => write!(f, "FINAL"),
        }
    }
}

/// Location of a node: child indexes from the forest roots down.
///
/// The empty path addresses the root sequence itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path of the root sequence.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child of this node.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    /// Path of the owning node, or `None` for the root sequence.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Index within the parent's children.
    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Number of hops from the roots.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Child indexes, outermost first.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Returns true if `self` lies strictly beneath `other`.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.0.len() > other.0.len() && self.0.starts_with(&other.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// A node of the resolution forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNode {
    pub id: String,
    pub item_type: ItemType,
    pub step_type: StepType,
    /// The underlying step; `None` for stacks and synthetic finals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<ResolutionStep>,
    /// The wrapped entity for synthetic finals with no step history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_entity: Option<VirtualEntityRef>,
    pub children: Vec<StepNode>,
    /// Ids of this node and every descendant.
    pub covered_ids: BTreeSet<String>,
    /// Id of the container that owns this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl StepNode {
    fn bare(id: String, item_type: ItemType, step_type: StepType) -> Self {
        let mut covered_ids = BTreeSet::new();
        covered_ids.insert(id.clone());
        Self {
            id,
            item_type,
            step_type,
            step: None,
            virtual_entity: None,
            children: Vec::new(),
            covered_ids,
            owner_id: None,
        }
    }

    /// A plain `STEP` node for a resolution step.
    #[must_use]
    pub fn step(step: &ResolutionStep) -> Self {
        let mut node = Self::bare(step.resolved_id.clone(), ItemType::Step, step.step_type());
        node.step = Some(step.clone());
        node
    }

    /// A `STEP` node for a final state that has no step history.
    #[must_use]
    pub fn record_only(entity: &VirtualEntityRef) -> Self {
        let mut node = Self::bare(entity.id.clone(), ItemType::Step, StepType::Create);
        node.virtual_entity = Some(entity.clone());
        node
    }

    /// A `FINAL` or `GROUP` container for `step` with the given children.
    ///
    /// `children[0]` should be the step itself rendered as a plain `STEP`.
    #[must_use]
    pub fn container(step: &ResolutionStep, item_type: ItemType, children: Vec<StepNode>) -> Self {
        let step_type = if item_type == ItemType::Final {
            StepType::Final
        } else {
            StepType::Interim
        };
        let mut node = Self::bare(step.resolved_id.clone(), item_type, step_type);
        node.step = Some(step.clone());
        node.children = children;
        node.refresh();
        node
    }

    /// A synthetic `FINAL` node for a final state with no step history.
    #[must_use]
    pub fn synthetic_final(entity: &VirtualEntityRef) -> Self {
        let mut node = Self::bare(entity.id.clone(), ItemType::Final, StepType::Final);
        node.virtual_entity = Some(entity.clone());
        node.children = vec![Self::record_only(entity)];
        node.refresh();
        node
    }

    /// A `STACK` node with the given id over `members`.
    #[must_use]
    pub fn stack(id: String, members: Vec<StepNode>) -> Self {
        let mut node = Self::bare(id, ItemType::Stack, StepType::Add);
        node.children = members;
        node.refresh();
        node
    }

    /// Step number used for ordering; stacks use their first member's.
    #[must_use]
    pub fn step_number(&self) -> i64 {
        match &self.step {
            Some(step) => step.step_number,
            None => self.children.first().map_or(i64::MIN, StepNode::step_number),
        }
    }

    /// Returns true for a plain `STEP` of type `ADD`.
    #[must_use]
    pub fn is_add_step(&self) -> bool {
        self.item_type == ItemType::Step && self.step_type == StepType::Add
    }

    /// Returns true if this node owns children.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.item_type.is_container()
    }

    /// Returns true if `children[index]` is this container's own step.
    #[must_use]
    pub fn is_anchor_index(&self, index: usize) -> bool {
        index == 0
            && matches!(self.item_type, ItemType::Final | ItemType::Group)
            && self.children.first().is_some_and(|c| c.id == self.id)
    }

    /// Recomputes `covered_ids` and children's `owner_id` for this subtree,
    /// bottom-up.
    pub fn refresh(&mut self) {
        let mut covered = BTreeSet::new();
        covered.insert(self.id.clone());
        for child in &mut self.children {
            child.owner_id = Some(self.id.clone());
            child.refresh();
            covered.extend(child.covered_ids.iter().cloned());
        }
        self.covered_ids = covered;
    }

    /// Number of nodes in this subtree, including itself.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(StepNode::subtree_len).sum::<usize>()
    }
}
