//! The resolution forest: root `FINAL` nodes with parent-owned children.

use serde::Serialize;

use crate::error::{Diagnostic, HowError};
use crate::node::{ItemType, NodePath, StepNode};

/// Ordered `FINAL` roots plus the diagnostics recorded while building them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forest {
    roots: Vec<StepNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

impl Forest {
    /// Wraps already-built roots.
    #[must_use]
    pub fn new(roots: Vec<StepNode>, diagnostics: Vec<Diagnostic>) -> Self {
        let mut forest = Self { roots, diagnostics };
        forest.refresh();
        forest
    }

    /// Root nodes in final-state order.
    #[must_use]
    pub fn roots(&self) -> &[StepNode] {
        &self.roots
    }

    /// Diagnostics recorded while building.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns true if the forest has no roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(StepNode::subtree_len).sum()
    }

    /// Resolves a path to a node. The root path has no node.
    #[must_use]
    pub fn node(&self, path: &NodePath) -> Option<&StepNode> {
        let (first, rest) = path.as_slice().split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// Mutable variant of [`Forest::node`].
    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut StepNode> {
        let (first, rest) = path.as_slice().split_first()?;
        let mut node = self.roots.get_mut(*first)?;
        for &i in rest {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    /// The child sequence addressed by `path`: the roots for the root path,
    /// otherwise the children of the node at `path`.
    #[must_use]
    pub fn children(&self, path: &NodePath) -> Option<&[StepNode]> {
        if path.depth() == 0 {
            return Some(&self.roots);
        }
        self.node(path).map(|n| n.children.as_slice())
    }

    /// Mutable variant of [`Forest::children`].
    pub fn children_mut(&mut self, path: &NodePath) -> Option<&mut Vec<StepNode>> {
        if path.depth() == 0 {
            return Some(&mut self.roots);
        }
        self.node_mut(path).map(|n| &mut n.children)
    }

    /// Recomputes `covered_ids` and owner ids for every node.
    pub fn refresh(&mut self) {
        for root in &mut self.roots {
            root.owner_id = None;
            root.refresh();
        }
    }

    /// Every node with its path, depth-first, parents before children.
    #[must_use]
    pub fn walk(&self) -> Vec<(NodePath, &StepNode)> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack: Vec<(NodePath, &StepNode)> = self
            .roots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, n)| (NodePath::root().child(i), n))
            .collect();
        while let Some((path, node)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((path.child(i), child));
            }
            out.push((path, node));
        }
        out
    }

    /// Stable digest of the forest's structure.
    ///
    /// Stack ids are masked so that re-creating an equivalent stack does not
    /// change the digest.
    #[must_use]
    pub fn shape_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (path, node) in self.walk() {
            let id = if node.item_type == ItemType::Stack {
                "*"
            } else {
                node.id.as_str()
            };
            let line = format!("{}|{}|{}|{}\n", path.depth(), node.item_type, node.step_type, id);
            hasher.update(line.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Serialize the forest to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, HowError> {
        serde_json::to_string_pretty(self).map_err(|e| HowError::internal(format!("serialize forest: {e}")))
    }
}
