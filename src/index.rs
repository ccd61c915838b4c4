//! Id → occurrence lookup over a forest.
//!
//! One id routinely has several occurrences: a step shows up as a plain
//! `STEP` and again as the anchor child of its own `GROUP`/`FINAL`
//! container. Callers pick the one they want by item type or owner.

use std::collections::HashMap;

use crate::forest::Forest;
use crate::node::{ItemType, NodePath};

/// One located node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Where the node lives.
    pub path: NodePath,
    /// The node's item type at indexing time.
    pub item_type: ItemType,
    /// Id of the owning container, if any.
    pub owner_id: Option<String>,
}

/// Derived lookup table; rebuilt after every structural change.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    by_id: HashMap<String, Vec<Occurrence>>,
}

impl NodeIndex {
    /// Indexes every node of `forest`, in pre-order.
    #[must_use]
    pub fn build(forest: &Forest) -> Self {
        let mut by_id: HashMap<String, Vec<Occurrence>> = HashMap::new();
        for (path, node) in forest.walk() {
            by_id.entry(node.id.clone()).or_default().push(Occurrence {
                path,
                item_type: node.item_type,
                owner_id: node.owner_id.clone(),
            });
        }
        Self { by_id }
    }

    /// All occurrences of `id`.
    #[must_use]
    pub fn lookup(&self, id: &str) -> &[Occurrence] {
        self.by_id.get(id).map_or(&[], Vec::as_slice)
    }

    /// Occurrences of `id`, optionally restricted to one item type.
    #[must_use]
    pub fn lookup_filtered(&self, id: &str, item_type: Option<ItemType>) -> Vec<&Occurrence> {
        self.lookup(id)
            .iter()
            .filter(|o| item_type.map_or(true, |t| o.item_type == t))
            .collect()
    }

    /// First occurrence of `id` with the given item type.
    #[must_use]
    pub fn find(&self, id: &str, item_type: ItemType) -> Option<&NodePath> {
        self.lookup(id)
            .iter()
            .find(|o| o.item_type == item_type)
            .map(|o| &o.path)
    }

    /// Returns true if any node has this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of distinct ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_forest;
    use crate::config::HowConfig;
    use crate::repository::StepRepository;
    use crate::step::{RecordRef, ResolutionStep, VirtualEntityRef};

    fn forest() -> Forest {
        let single = |r: &str| VirtualEntityRef::singleton(format!("S-{r}"), RecordRef::new("DS", r));
        let base = |id: &str| VirtualEntityRef::composite(id, Vec::new());
        let steps = vec![
            ResolutionStep::new("V1", 1, single("A"), single("B")),
            ResolutionStep::new("V2", 2, base("V1"), single("C")),
            ResolutionStep::new("V3", 3, base("V2"), single("D")),
            ResolutionStep::new("V4", 4, base("V3"), single("E")),
        ];
        let repo = StepRepository::new(steps, vec![base("V4")]);
        build_forest(&repo, &HowConfig::default())
    }

    #[test]
    fn test_final_id_has_two_occurrences() {
        let forest = forest();
        let index = NodeIndex::build(&forest);
        let found = index.lookup("V4");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].item_type, ItemType::Final);
        assert_eq!(found[1].item_type, ItemType::Step);
        assert_eq!(found[1].owner_id.as_deref(), Some("V4"));
    }

    #[test]
    fn test_stack_is_indexed() {
        let forest = forest();
        let index = NodeIndex::build(&forest);
        let stack_id = forest.roots()[0].children[1].id.clone();
        let path = index.find(&stack_id, ItemType::Stack).unwrap();
        assert_eq!(forest.node(path).unwrap().children.len(), 2);
        let member = index.lookup("V3");
        assert_eq!(member[0].owner_id.as_deref(), Some(stack_id.as_str()));
    }

    #[test]
    fn test_filtered_lookup() {
        let forest = forest();
        let index = NodeIndex::build(&forest);
        assert_eq!(index.lookup_filtered("V4", Some(ItemType::Step)).len(), 1);
        assert_eq!(index.lookup_filtered("V4", None).len(), 2);
        assert!(index.lookup_filtered("V4", Some(ItemType::Group)).is_empty());
        assert!(index.lookup("nope").is_empty());
        assert!(!index.contains("nope"));
    }

    #[test]
    fn test_counts_distinct_ids() {
        let forest = forest();
        let index = NodeIndex::build(&forest);
        // V1..V4 plus one stack
        assert_eq!(index.len(), 5);
    }
}
