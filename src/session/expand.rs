//! Expand and collapse commands.
//!
//! Expanding a node also expands every container covering it, so the node is
//! actually visible. Collapsing a container collapses everything beneath it.

use crate::node::{ItemType, NodePath, StepNode};
use crate::session::{HowSession, UiState};

impl HowSession {
    /// Expands every node with this id (optionally of one item type) and
    /// all containers covering it. Returns false if nothing matched.
    pub fn expand_node(&mut self, id: &str, item_type: Option<ItemType>) -> bool {
        let paths = self.matching_paths(id, item_type, None);
        if paths.is_empty() {
            tracing::warn!(node_id = %id, ?item_type, "expand ignored: node not found");
            return false;
        }
        self.expand_paths(&paths);
        true
    }

    /// Collapses every node with this id (optionally of one item type) and
    /// everything nested beneath it. Returns false if nothing matched.
    pub fn collapse_node(&mut self, id: &str, item_type: Option<ItemType>) -> bool {
        let paths = self.matching_paths(id, item_type, None);
        if paths.is_empty() {
            tracing::warn!(node_id = %id, ?item_type, "collapse ignored: node not found");
            return false;
        }
        self.collapse_paths(&paths);
        true
    }

    /// Flips the expansion of `id`. With `group_id`, only occurrences owned by
    /// that container (or the container itself) are considered.
    pub fn toggle_expansion(&mut self, id: &str, group_id: Option<&str>, item_type: Option<ItemType>) -> bool {
        let paths = self.matching_paths(id, item_type, group_id);
        if paths.is_empty() {
            tracing::warn!(node_id = %id, ?group_id, ?item_type, "toggle ignored: node not found");
            return false;
        }
        let expanded = paths.iter().any(|path| {
            self.forest
                .node(path)
                .is_some_and(|n| self.state.is_expanded(n.item_type, &n.id))
        });
        if expanded {
            self.collapse_paths(&paths);
        } else {
            self.expand_paths(&paths);
        }
        true
    }

    /// Collapses everything except the ids in `exclude`.
    pub fn collapse_all(&mut self, exclude: &[&str]) {
        self.state.collapse_all(exclude);
    }

    /// Expands every container.
    pub fn expand_all(&mut self) {
        for (_, node) in self.forest.walk() {
            if node.is_container() {
                self.state.mark_expanded(node.item_type, &node.id);
            }
        }
    }

    /// Expands the steps that introduced a record so it is visible.
    /// Returns false if no step introduced it.
    pub fn reveal_record(&mut self, data_source: &str, record_id: &str) -> bool {
        let step_ids: Vec<String> = self
            .repository
            .steps_for_record(data_source, record_id)
            .into_iter()
            .map(|s| s.resolved_id.clone())
            .collect();
        let mut revealed = false;
        for id in &step_ids {
            revealed |= self.expand_node(id, Some(ItemType::Step));
        }
        if !revealed {
            tracing::debug!(data_source, record_id, "record not introduced by any step");
        }
        revealed
    }

    pub(crate) fn matching_paths(&self, id: &str, item_type: Option<ItemType>, owner: Option<&str>) -> Vec<NodePath> {
        self.index
            .lookup_filtered(id, item_type)
            .into_iter()
            .filter(|o| owner.map_or(true, |g| id == g || o.owner_id.as_deref() == Some(g)))
            .map(|o| o.path.clone())
            .collect()
    }

    fn expand_paths(&mut self, paths: &[NodePath]) {
        for path in paths {
            let Some(node) = self.forest.node(path) else {
                continue;
            };
            self.state.mark_expanded(node.item_type, &node.id);

            for (_, container) in self.forest.walk() {
                if container.is_container() && container.covered_ids.contains(&node.id) {
                    self.state.mark_expanded(container.item_type, &container.id);
                }
            }

            let sole_child = node.is_container() && node.children.len() == 1;
            if sole_child {
                self.expand_paths(&[path.child(0)]);
            }
        }
    }

    fn collapse_paths(&mut self, paths: &[NodePath]) {
        for path in paths {
            if let Some(node) = self.forest.node(path) {
                collapse_subtree(node, &mut self.state);
            }
        }
    }
}

fn collapse_subtree(node: &StepNode, state: &mut UiState) {
    state.mark_collapsed(node.item_type, &node.id);
    for child in &node.children {
        collapse_subtree(child, state);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::HowConfig;
    use crate::node::ItemType;
    use crate::repository::StepRepository;
    use crate::session::HowSession;
    use crate::step::{RecordRef, ResolutionStep, VirtualEntityRef};

    fn single(r: &str) -> VirtualEntityRef {
        VirtualEntityRef::singleton(format!("S-{r}"), RecordRef::new("DS", r))
    }

    fn base(id: &str) -> VirtualEntityRef {
        VirtualEntityRef::composite(id, Vec::new())
    }

    /// FINAL V6 = MERGE(V1, V5); V5's group holds a stack of V4, V3, V2.
    fn session() -> HowSession {
        let repo = StepRepository::new(
            vec![
                ResolutionStep::new("V1", 1, single("A"), single("B")),
                ResolutionStep::new("V0", 0, single("C"), single("D")),
                ResolutionStep::new("V2", 2, base("V0"), single("E")),
                ResolutionStep::new("V3", 3, base("V2"), single("F")),
                ResolutionStep::new("V4", 4, base("V3"), single("G")),
                ResolutionStep::new("V5", 5, base("V4"), single("H")),
                ResolutionStep::new("V6", 6, base("V1"), base("V5")),
            ],
            vec![base("V6")],
        );
        let config = HowConfig {
            auto_expand_finals: false,
            ..HowConfig::default()
        };
        HowSession::new("E1", repo, config)
    }

    fn stack_id(session: &HowSession) -> String {
        let group = session.node_by_id("V5", Some(ItemType::Group)).unwrap();
        group.children[1].id.clone()
    }

    #[test]
    fn test_expand_leaf_expands_ancestors() {
        let mut s = session();
        let stack = stack_id(&s);
        assert!(s.expand_node("V3", Some(ItemType::Step)));
        assert!(s.is_step_expanded("V3"));
        assert!(s.is_group_expanded(&stack));
        assert!(s.is_group_expanded("V5"));
        assert!(s.is_group_expanded("V6"));
        assert!(!s.is_group_expanded("V1"));
    }

    #[test]
    fn test_expand_sole_child_cascades() {
        let mut s = session();
        assert!(s.expand_node("V1", Some(ItemType::Group)));
        assert!(s.is_group_expanded("V1"));
        assert!(s.is_step_expanded("V1"));
        assert!(s.is_group_expanded("V6"));
    }

    #[test]
    fn test_collapse_cascades_to_descendants() {
        let mut s = session();
        let stack = stack_id(&s);
        s.expand_node("V3", Some(ItemType::Step));
        assert!(s.collapse_node("V5", Some(ItemType::Group)));
        assert!(!s.is_group_expanded("V5"));
        assert!(!s.is_group_expanded(&stack));
        assert!(!s.is_step_expanded("V3"));
        assert!(s.is_group_expanded("V6"));
    }

    #[test]
    fn test_toggle_flips_state() {
        let mut s = session();
        assert!(s.toggle_expansion("V5", None, Some(ItemType::Group)));
        assert!(s.is_group_expanded("V5"));
        assert!(s.toggle_expansion("V5", None, Some(ItemType::Group)));
        assert!(!s.is_group_expanded("V5"));
    }

    #[test]
    fn test_toggle_scoped_to_group() {
        let mut s = session();
        // the V5 step anchored inside its own group
        assert!(s.toggle_expansion("V5", Some("V5"), Some(ItemType::Step)));
        assert!(s.is_step_expanded("V5"));
        // V5 is not owned by V1
        assert!(!s.toggle_expansion("V5", Some("V1"), Some(ItemType::Step)));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut s = session();
        assert!(!s.expand_node("nope", None));
        assert!(!s.collapse_node("nope", None));
        assert!(!s.toggle_expansion("nope", None, None));
    }

    #[test]
    fn test_collapse_all_and_expand_all() {
        let mut s = session();
        s.expand_all();
        assert!(s.is_group_expanded("V1"));
        assert!(s.is_group_expanded(&stack_id(&s)));
        s.expand_node("V2", Some(ItemType::Step));
        s.collapse_all(&["V2"]);
        assert_eq!(s.state().expanded_groups().count(), 0);
        assert_eq!(s.state().expanded_steps().collect::<Vec<_>>(), vec!["V2"]);
    }

    #[test]
    fn test_reveal_record() {
        let mut s = session();
        assert!(s.reveal_record("DS", "F"));
        assert!(s.is_step_expanded("V3"));
        assert!(s.is_group_expanded("V6"));
        assert!(!s.reveal_record("DS", "nobody"));
    }
}
