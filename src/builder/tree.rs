//! Reconstructs the step hierarchy from the flat step table.
//!
//! Every final state becomes a `FINAL` container whose first child is its
//! own step. The history beneath a plain step is spliced in as siblings at
//! the same level, while each input of a `MERGE` step is nested in its own
//! `GROUP` container. Recursion follows non-singleton sides only and keeps
//! the ids currently being built on a path stack, so malformed tables with
//! cycles or self-references degrade to leaves.

use crate::builder::compact::compact;
use crate::config::HowConfig;
use crate::error::Diagnostic;
use crate::forest::Forest;
use crate::node::{ItemType, StepNode, StepType};
use crate::repository::StepRepository;
use crate::step::{ResolutionStep, VirtualEntityRef};

/// Builds the forest for every final state in `repository`.
#[must_use]
pub fn build_forest(repository: &StepRepository, config: &HowConfig) -> Forest {
    let mut builder = TreeBuilder::new(repository, config);
    let roots: Vec<StepNode> = repository
        .final_states()
        .iter()
        .map(|f| builder.build_final(f))
        .collect();

    let mut diagnostics = repository.diagnostics().to_vec();
    diagnostics.extend(builder.into_diagnostics());
    tracing::debug!(
        roots = roots.len(),
        steps = repository.len(),
        diagnostics = diagnostics.len(),
        "built resolution forest"
    );
    Forest::new(roots, diagnostics)
}

/// Recursive forest builder over one repository.
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    repository: &'a StepRepository,
    config: &'a HowConfig,
    building: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub fn new(repository: &'a StepRepository, config: &'a HowConfig) -> Self {
        Self {
            repository,
            config,
            building: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the builder, returning its diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Builds the `FINAL` root for one final state.
    pub fn build_final(&mut self, final_state: &VirtualEntityRef) -> StepNode {
        let repository = self.repository;
        match repository.get(&final_state.id) {
            Some(step) => self.build_container(step, ItemType::Final, 0),
            None => {
                tracing::debug!(final_id = %final_state.id, "final state has no step history");
                StepNode::synthetic_final(final_state)
            }
        }
    }

    /// Builds a `FINAL` or `GROUP` container: the step itself first, then its
    /// history latest-first with `ADD` runs stacked.
    pub fn build_container(&mut self, step: &'a ResolutionStep, kind: ItemType, depth: usize) -> StepNode {
        self.building.push(step.resolved_id.clone());
        let mut ancestors = self.build_ancestors(step, depth);
        self.building.pop();

        ancestors.sort_by(|a, b| b.step_number().cmp(&a.step_number()));

        let mut children = Vec::with_capacity(ancestors.len() + 1);
        children.push(StepNode::step(step));
        children.extend(compact(ancestors, self.config.min_stack_size));
        StepNode::container(step, kind, children)
    }

    /// Builds one ancestor. Inputs of a merge become `GROUP` containers;
    /// anything else is a plain step followed by its own spliced history.
    fn build_node(&mut self, step: &'a ResolutionStep, parent_is_merge: bool, depth: usize) -> Vec<StepNode> {
        if parent_is_merge {
            return vec![self.build_container(step, ItemType::Group, depth)];
        }

        self.building.push(step.resolved_id.clone());
        let ancestors = self.build_ancestors(step, depth);
        self.building.pop();

        let mut out = Vec::with_capacity(ancestors.len() + 1);
        out.push(StepNode::step(step));
        out.extend(ancestors);
        out
    }

    fn build_ancestors(&mut self, step: &'a ResolutionStep, depth: usize) -> Vec<StepNode> {
        let parent_is_merge = step.step_type() == StepType::Merge;
        let mut out = Vec::new();
        for id in step.ancestor_ids() {
            if let Some(ancestor) = self.resolve_ancestor(step, id, depth) {
                out.extend(self.build_node(ancestor, parent_is_merge, depth + 1));
            }
        }
        out
    }

    fn resolve_ancestor(&mut self, step: &ResolutionStep, id: &str, depth: usize) -> Option<&'a ResolutionStep> {
        if id == step.resolved_id {
            tracing::warn!(step_id = %step.resolved_id, "step references itself; treating as leaf");
            self.diagnostics.push(Diagnostic::SelfReference {
                step_id: step.resolved_id.clone(),
            });
            return None;
        }
        if self.building.iter().any(|b| b == id) {
            tracing::warn!(step_id = %step.resolved_id, ancestor_id = %id, "cycle in step table; treating as leaf");
            self.diagnostics.push(Diagnostic::CycleDetected {
                step_id: id.to_string(),
            });
            return None;
        }
        if depth + 1 > self.config.max_depth {
            tracing::warn!(step_id = %step.resolved_id, limit = self.config.max_depth, "depth limit reached");
            self.diagnostics.push(Diagnostic::DepthLimit {
                step_id: step.resolved_id.clone(),
                limit: self.config.max_depth,
            });
            return None;
        }

        let repository = self.repository;
        let found = repository.get(id);
        if found.is_none() && !repository.is_final(id) {
            tracing::warn!(step_id = %step.resolved_id, referenced_id = %id, "missing step reference");
            self.diagnostics.push(Diagnostic::MissingStepReference {
                step_id: step.resolved_id.clone(),
                referenced_id: id.to_string(),
            });
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::RecordRef;

    fn single(rec: &str) -> VirtualEntityRef {
        VirtualEntityRef::singleton(format!("S-{rec}"), RecordRef::new("DS", rec))
    }

    fn base(id: &str) -> VirtualEntityRef {
        VirtualEntityRef::composite(id, Vec::new())
    }

    fn ids(nodes: &[StepNode]) -> Vec<(ItemType, String)> {
        nodes.iter().map(|n| (n.item_type, n.id.clone())).collect()
    }

    #[test]
    fn test_add_chain_is_spliced_and_stacked() {
        let steps = vec![
            ResolutionStep::new("V1", 1, single("A"), single("B")),
            ResolutionStep::new("V2", 2, base("V1"), single("C")),
            ResolutionStep::new("V3", 3, base("V2"), single("D")),
            ResolutionStep::new("V4", 4, single("E"), base("V3")),
        ];
        let repo = StepRepository::new(steps, vec![base("V4")]);
        let forest = build_forest(&repo, &HowConfig::default());

        let root = &forest.roots()[0];
        assert_eq!(root.item_type, ItemType::Final);
        assert_eq!(root.step_type, StepType::Final);
        assert_eq!(root.children[0].id, "V4");
        assert_eq!(root.children[0].step_type, StepType::Add);
        assert_eq!(root.children[1].item_type, ItemType::Stack);
        assert_eq!(ids(&root.children[1].children), vec![(ItemType::Step, "V3".into()), (ItemType::Step, "V2".into())]);
        assert_eq!(root.children[2].id, "V1");
        assert_eq!(root.children[2].step_type, StepType::Create);
    }

    #[test]
    fn test_merge_inputs_become_groups() {
        let steps = vec![
            ResolutionStep::new("V1", 1, single("A"), single("B")),
            ResolutionStep::new("V2", 2, single("C"), single("D")),
            ResolutionStep::new("V3", 3, base("V1"), base("V2")),
        ];
        let repo = StepRepository::new(steps, vec![base("V3")]);
        let forest = build_forest(&repo, &HowConfig::default());

        let root = &forest.roots()[0];
        assert_eq!(root.children[0].step_type, StepType::Merge);
        assert_eq!(
            ids(&root.children[1..]),
            vec![(ItemType::Group, "V2".into()), (ItemType::Group, "V1".into())]
        );
        for group in &root.children[1..] {
            assert_eq!(group.step_type, StepType::Interim);
            assert_eq!(group.children[0].id, group.id);
            assert_eq!(group.children[0].item_type, ItemType::Step);
        }
    }

    #[test]
    fn test_self_reference_is_leaf() {
        let steps = vec![ResolutionStep::new("V1", 1, base("V1"), single("A"))];
        let repo = StepRepository::new(steps, vec![base("V1")]);
        let forest = build_forest(&repo, &HowConfig::default());
        assert_eq!(forest.roots()[0].children.len(), 1);
        assert_eq!(
            forest.diagnostics(),
            &[Diagnostic::SelfReference { step_id: "V1".into() }]
        );
    }

    #[test]
    fn test_cycle_is_cut() {
        let steps = vec![
            ResolutionStep::new("V1", 1, base("V2"), single("A")),
            ResolutionStep::new("V2", 2, base("V1"), single("B")),
        ];
        let repo = StepRepository::new(steps, vec![base("V2")]);
        let forest = build_forest(&repo, &HowConfig::default());
        let root = &forest.roots()[0];
        assert_eq!(root.covered_ids.len(), 2);
        assert!(forest
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::CycleDetected { .. })));
    }

    #[test]
    fn test_missing_reference_is_leaf() {
        let steps = vec![ResolutionStep::new("V2", 2, base("V1"), single("C"))];
        let repo = StepRepository::new(steps, vec![base("V2")]);
        let forest = build_forest(&repo, &HowConfig::default());
        assert_eq!(forest.roots()[0].children.len(), 1);
        assert_eq!(
            forest.diagnostics(),
            &[Diagnostic::MissingStepReference {
                step_id: "V2".into(),
                referenced_id: "V1".into()
            }]
        );
    }

    #[test]
    fn test_depth_limit_stops_recursion() {
        let steps = vec![
            ResolutionStep::new("V1", 1, single("A"), single("B")),
            ResolutionStep::new("V2", 2, base("V1"), single("C")),
            ResolutionStep::new("V3", 3, base("V2"), single("D")),
        ];
        let repo = StepRepository::new(steps, vec![base("V3")]);
        let config = HowConfig {
            max_depth: 1,
            ..HowConfig::default()
        };
        let forest = build_forest(&repo, &config);
        assert!(!forest.roots()[0].covered_ids.contains("V1"));
        assert!(matches!(
            forest.diagnostics()[0],
            Diagnostic::DepthLimit { limit: 1, .. }
        ));
    }

    #[test]
    fn test_final_without_history_is_synthetic() {
        let repo = StepRepository::new(Vec::new(), vec![single("Z")]);
        let forest = build_forest(&repo, &HowConfig::default());
        let root = &forest.roots()[0];
        assert_eq!(root.item_type, ItemType::Final);
        assert_eq!(root.children.len(), 1);
        assert!(root.children[0].virtual_entity.is_some());
        assert!(forest.diagnostics().is_empty());
    }
}
