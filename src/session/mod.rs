//! The UI state engine.
//!
//! A [`HowSession`] owns everything derived from one loaded entity: the step
//! repository, the forest built from it, the node index and the expansion
//! and pin sets. Loading another entity replaces all of it at once. Every
//! command takes `&mut self` and finishes its refresh and reindex before
//! returning, so readers never see a half-applied edit.

pub mod expand;
pub mod pin;
pub mod state;

pub use state::UiState;

use chrono::{DateTime, Utc};

use crate::builder::build_forest;
use crate::config::HowConfig;
use crate::error::{Diagnostic, HowResult};
use crate::forest::Forest;
use crate::index::NodeIndex;
use crate::node::{ItemType, StepNode};
use crate::repository::{HowSummary, StepRepository};

/// Forest plus interactive state for one loaded entity.
#[derive(Debug, Clone)]
pub struct HowSession {
    entity_id: String,
    loaded_at: DateTime<Utc>,
    config: HowConfig,
    repository: StepRepository,
    forest: Forest,
    index: NodeIndex,
    state: UiState,
}

impl HowSession {
    /// Builds the forest for `repository` and applies initial expansion.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, repository: StepRepository, config: HowConfig) -> Self {
        let forest = build_forest(&repository, &config);
        let index = NodeIndex::build(&forest);
        let mut session = Self {
            entity_id: entity_id.into(),
            loaded_at: Utc::now(),
            config,
            repository,
            forest,
            index,
            state: UiState::new(),
        };
        session.apply_initial_expansion();
        tracing::debug!(
            entity_id = %session.entity_id,
            nodes = session.forest.node_count(),
            "loaded how session"
        );
        session
    }

    /// Decodes a JSON payload and builds a session from it.
    pub fn from_json(entity_id: impl Into<String>, payload: &str, config: HowConfig) -> HowResult<Self> {
        config.validate()?;
        let repository = StepRepository::from_json(payload)?;
        Ok(Self::new(entity_id, repository, config))
    }

    /// Discards the current forest and state and loads another entity.
    pub fn reload(&mut self, entity_id: impl Into<String>, repository: StepRepository) {
        let config = self.config.clone();
        *self = Self::new(entity_id, repository, config);
    }

    /// Id of the loaded entity.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// When the current forest was built.
    #[must_use]
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    #[must_use]
    pub const fn config(&self) -> &HowConfig {
        &self.config
    }

    #[must_use]
    pub const fn repository(&self) -> &StepRepository {
        &self.repository
    }

    /// The current forest.
    #[must_use]
    pub const fn forest(&self) -> &Forest {
        &self.forest
    }

    #[must_use]
    pub const fn state(&self) -> &UiState {
        &self.state
    }

    /// Diagnostics from indexing and building.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.forest.diagnostics()
    }

    /// Aggregate counts over the loaded payload.
    #[must_use]
    pub fn summary(&self) -> HowSummary {
        self.repository.summary()
    }

    /// Structure digest of the current forest.
    #[must_use]
    pub fn shape_digest(&self) -> String {
        self.forest.shape_digest()
    }

    #[must_use]
    pub fn is_step_expanded(&self, id: &str) -> bool {
        self.state.is_step_expanded(id)
    }

    #[must_use]
    pub fn is_group_expanded(&self, id: &str) -> bool {
        self.state.is_group_expanded(id)
    }

    #[must_use]
    pub fn is_step_pinned(&self, id: &str) -> bool {
        self.state.is_pinned(id)
    }

    /// Returns true if `id` sits directly in a stack; in `stack_id` when given,
    /// in any stack otherwise.
    #[must_use]
    pub fn is_step_member_of_stack(&self, id: &str, stack_id: Option<&str>) -> bool {
        if let Some(stack_id) = stack_id {
            return self
                .index
                .find(stack_id, ItemType::Stack)
                .and_then(|path| self.forest.node(path))
                .is_some_and(|stack| stack.children.iter().any(|c| c.id == id));
        }
        self.index.lookup(id).iter().any(|o| {
            o.item_type == ItemType::Step
                && o.path
                    .parent()
                    .and_then(|p| self.forest.node(&p))
                    .is_some_and(|parent| parent.item_type == ItemType::Stack)
        })
    }

    /// First node with this id, optionally of one item type.
    #[must_use]
    pub fn node_by_id(&self, id: &str, item_type: Option<ItemType>) -> Option<&StepNode> {
        self.index
            .lookup_filtered(id, item_type)
            .first()
            .and_then(|o| self.forest.node(&o.path))
    }

    /// Every node with this id.
    #[must_use]
    pub fn nodes_by_id(&self, id: &str) -> Vec<&StepNode> {
        self.index
            .lookup(id)
            .iter()
            .filter_map(|o| self.forest.node(&o.path))
            .collect()
    }

    /// Recomputes covered ids and rebuilds the index after a structural edit.
    fn reindex(&mut self) {
        self.forest.refresh();
        self.index = NodeIndex::build(&self.forest);
    }

    fn apply_initial_expansion(&mut self) {
        if !self.config.auto_expand_finals {
            return;
        }
        for root in self.forest.roots() {
            self.state.mark_expanded(root.item_type, &root.id);
            auto_expand(root, &mut self.state, &self.config);
        }
    }
}

/// Expands beneath an expanded container: a sole child always, otherwise
/// groups small enough to be worth showing open.
fn auto_expand(node: &StepNode, state: &mut UiState, config: &HowConfig) {
    if let [only] = node.children.as_slice() {
        state.mark_expanded(only.item_type, &only.id);
        if only.is_container() {
            auto_expand(only, state, config);
        }
        return;
    }
    for child in &node.children {
        if child.item_type == ItemType::Group && child.covered_ids.len() <= config.auto_expand_max_steps {
            state.mark_expanded(child.item_type, &child.id);
            auto_expand(child, state, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{RecordRef, ResolutionStep, VirtualEntityRef};

    fn single(r: &str) -> VirtualEntityRef {
        VirtualEntityRef::singleton(format!("S-{r}"), RecordRef::new("DS", r))
    }

    fn base(id: &str) -> VirtualEntityRef {
        VirtualEntityRef::composite(id, Vec::new())
    }

    fn merge_repo() -> StepRepository {
        StepRepository::new(
            vec![
                ResolutionStep::new("V1", 1, single("A"), single("B")),
                ResolutionStep::new("V2", 2, single("C"), single("D")),
                ResolutionStep::new("V3", 3, base("V2"), single("E")),
                ResolutionStep::new("V4", 4, base("V3"), single("F")),
                ResolutionStep::new("V5", 5, base("V1"), base("V4")),
            ],
            vec![base("V5"), single("Z")],
        )
    }

    #[test]
    fn test_initial_expansion() {
        let session = HowSession::new("E1", merge_repo(), HowConfig::default());
        assert!(session.is_group_expanded("V5"));
        // V1 covers only itself; V4's group covers V4, V3 and V2
        assert!(session.is_group_expanded("V1"));
        assert!(session.is_step_expanded("V1"));
        assert!(session.is_group_expanded("V4"));
        // synthetic final with a single child
        assert!(session.is_group_expanded("S-Z"));
        assert!(session.is_step_expanded("S-Z"));
    }

    #[test]
    fn test_initial_expansion_skips_large_groups() {
        let config = HowConfig {
            auto_expand_max_steps: 2,
            ..HowConfig::default()
        };
        let session = HowSession::new("E1", merge_repo(), config);
        assert!(session.is_group_expanded("V5"));
        assert!(session.is_group_expanded("V1"));
        assert!(!session.is_group_expanded("V4"));
    }

    #[test]
    fn test_initial_expansion_disabled() {
        let config = HowConfig {
            auto_expand_finals: false,
            ..HowConfig::default()
        };
        let session = HowSession::new("E1", merge_repo(), config);
        assert_eq!(session.state().expanded_groups().count(), 0);
    }

    #[test]
    fn test_node_lookup_disambiguates_by_type() {
        let session = HowSession::new("E1", merge_repo(), HowConfig::default());
        assert_eq!(session.nodes_by_id("V5").len(), 2);
        let step = session.node_by_id("V5", Some(ItemType::Step)).unwrap();
        assert_eq!(step.owner_id.as_deref(), Some("V5"));
        let group = session.node_by_id("V4", Some(ItemType::Group)).unwrap();
        assert_eq!(group.children[0].id, "V4");
        assert!(session.node_by_id("V4", Some(ItemType::Final)).is_none());
    }

    #[test]
    fn test_stack_membership() {
        let session = HowSession::new("E1", merge_repo(), HowConfig::default());
        let group = session.node_by_id("V4", Some(ItemType::Group)).unwrap();
        // V4 group: [V4, V3, V2]; V3 is a lone ADD next to a CREATE
        assert!(!group.children.iter().any(|c| c.item_type == ItemType::Stack));
        assert!(!session.is_step_member_of_stack("V3", None));
    }

    #[test]
    fn test_reload_replaces_everything() {
        let mut session = HowSession::new("E1", merge_repo(), HowConfig::default());
        session.expand_node("V4", Some(ItemType::Group));
        let other = StepRepository::new(
            vec![ResolutionStep::new("W1", 1, single("X"), single("Y"))],
            vec![base("W1")],
        );
        let first_load = session.loaded_at();
        session.reload("E2", other);
        assert_eq!(session.entity_id(), "E2");
        assert!(session.loaded_at() >= first_load);
        assert!(!session.is_group_expanded("V4"));
        assert!(session.is_group_expanded("W1"));
        assert_eq!(session.forest().roots().len(), 1);
    }

    #[test]
    fn test_loaded_at_is_stamped_at_build() {
        let before = Utc::now();
        let session = HowSession::new("E1", merge_repo(), HowConfig::default());
        let after = Utc::now();
        assert!(session.loaded_at() >= before);
        assert!(session.loaded_at() <= after);
    }

    #[test]
    fn test_from_json_validates_config() {
        let config = HowConfig {
            min_stack_size: 0,
            ..HowConfig::default()
        };
        let err = HowSession::from_json("E1", "{}", config).unwrap_err();
        assert!(err.is_config());
        let err = HowSession::from_json("E1", "{oops", HowConfig::default()).unwrap_err();
        assert!(err.is_payload());
    }

    #[test]
    fn test_summary_passthrough() {
        let session = HowSession::new("E1", merge_repo(), HowConfig::default());
        let summary = session.summary();
        assert_eq!(summary.merges, 1);
        assert_eq!(summary.final_states, 2);
    }
}
