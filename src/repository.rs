//! Read-only view over one "how" payload.
//!
//! The backend returns a flat table of resolution steps keyed by the virtual
//! entity each step produced, plus the final states of the queried entity.
//! The repository indexes the table by `resolved_id` and records anything
//! malformed as a [`Diagnostic`] instead of failing.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Diagnostic, PayloadError};
use crate::node::StepType;
use crate::step::{RecordRef, ResolutionStep, VirtualEntityRef};

/// Step table as sent by the backend: an id-keyed object or a plain array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepTable {
    /// `{ "V1": {...}, "V2": {...} }`
    Keyed(KeyedSteps),
    /// `[ {...}, {...} ]`
    Listed(Vec<ResolutionStep>),
}

impl Default for StepTable {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

impl StepTable {
    /// Consumes the table, yielding steps in table order.
    #[must_use]
    pub fn into_steps(self) -> Vec<ResolutionStep> {
        match self {
            Self::Keyed(KeyedSteps(entries)) => entries.into_iter().map(|(_, step)| step).collect(),
            Self::Listed(steps) => steps,
        }
    }
}

/// Id-keyed steps in payload order.
///
/// Key order decides which step wins when two keys share a `resolved_id`,
/// so the object is decoded entry by entry rather than into a sorted map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedSteps(pub Vec<(String, ResolutionStep)>);

impl Serialize for KeyedSteps {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, step) in &self.0 {
            map.serialize_entry(key, step)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyedSteps {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyedStepsVisitor;

        impl<'de> Visitor<'de> for KeyedStepsVisitor {
            type Value = KeyedSteps;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of resolution steps keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, step)) = access.next_entry::<String, ResolutionStep>()? {
                    entries.push((key, step));
                }
                Ok(KeyedSteps(entries))
            }
        }

        deserializer.deserialize_map(KeyedStepsVisitor)
    }
}

/// Final states as sent by the backend: a bare array or wrapped in an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalStates {
    /// `[ {...} ]`
    Listed(Vec<VirtualEntityRef>),
    /// `{ "virtualEntities": [ {...} ] }`
    Wrapped {
        /// The wrapped final states.
        #[serde(rename = "virtualEntities")]
        virtual_entities: Vec<VirtualEntityRef>,
    },
}

impl Default for FinalStates {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

impl FinalStates {
    /// Consumes the wrapper, yielding final states in backend order.
    #[must_use]
    pub fn into_entities(self) -> Vec<VirtualEntityRef> {
        match self {
            Self::Listed(v) | Self::Wrapped { virtual_entities: v } => v,
        }
    }
}

/// One "how" payload for a single entity id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HowPayload {
    #[serde(default)]
    pub resolution_steps: StepTable,
    #[serde(default, alias = "finalState")]
    pub final_states: FinalStates,
}

impl HowPayload {
    /// Deserialize a payload from JSON.
    pub fn from_json(s: &str) -> Result<Self, PayloadError> {
        serde_json::from_str(s).map_err(|e| PayloadError::Parse {
            message: e.to_string(),
        })
    }
}

/// Aggregate counts over a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HowSummary {
    pub final_states: usize,
    pub steps: usize,
    pub creates: usize,
    pub adds: usize,
    pub merges: usize,
    /// Distinct records across all final states.
    pub records: usize,
}

/// Indexed, immutable step table plus final states.
#[derive(Debug, Clone, Default)]
pub struct StepRepository {
    steps: HashMap<String, ResolutionStep>,
    final_states: Vec<VirtualEntityRef>,
    diagnostics: Vec<Diagnostic>,
}

impl StepRepository {
    /// Indexes `steps` by resolved id. The first step seen for an id wins.
    pub fn new(steps: impl IntoIterator<Item = ResolutionStep>, final_states: Vec<VirtualEntityRef>) -> Self {
        let mut by_id: HashMap<String, ResolutionStep> = HashMap::new();
        let mut diagnostics = Vec::new();

        for step in steps {
            if step.resolved_id.trim().is_empty() {
                tracing::warn!(step_number = step.step_number, "ignoring step with empty resolved id");
                diagnostics.push(Diagnostic::EmptyStepId {
                    step_number: step.step_number,
                });
                continue;
            }
            if by_id.contains_key(&step.resolved_id) {
                tracing::warn!(step_id = %step.resolved_id, "duplicate step key; keeping first");
                diagnostics.push(Diagnostic::DuplicateStepKey {
                    id: step.resolved_id.clone(),
                });
                continue;
            }
            by_id.insert(step.resolved_id.clone(), step);
        }

        Self {
            steps: by_id,
            final_states,
            diagnostics,
        }
    }

    /// Builds a repository from a decoded payload.
    #[must_use]
    pub fn from_payload(payload: HowPayload) -> Self {
        Self::new(
            payload.resolution_steps.into_steps(),
            payload.final_states.into_entities(),
        )
    }

    /// Decodes and indexes a JSON payload.
    pub fn from_json(s: &str) -> Result<Self, PayloadError> {
        HowPayload::from_json(s).map(Self::from_payload)
    }

    /// Looks up the step that produced virtual entity `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResolutionStep> {
        self.steps.get(id)
    }

    /// Returns true if the table has a step for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Number of indexed steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Final states in backend order.
    #[must_use]
    pub fn final_states(&self) -> &[VirtualEntityRef] {
        &self.final_states
    }

    /// Returns true if `id` is one of the final states.
    #[must_use]
    pub fn is_final(&self, id: &str) -> bool {
        self.final_states.iter().any(|f| f.id == id)
    }

    /// Problems found while indexing.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// All steps, latest first.
    #[must_use]
    pub fn steps_by_number(&self) -> Vec<&ResolutionStep> {
        let mut steps: Vec<&ResolutionStep> = self.steps.values().collect();
        steps.sort_by(|a, b| {
            b.step_number
                .cmp(&a.step_number)
                .then_with(|| a.resolved_id.cmp(&b.resolved_id))
        });
        steps
    }

    /// Steps whose singleton side introduced the given record, earliest first.
    #[must_use]
    pub fn steps_for_record(&self, data_source: &str, record_id: &str) -> Vec<&ResolutionStep> {
        let mut found: Vec<&ResolutionStep> = self
            .steps
            .values()
            .filter(|s| s.introduces_record(data_source, record_id))
            .collect();
        found.sort_by_key(|s| s.step_number);
        found
    }

    /// Aggregate counts for headers and summaries.
    #[must_use]
    pub fn summary(&self) -> HowSummary {
        let mut summary = HowSummary {
            final_states: self.final_states.len(),
            steps: self.steps.len(),
            ..HowSummary::default()
        };
        for step in self.steps.values() {
            match step.step_type() {
                StepType::Create => summary.creates += 1,
                StepType::Add => summary.adds += 1,
                StepType::Merge => summary.merges += 1,
                StepType::Interim | StepType::Final => {}
            }
        }
        let records: BTreeSet<&RecordRef> = self
            .final_states
            .iter()
            .flat_map(|f| f.records.iter())
            .collect();
        summary.records = records.len();
        summary
    }
}
