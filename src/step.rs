//! Resolution steps and the virtual entities they combine.
//!
//! These types mirror what the resolution backend returns. They are
//! immutable once decoded; the tree builder only ever borrows them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::StepType;

/// A single input record, identified by data source and record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    /// Data source code the record was loaded from.
    pub data_source: String,
    /// Record id within the data source.
    pub record_id: String,
    /// Backend-internal id, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<i64>,
}

impl RecordRef {
    /// Creates a record reference without an internal id.
    #[must_use]
    pub fn new(data_source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            record_id: record_id.into(),
            internal_id: None,
        }
    }

    /// Returns true if this reference names the given record.
    #[must_use]
    pub fn matches(&self, data_source: &str, record_id: &str) -> bool {
        self.data_source == data_source && self.record_id == record_id
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.data_source, self.record_id)
    }
}

/// One side of a resolution step: either a bare record (singleton) or a
/// previously built virtual entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualEntityRef {
    /// Virtual entity id.
    #[serde(alias = "virtualEntityId")]
    pub id: String,
    /// True when this wraps exactly one record with no construction history.
    #[serde(default)]
    pub singleton: bool,
    /// Records making up the virtual entity, in backend order.
    #[serde(default)]
    pub records: Vec<RecordRef>,
}

impl VirtualEntityRef {
    /// Creates a singleton reference for one record.
    #[must_use]
    pub fn singleton(id: impl Into<String>, record: RecordRef) -> Self {
        Self {
            id: id.into(),
            singleton: true,
            records: vec![record],
        }
    }

    /// Creates a non-singleton reference to a built virtual entity.
    #[must_use]
    pub fn composite(id: impl Into<String>, records: Vec<RecordRef>) -> Self {
        Self {
            id: id.into(),
            singleton: false,
            records,
        }
    }

    /// Returns true if this entity contains the given record.
    #[must_use]
    pub fn contains_record(&self, data_source: &str, record_id: &str) -> bool {
        self.records.iter().any(|r| r.matches(data_source, record_id))
    }
}

/// One pairwise merge performed by the resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStep {
    /// Id of the virtual entity this step produced (unique key).
    #[serde(alias = "resolvedVirtualEntityId")]
    pub resolved_id: String,
    /// Global order; larger means later.
    pub step_number: i64,
    /// Candidate side.
    #[serde(alias = "candidateVirtualEntity")]
    pub candidate: VirtualEntityRef,
    /// Inbound side.
    #[serde(alias = "inboundVirtualEntity")]
    pub inbound: VirtualEntityRef,
    #[serde(default)]
    pub match_key: String,
    #[serde(default)]
    pub resolution_rule: String,
    /// Feature scores, consumed as given.
    #[serde(default)]
    pub feature_scores: BTreeMap<String, serde_json::Value>,
}

impl ResolutionStep {
    /// Creates a step with empty match details.
    #[must_use]
    pub fn new(
        resolved_id: impl Into<String>,
        step_number: i64,
        candidate: VirtualEntityRef,
        inbound: VirtualEntityRef,
    ) -> Self {
        Self {
            resolved_id: resolved_id.into(),
            step_number,
            candidate,
            inbound,
            match_key: String::new(),
            resolution_rule: String::new(),
            feature_scores: BTreeMap::new(),
        }
    }

    /// Sets the match key and resolution rule.
    #[must_use]
    pub fn with_match(mut self, match_key: impl Into<String>, resolution_rule: impl Into<String>) -> Self {
        self.match_key = match_key.into();
        self.resolution_rule = resolution_rule.into();
        self
    }

    /// Classifies the step by the shape of its two sides.
    #[must_use]
    pub fn step_type(&self) -> StepType {
        match (self.candidate.singleton, self.inbound.singleton) {
            (true, true) => StepType::Create,
            (false, false) => StepType::Merge,
            _ => StepType::Add,
        }
    }

    /// Both sides, candidate first.
    #[must_use]
    pub fn sides(&self) -> [&VirtualEntityRef; 2] {
        [&self.candidate, &self.inbound]
    }

    /// Ids of the non-singleton sides, i.e. the virtual entities this step
    /// was built from.
    pub fn ancestor_ids(&self) -> impl Iterator<Item = &str> {
        self.sides()
            .into_iter()
            .filter(|side| !side.singleton)
            .map(|side| side.id.as_str())
    }

    /// Returns true if a singleton side of this step is the given record.
    #[must_use]
    pub fn introduces_record(&self, data_source: &str, record_id: &str) -> bool {
        self.sides()
            .into_iter()
            .any(|side| side.singleton && side.contains_record(data_source, record_id))
    }
}
