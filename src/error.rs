//! Error types for resolution-how.
//!
//! Nothing in the tree is fatal: build problems are recorded as
//! [`Diagnostic`]s and user commands that cannot find their context fail
//! with a [`StructuralError`] that the session turns into a logged no-op.

use serde::Serialize;
use thiserror::Error;

/// Recoverable findings produced while reading a payload or building a forest.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("step {step_id} references virtual entity {referenced_id}, which has no step")]
    MissingStepReference {
        step_id: String,
        referenced_id: String,
    },

    #[error("step {step_id} references itself")]
    SelfReference {
        step_id: String,
    },

    #[error("step {step_id} is already on the build path (cycle)")]
    CycleDetected {
        step_id: String,
    },

    #[error("depth limit {limit} reached at step {step_id}")]
    DepthLimit {
        step_id: String,
        limit: usize,
    },

    #[error("duplicate step key {id}; keeping the first occurrence")]
    DuplicateStepKey {
        id: String,
    },

    #[error("step with empty resolved id ignored (step number {step_number})")]
    EmptyStepId {
        step_number: i64,
    },
}

/// Lookup failures raised by pin/unpin and expansion commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Node not found: {id}")]
    NodeNotFound {
        id: String,
    },

    #[error("Stack not found: {id}")]
    StackNotFound {
        id: String,
    },

    #[error("Step {step_id} is not a member of stack {stack_id}")]
    NotStackMember {
        step_id: String,
        stack_id: String,
    },

    #[error("Step {id} is already pinned")]
    AlreadyPinned {
        id: String,
    },

    #[error("Parent of {id} not found")]
    ParentNotFound {
        id: String,
    },

    #[error("Step {id} is not pinned")]
    NotPinned {
        id: String,
    },

    #[error("Step {id} cannot be stacked")]
    NotStackable {
        id: String,
    },

    #[error("Step {id} has no stackable neighbor")]
    NoStackableNeighbor {
        id: String,
    },
}

/// Payload decoding errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to parse payload: {message}")]
    Parse {
        message: String,
    },
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Field '{field}' must be at least {min} (got {actual})")]
    TooSmall {
        field: String,
        min: usize,
        actual: usize,
    },

    #[error("Failed to parse config: {message}")]
    Parse {
        message: String,
    },
}

/// Top-level error type for resolution-how.
#[derive(Debug, Error)]
pub enum HowError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl HowError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a structural lookup failure.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    /// Returns true if this is a payload error.
    #[must_use]
    pub const fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }

    /// Returns true if this is a config error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for resolution-how operations.
pub type HowResult<T> = Result<T, HowError>;
