//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for building and initially expanding a forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HowConfig {
    /// Expand every `FINAL` root when a forest is loaded.
    pub auto_expand_finals: bool,
    /// Expand a `GROUP` at load time when it covers at most this many ids
    /// and its parent is expanded.
    pub auto_expand_max_steps: usize,
    /// Shortest run of `ADD` steps that is folded into a stack.
    pub min_stack_size: usize,
    /// Maximum recursion depth while reconstructing step history.
    pub max_depth: usize,
}

impl Default for HowConfig {
    fn default() -> Self {
        Self {
            auto_expand_finals: true,
            auto_expand_max_steps: 3,
            min_stack_size: 2,
            max_depth: 512,
        }
    }
}

impl HowConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_stack_size < 2 {
            return Err(ConfigError::TooSmall {
                field: "min_stack_size".to_string(),
                min: 2,
                actual: self.min_stack_size,
            });
        }
        if self.max_depth < 1 {
            return Err(ConfigError::TooSmall {
                field: "max_depth".to_string(),
                min: 1,
                actual: self.max_depth,
            });
        }
        Ok(())
    }

    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
