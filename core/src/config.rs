use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}
const fn default_min_matrix_equations() -> usize {
    1
}
const fn default_stall_passes() -> usize {
    1
}
const fn default_max_iterations() -> usize {
    10_000
}

/// Which step status the completion detector reports.
///
/// The termination signal itself is always "every unknown solved"; the policy
/// only maps that state onto success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Success once every unknown is solved, failure while any remain.
    #[default]
    SucceedWhenDone,
    /// Failure once every unknown is solved, success while any remain.
    /// Suited to use as a loop guard.
    FailWhenDone,
}

/// Solver engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub completion_policy: CompletionPolicy,

    /// Run the sum-of-angle normalizer before solving (default: true).
    #[serde(default = "default_true")]
    pub sum_of_angles: bool,

    /// Minimum number of matrix equations a manipulator must supply.
    #[serde(default = "default_min_matrix_equations")]
    pub min_matrix_equations: usize,

    /// Failed attempts every unsolved variable must reach, with no commit in
    /// between, before the run is declared incomplete.
    #[serde(default = "default_stall_passes")]
    pub stall_passes: usize,

    /// Hard cap on select/attempt cycles.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_policy: CompletionPolicy::default(),
            sum_of_angles: default_true(),
            min_matrix_equations: default_min_matrix_equations(),
            stall_passes: default_stall_passes(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_matrix_equations", self.min_matrix_equations),
            ("stall_passes", self.stall_passes),
            ("max_iterations", self.max_iterations),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: "must be > 0".into(),
                });
            }
        }
        Ok(())
    }
}
