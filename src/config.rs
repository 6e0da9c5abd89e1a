//! Run configuration: the step budget and the trace switch a caller hands to the run loop.

use serde::{Deserialize, Serialize};

use crate::types::{MachineError, DEFAULT_MAX_STEPS};

/// Options for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    /// Maximum number of transitions to apply before giving up with `StepLimitExceeded`.
    pub max_steps: usize,
    /// Log sampled steps at `info` level while running.
    pub trace: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            trace: false,
        }
    }
}

impl RunConfig {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            ..Self::default()
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Reads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(content: &str) -> Result<Self, MachineError> {
        serde_json::from_str(content)
            .map_err(|e| MachineError::malformed(format!("invalid run configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert!(!config.trace);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = RunConfig::from_json(r#"{ "trace": true }"#).unwrap();
        assert_eq!(config, RunConfig::default().with_trace(true));

        let config = RunConfig::from_json(r#"{ "maxSteps": 42 }"#).unwrap();
        assert_eq!(config.max_steps, 42);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let error = RunConfig::from_json(r#"{ "maxSteps": -1 }"#).unwrap_err();
        assert!(matches!(error, MachineError::MalformedDescription(_)));
    }
}
