//! Shared data types for rollout evaluation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a single environment step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Observation after the step
    pub observation: Vec<f64>,
    /// Reward earned by the step
    pub reward: f64,
    /// Whether the episode terminated on this step
    pub done: bool,
    /// Auxiliary diagnostics from the environment
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub info: HashMap<String, serde_json::Value>,
}

impl StepOutcome {
    /// Creates an outcome with no auxiliary info.
    pub fn new(observation: Vec<f64>, reward: f64, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
            info: HashMap::new(),
        }
    }
}

/// Configuration for a single rollout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Hard cap on environment steps per rollout.
    ///
    /// A rollout accumulates at most this many reward steps even if the
    /// environment never signals termination.
    pub max_steps: usize,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self { max_steps: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rollout_config() {
        assert_eq!(RolloutConfig::default().max_steps, 100);
    }

    #[test]
    fn test_step_outcome_roundtrip() {
        let outcome = StepOutcome::new(vec![0.1, -0.2], 1.0, false);
        let json = serde_json::to_string(&outcome).unwrap();
        let back: StepOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.observation, outcome.observation);
        assert!(!back.done);
    }
}
