//! Linear threshold policy.

use stratus_core::{Policy, Result, StratusError};

/// Bang-bang policy over a linear score: the action is 1 when the dot
/// product of weights and observation is non-negative, 0 otherwise.
///
/// One weight per observation component, no bias term, so the parameter
/// count equals the observation dimensionality.
#[derive(Debug, Clone)]
pub struct LinearPolicy {
    weights: Vec<f64>,
}

impl LinearPolicy {
    /// Creates a policy for `obs_dim`-component observations, with all
    /// weights at zero until the optimizer loads a candidate.
    pub fn new(obs_dim: usize) -> Self {
        Self {
            weights: vec![0.0; obs_dim],
        }
    }

    /// Currently loaded weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn score(&self, observation: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(observation.iter())
            .map(|(w, x)| w * x)
            .sum()
    }
}

impl Policy for LinearPolicy {
    fn num_params(&self) -> usize {
        self.weights.len()
    }

    fn load_weights(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.weights.len() {
            return Err(StratusError::dimension(
                "load_weights",
                self.weights.len(),
                params.len(),
            ));
        }
        self.weights.copy_from_slice(params);
        Ok(())
    }

    fn act(&self, observation: &[f64]) -> Vec<f64> {
        vec![if self.score(observation) >= 0.0 { 1.0 } else { 0.0 }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_params_matches_observation_dim() {
        assert_eq!(LinearPolicy::new(4).num_params(), 4);
    }

    #[test]
    fn test_load_weights_dimension_mismatch() {
        let mut policy = LinearPolicy::new(4);
        let err = policy.load_weights(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StratusError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_threshold_action() {
        let mut policy = LinearPolicy::new(2);
        policy.load_weights(&[1.0, -1.0]).unwrap();

        assert_eq!(policy.act(&[2.0, 1.0]), vec![1.0]);
        assert_eq!(policy.act(&[1.0, 2.0]), vec![0.0]);
        // Zero score counts as action 1
        assert_eq!(policy.act(&[1.0, 1.0]), vec![1.0]);
    }
}
