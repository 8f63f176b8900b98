//! Collaborator traits for the STRATUS training loop.
//!
//! The optimizer never talks to a concrete model or simulator. It sees a
//! [`Policy`] that maps observations to actions given a loaded parameter
//! vector, and an [`Environment`] that advances a simulated episode. Both
//! are passed into evaluation as explicit values, never reached through
//! globals, so candidates can be evaluated in parallel against independent
//! instances.

use crate::errors::Result;
use crate::types::StepOutcome;

/// A parameterized control policy.
pub trait Policy {
    /// Number of parameters the policy expects from the optimizer.
    fn num_params(&self) -> usize;

    /// Installs a candidate parameter vector.
    ///
    /// Fails with `DimensionMismatch` if `params.len() != num_params()`.
    fn load_weights(&mut self, params: &[f64]) -> Result<()>;

    /// Computes an action vector for the given observation.
    fn act(&self, observation: &[f64]) -> Vec<f64>;
}

/// A simulated episodic environment.
///
/// Implementations hold mutable episode state; `reset` must fully
/// reinitialize it so that nothing leaks between consecutive rollouts.
pub trait Environment {
    /// Starts a fresh episode and returns the initial observation.
    fn reset(&mut self) -> Result<Vec<f64>>;

    /// Advances the episode by one step.
    ///
    /// Fails with `EnvironmentFailure` on an invalid action or when called
    /// outside a running episode; the failure aborts the entire run.
    fn step(&mut self, action: &[f64]) -> Result<StepOutcome>;

    /// Releases any resources held by the environment.
    fn close(&mut self) {}
}
