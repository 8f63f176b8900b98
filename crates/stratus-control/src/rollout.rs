//! Rollout evaluation: one candidate parameter vector → one scalar cost.
//!
//! The policy and environment are explicit arguments rather than globals,
//! so parallel evaluation only needs independent instances per candidate.
//! An environment failure aborts the whole run; there is no retry and no
//! partial-generation recovery.

use rayon::prelude::*;

use stratus_core::{Environment, Policy, Result, RolloutConfig};

/// Runs one rollout of `params` and returns its cost.
///
/// Loads the candidate into the policy, resets the environment, then
/// alternates act/step while accumulating reward, stopping on termination
/// or after `config.max_steps` steps. The returned cost is the negated
/// accumulated reward, so lower is better.
pub fn evaluate<P, E>(
    policy: &mut P,
    env: &mut E,
    params: &[f64],
    config: &RolloutConfig,
) -> Result<f64>
where
    P: Policy + ?Sized,
    E: Environment + ?Sized,
{
    policy.load_weights(params)?;
    let mut observation = env.reset()?;
    let mut total_reward = 0.0;

    for _ in 0..config.max_steps {
        let action = policy.act(&observation);
        let outcome = env.step(&action)?;
        total_reward += outcome.reward;
        if outcome.done {
            break;
        }
        observation = outcome.observation;
    }

    Ok(-total_reward)
}

/// Evaluates a whole generation, one cost per candidate, in order.
pub trait Evaluator {
    fn evaluate_population(&mut self, population: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Releases collaborator resources once training ends.
    fn close(&mut self) {}
}

/// Sequential evaluator: one policy and one environment, reset per rollout.
pub struct SequentialEvaluator<P, E> {
    policy: P,
    env: E,
    config: RolloutConfig,
}

impl<P: Policy, E: Environment> SequentialEvaluator<P, E> {
    pub fn new(policy: P, env: E, config: RolloutConfig) -> Self {
        Self {
            policy,
            env,
            config,
        }
    }
}

impl<P: Policy, E: Environment> Evaluator for SequentialEvaluator<P, E> {
    fn evaluate_population(&mut self, population: &[Vec<f64>]) -> Result<Vec<f64>> {
        population
            .iter()
            .map(|candidate| evaluate(&mut self.policy, &mut self.env, candidate, &self.config))
            .collect()
    }

    fn close(&mut self) {
        self.env.close();
    }
}

/// Parallel evaluator: builds an independent policy and environment per
/// candidate from factory closures and fans rollouts across the rayon
/// pool. Costs come back in population order, and the caller's `tell`
/// naturally waits for the whole generation to resolve.
pub struct ParallelEvaluator<PF, EF> {
    policy_factory: PF,
    env_factory: EF,
    config: RolloutConfig,
}

impl<P, E, PF, EF> ParallelEvaluator<PF, EF>
where
    P: Policy,
    E: Environment,
    PF: Fn() -> P + Sync,
    EF: Fn() -> E + Sync,
{
    pub fn new(policy_factory: PF, env_factory: EF, config: RolloutConfig) -> Self {
        Self {
            policy_factory,
            env_factory,
            config,
        }
    }
}

impl<P, E, PF, EF> Evaluator for ParallelEvaluator<PF, EF>
where
    P: Policy,
    E: Environment,
    PF: Fn() -> P + Sync,
    EF: Fn() -> E + Sync,
{
    fn evaluate_population(&mut self, population: &[Vec<f64>]) -> Result<Vec<f64>> {
        population
            .par_iter()
            .map(|candidate| {
                let mut policy = (self.policy_factory)();
                let mut env = (self.env_factory)();
                let cost = evaluate(&mut policy, &mut env, candidate, &self.config);
                env.close();
                cost
            })
            .collect()
    }
}
