//! Generation-driving training loop.
//!
//! Each generation: ask the optimizer for a population, evaluate every
//! candidate's rollout cost, tell the optimizer, and append a history
//! record. The optimizer state is only ever updated from a complete
//! generation; an evaluation failure aborts the run with the original
//! error.

use serde::{Deserialize, Serialize};

use stratus_cma::{best_index, project_population, CmaEs, StopReason};
use stratus_core::Result;

use crate::history::{GenerationRecord, HistoryLog};
use crate::rollout::Evaluator;

/// Configuration for the training loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Emit a progress log line every this many generations. Zero silences
    /// periodic logging.
    pub log_every: usize,
    /// Record the 2D population projection in each history record.
    pub record_projection: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            log_every: 10,
            record_projection: true,
        }
    }
}

/// Result of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Parameters of the lowest-cost candidate seen across the run; falls
    /// back to the initial distribution mean if no generation completed.
    pub best_parameters: Vec<f64>,
    /// Cost of the best candidate (infinity if no generation completed)
    pub best_cost: f64,
    /// Number of generations run
    pub generations: usize,
    /// Why the optimizer stopped
    pub stop_reason: StopReason,
    /// Per-generation history
    pub history: HistoryLog,
}

/// Drives the ask → evaluate → tell loop until the optimizer stops.
pub struct Trainer<Ev> {
    optimizer: CmaEs,
    evaluator: Ev,
    config: TrainerConfig,
}

impl<Ev: Evaluator> Trainer<Ev> {
    pub fn new(optimizer: CmaEs, evaluator: Ev, config: TrainerConfig) -> Self {
        Self {
            optimizer,
            evaluator,
            config,
        }
    }

    /// Runs training to completion and returns the outcome with history.
    pub fn run(mut self) -> Result<TrainOutcome> {
        let mut history = HistoryLog::new();

        while !self.optimizer.should_stop() {
            let generation = self.optimizer.generation();
            let population = self.optimizer.ask();
            let costs = self.evaluator.evaluate_population(&population)?;
            debug_assert_eq!(population.len(), costs.len());

            self.optimizer.tell(&population, &costs)?;

            let reward = -costs.iter().sum::<f64>();
            let gen_best = best_index(&costs).expect("population is never empty");
            let projection = if self.config.record_projection {
                project_population(&population)
            } else {
                Vec::new()
            };

            history.push(GenerationRecord {
                generation,
                reward,
                best_cost: costs[gen_best],
                best_index: gen_best,
                sigma: self.optimizer.sigma(),
                projection,
            });

            if self.config.log_every > 0 && generation % self.config.log_every == 0 {
                log::info!(
                    "generation {}: reward={:.2}, gen_best={:.4}, overall_best={:.4}, sigma={:.4e}",
                    generation,
                    reward,
                    costs[gen_best],
                    self.optimizer.best_cost().unwrap_or(f64::INFINITY),
                    self.optimizer.sigma(),
                );
            }
        }

        self.evaluator.close();

        let stop_reason = self
            .optimizer
            .stop_reason()
            .expect("loop exits only once a stopping criterion holds");

        let (best_parameters, best_cost) = match self.optimizer.best_parameters() {
            Some(params) => (
                params.to_vec(),
                self.optimizer.best_cost().unwrap_or(f64::INFINITY),
            ),
            None => (self.optimizer.mean().to_vec(), f64::INFINITY),
        };

        log::info!(
            "training stopped after {} generations ({:?}): best cost {:.4}",
            self.optimizer.generation(),
            stop_reason,
            best_cost,
        );

        Ok(TrainOutcome {
            best_parameters,
            best_cost,
            generations: self.optimizer.generation(),
            stop_reason,
            history,
        })
    }
}
