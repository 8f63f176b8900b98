//! # stratus-control
//!
//! Rollout simulation and training for STRATUS.
//!
//! Connects the CMA-ES optimizer to a concrete control problem:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Trainer                      │
//! │   ask ──► evaluate generation ──► tell        │
//! │              │                                │
//! │              ▼                                │
//! │   ┌─────────────────────────┐                 │
//! │   │ Evaluator               │  sequential or  │
//! │   │  policy.act / env.step  │  rayon-parallel │
//! │   └─────────────────────────┘                 │
//! │              │                                │
//! │              ▼                                │
//! │        HistoryLog (per-generation records)    │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Ships a CartPole environment and a linear threshold policy, the pairing
//! the training loop was built around; anything implementing the
//! `stratus-core` collaborator traits slots in the same way.

pub mod cartpole;
pub mod history;
pub mod linear;
pub mod rollout;
pub mod trainer;

pub use cartpole::CartPole;
pub use history::{GenerationRecord, HistoryLog};
pub use linear::LinearPolicy;
pub use rollout::{evaluate, Evaluator, ParallelEvaluator, SequentialEvaluator};
pub use trainer::{TrainOutcome, Trainer, TrainerConfig};
