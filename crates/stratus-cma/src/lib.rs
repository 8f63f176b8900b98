//! # stratus-cma
//!
//! Covariance Matrix Adaptation Evolution Strategy (CMA-ES) for STRATUS.
//!
//! Drives a population-based black-box search over a fixed-length parameter
//! vector through the classic ask/tell protocol:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 CmaEs                    │
//! │  mean m, step size σ, covariance C       │
//! │  evolution paths p_σ, p_c                │
//! └──────────────────────────────────────────┘
//!      │ ask()                  ▲ tell(population, costs)
//!      ▼                        │
//!   Population ──► rollout evaluation (stratus-control)
//! ```
//!
//! The optimizer standardizes on **cost** (lower is better); callers that
//! think in rewards negate before telling. Stopping is an explicit policy
//! (generation cap, step-size collapse, stagnation, conditioning) rather
//! than opaque library behavior.

pub mod cma_es;
pub mod projection;

pub use cma_es::{best_index, CmaConfig, CmaConfigBuilder, CmaEs, StopReason};
pub use projection::project_population;
