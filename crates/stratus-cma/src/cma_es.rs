//! CMA-ES optimizer with the ask/tell protocol.
//!
//! Reference: Hansen & Ostermeier (2001), Completely Derandomized
//! Self-Adaptation in Evolution Strategies.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stratus_core::{Result, StratusError};

/// Floor applied to covariance eigenvalues for numerical stability.
const EIGENVALUE_FLOOR: f64 = 1e-30;

/// Configuration for the CMA-ES optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmaConfig {
    /// Number of candidates sampled per generation (λ). Constant for the
    /// whole run.
    pub population_size: usize,

    /// Generation cap; `should_stop` reports true once reached.
    pub max_generations: usize,

    /// Step-size collapse threshold.
    pub min_sigma: f64,

    /// Stop after this many generations without best-cost improvement.
    /// Zero disables the stagnation check.
    pub stagnation_window: usize,

    /// Stop once the best cost drops to this value or below.
    pub target_cost: Option<f64>,

    /// Covariance condition number ceiling.
    pub max_condition: f64,

    /// RNG seed; sampled from entropy when unset.
    pub seed: Option<u64>,
}

impl Default for CmaConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            max_generations: 300,
            min_sigma: 1e-12,
            stagnation_window: 40,
            target_cost: None,
            max_condition: 1e14,
            seed: None,
        }
    }
}

impl CmaConfig {
    /// Creates a builder for CMA-ES configuration.
    pub fn builder() -> CmaConfigBuilder {
        CmaConfigBuilder::default()
    }
}

/// Builder for [`CmaConfig`].
#[derive(Debug, Default)]
pub struct CmaConfigBuilder {
    config: CmaConfig,
}

impl CmaConfigBuilder {
    pub fn population_size(mut self, size: usize) -> Self {
        self.config.population_size = size;
        self
    }

    pub fn max_generations(mut self, generations: usize) -> Self {
        self.config.max_generations = generations;
        self
    }

    pub fn min_sigma(mut self, min_sigma: f64) -> Self {
        self.config.min_sigma = min_sigma;
        self
    }

    pub fn stagnation_window(mut self, window: usize) -> Self {
        self.config.stagnation_window = window;
        self
    }

    pub fn target_cost(mut self, target: f64) -> Self {
        self.config.target_cost = Some(target);
        self
    }

    pub fn max_condition(mut self, max_condition: f64) -> Self {
        self.config.max_condition = max_condition;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> CmaConfig {
        self.config
    }
}

/// Why the optimizer reported `should_stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Generation cap reached
    MaxGenerations,
    /// Step size fell below `min_sigma`
    SigmaCollapse,
    /// Best cost unchanged for `stagnation_window` generations
    Stagnation,
    /// Covariance condition number exceeded `max_condition`
    IllConditioned,
    /// Best cost reached `target_cost`
    TargetReached,
}

/// CMA-ES search-distribution state and update machinery.
///
/// Owns the distribution mean, global step size σ, covariance matrix C and
/// its eigendecomposition, and the two evolution paths. The state advances
/// exactly once per generation, in [`CmaEs::tell`], and only after every
/// cost for that generation is available.
#[derive(Debug)]
pub struct CmaEs {
    config: CmaConfig,

    // Problem geometry
    dim: usize,
    mu: usize,
    weights: Vec<f64>,
    mu_eff: f64,

    // Adaptation constants
    c_sigma: f64,
    d_sigma: f64,
    c_c: f64,
    c_1: f64,
    c_mu: f64,
    chi_n: f64,
    eigen_interval: usize,

    // Distribution state
    mean: DVector<f64>,
    sigma: f64,
    cov: DMatrix<f64>,
    path_sigma: DVector<f64>,
    path_c: DVector<f64>,
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
    condition: f64,
    last_eigen_update: usize,

    // Progress tracking
    generation: usize,
    best_parameters: Option<Vec<f64>>,
    best_cost: f64,
    last_improvement: usize,

    rng: StdRng,
}

impl CmaEs {
    /// Constructs a search distribution centered at `initial_mean` with
    /// spread `initial_sigma`.
    ///
    /// Fails with `InvalidConfiguration` if the mean is empty, the step
    /// size is non-positive or non-finite, or the population size is
    /// smaller than two.
    pub fn new(initial_mean: Vec<f64>, initial_sigma: f64, config: CmaConfig) -> Result<Self> {
        if initial_mean.is_empty() {
            return Err(StratusError::config("initial mean must not be empty"));
        }
        if !initial_sigma.is_finite() || initial_sigma <= 0.0 {
            return Err(StratusError::config(format!(
                "initial step size must be positive, got {initial_sigma}"
            )));
        }
        if config.population_size < 2 {
            return Err(StratusError::config(format!(
                "population size must be at least 2, got {}",
                config.population_size
            )));
        }

        let dim = initial_mean.len();
        let n = dim as f64;
        let lambda = config.population_size;
        let mu = lambda / 2;

        // Log-linear recombination weights over the mu best candidates
        let mut weights: Vec<f64> = (0..mu)
            .map(|i| ((lambda as f64 + 1.0) / 2.0).ln() - ((i + 1) as f64).ln())
            .collect();
        let weight_sum: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= weight_sum;
        }
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        // Strategy parameters (Hansen's defaults)
        let c_sigma = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let d_sigma = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;
        let c_c = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);
        let c_1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let c_mu = (2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((n + 2.0).powi(2) + mu_eff))
            .min(1.0 - c_1);
        let chi_n = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n * n));

        // Eigendecomposition refresh cadence; cheap for small dimensions
        let eigen_interval = (1.0 / ((c_1 + c_mu) * n * 10.0)).ceil().max(1.0) as usize;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            dim,
            mu,
            weights,
            mu_eff,
            c_sigma,
            d_sigma,
            c_c,
            c_1,
            c_mu,
            chi_n,
            eigen_interval,
            mean: DVector::from_vec(initial_mean),
            sigma: initial_sigma,
            cov: DMatrix::identity(dim, dim),
            path_sigma: DVector::zeros(dim),
            path_c: DVector::zeros(dim),
            eigenvalues: DVector::from_element(dim, 1.0),
            eigenvectors: DMatrix::identity(dim, dim),
            condition: 1.0,
            last_eigen_update: 0,
            generation: 0,
            best_parameters: None,
            best_cost: f64::INFINITY,
            last_improvement: 0,
            rng,
        })
    }

    /// Samples one generation of candidate parameter vectors.
    ///
    /// Returns exactly `population_size` candidates of the distribution's
    /// dimensionality. The search distribution itself is untouched; only
    /// the internal RNG stream advances.
    pub fn ask(&mut self) -> Vec<Vec<f64>> {
        (0..self.config.population_size)
            .map(|_| {
                // x = m + σ · B · D · z,  z ~ N(0, I)
                let scaled = DVector::from_iterator(
                    self.dim,
                    self.eigenvalues.iter().map(|&l| {
                        let z: f64 = self.rng.sample(StandardNormal);
                        z * l.max(EIGENVALUE_FLOOR).sqrt()
                    }),
                );
                let candidate = &self.mean + (&self.eigenvectors * scaled) * self.sigma;
                candidate.iter().copied().collect()
            })
            .collect()
    }

    /// Updates the search distribution from one fully evaluated generation.
    ///
    /// Fails with `DimensionMismatch` if `population` and `costs` differ in
    /// length or any candidate's length differs from the distribution's
    /// dimensionality; fails with `NumericalError` on non-finite costs.
    pub fn tell(&mut self, population: &[Vec<f64>], costs: &[f64]) -> Result<()> {
        if population.len() != costs.len() {
            return Err(StratusError::dimension(
                "tell population vs costs",
                population.len(),
                costs.len(),
            ));
        }
        if population.is_empty() {
            return Err(StratusError::config("tell requires a non-empty population"));
        }
        for candidate in population {
            if candidate.len() != self.dim {
                return Err(StratusError::dimension(
                    "tell candidate",
                    self.dim,
                    candidate.len(),
                ));
            }
        }
        if let Some(bad) = costs.iter().position(|c| !c.is_finite()) {
            return Err(StratusError::numerical(format!(
                "non-finite cost {} at population index {}",
                costs[bad], bad
            )));
        }

        // Rank candidates by cost; stable sort keeps the earliest index on ties
        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| {
            costs[a]
                .partial_cmp(&costs[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let gen_best = order[0];
        if costs[gen_best] < self.best_cost {
            self.best_cost = costs[gen_best];
            self.best_parameters = Some(population[gen_best].clone());
            self.last_improvement = self.generation + 1;
        }

        // Steps of the mu best, relative to the old mean: y_i = (x_i - m) / σ
        let mu = self.mu.min(order.len());
        let selected_steps: Vec<DVector<f64>> = order[..mu]
            .iter()
            .map(|&idx| {
                let x = DVector::from_vec(population[idx].clone());
                (x - &self.mean) / self.sigma
            })
            .collect();

        let mut y_w = DVector::zeros(self.dim);
        for (w, y) in self.weights.iter().zip(selected_steps.iter()) {
            y_w += y * *w;
        }

        // Evolution path for sigma, in the C^{-1/2}-whitened frame
        let whitened = self.inv_sqrt_c_mul(&y_w);
        let c_sigma_factor = (self.c_sigma * (2.0 - self.c_sigma) * self.mu_eff).sqrt();
        self.path_sigma = &self.path_sigma * (1.0 - self.c_sigma) + whitened * c_sigma_factor;

        let ps_norm = self.path_sigma.norm();
        let normalizer =
            (1.0 - (1.0 - self.c_sigma).powi(2 * (self.generation as i32 + 1))).sqrt();
        let h_sigma = if ps_norm / normalizer / self.chi_n
            < 1.4 + 2.0 / (self.dim as f64 + 1.0)
        {
            1.0
        } else {
            0.0
        };

        // Evolution path for C
        let c_c_factor = (self.c_c * (2.0 - self.c_c) * self.mu_eff).sqrt();
        self.path_c = &self.path_c * (1.0 - self.c_c) + &y_w * (h_sigma * c_c_factor);

        // Covariance: decay + rank-1 + rank-mu
        let delta_h = (1.0 - h_sigma) * self.c_c * (2.0 - self.c_c);
        let mut cov = &self.cov * (1.0 - self.c_1 - self.c_mu + self.c_1 * delta_h);
        cov += (&self.path_c * self.path_c.transpose()) * self.c_1;
        for (w, y) in self.weights.iter().zip(selected_steps.iter()) {
            cov += (y * y.transpose()) * (self.c_mu * *w);
        }
        self.cov = cov;

        // Mean and step size
        self.mean += &y_w * self.sigma;
        self.sigma *= ((self.c_sigma / self.d_sigma) * (ps_norm / self.chi_n - 1.0)).exp();

        self.generation += 1;

        if self.generation - self.last_eigen_update >= self.eigen_interval {
            self.refresh_eigensystem();
            self.last_eigen_update = self.generation;
        }

        Ok(())
    }

    /// Reports whether the explicit stopping policy is satisfied.
    pub fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }

    /// The first stopping criterion currently satisfied, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if let Some(target) = self.config.target_cost {
            if self.best_cost <= target {
                return Some(StopReason::TargetReached);
            }
        }
        if self.generation >= self.config.max_generations {
            return Some(StopReason::MaxGenerations);
        }
        if self.sigma < self.config.min_sigma {
            return Some(StopReason::SigmaCollapse);
        }
        if self.condition > self.config.max_condition {
            return Some(StopReason::IllConditioned);
        }
        if self.config.stagnation_window > 0
            && self.generation >= self.last_improvement + self.config.stagnation_window
        {
            return Some(StopReason::Stagnation);
        }
        None
    }

    /// Dimensionality of the search space.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Candidates sampled per generation.
    pub fn population_size(&self) -> usize {
        self.config.population_size
    }

    /// Generations completed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Current distribution mean.
    pub fn mean(&self) -> &[f64] {
        self.mean.as_slice()
    }

    /// Current global step size.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Lowest cost observed so far, if any generation completed.
    pub fn best_cost(&self) -> Option<f64> {
        self.best_parameters.as_ref().map(|_| self.best_cost)
    }

    /// Parameters of the lowest-cost candidate observed so far.
    pub fn best_parameters(&self) -> Option<&[f64]> {
        self.best_parameters.as_deref()
    }

    /// Emits a telemetry snapshot of the optimizer state.
    pub fn emit_telemetry(&self) -> HashMap<String, serde_json::Value> {
        use serde_json::json;

        let mut telemetry = HashMap::new();
        telemetry.insert("cma_generation".to_string(), json!(self.generation));
        telemetry.insert("cma_sigma".to_string(), json!(self.sigma));
        telemetry.insert("cma_condition".to_string(), json!(self.condition));
        telemetry.insert(
            "cma_population_size".to_string(),
            json!(self.config.population_size),
        );
        telemetry.insert("cma_best_cost".to_string(), json!(self.best_cost));
        telemetry
    }

    /// C^{-1/2} · v via the cached eigendecomposition.
    fn inv_sqrt_c_mul(&self, v: &DVector<f64>) -> DVector<f64> {
        let bt_v = self.eigenvectors.transpose() * v;
        let scaled = DVector::from_iterator(
            self.dim,
            bt_v.iter()
                .zip(self.eigenvalues.iter())
                .map(|(x, &l)| x / l.max(EIGENVALUE_FLOOR).sqrt()),
        );
        &self.eigenvectors * scaled
    }

    fn refresh_eigensystem(&mut self) {
        // Force symmetry before decomposing
        for i in 0..self.dim {
            for j in 0..i {
                let avg = (self.cov[(i, j)] + self.cov[(j, i)]) / 2.0;
                self.cov[(i, j)] = avg;
                self.cov[(j, i)] = avg;
            }
        }

        let eigen = SymmetricEigen::new(self.cov.clone());
        self.eigenvalues = eigen.eigenvalues.map(|l| l.max(EIGENVALUE_FLOOR));
        self.eigenvectors = eigen.eigenvectors;

        let max_eig = self.eigenvalues.max();
        let min_eig = self.eigenvalues.min();
        self.condition = max_eig / min_eig.max(EIGENVALUE_FLOOR);

        log::debug!(
            "eigensystem refreshed at generation {}: condition={:.3e}",
            self.generation,
            self.condition
        );
    }
}

/// Index of the minimum cost, ties broken by first occurrence.
pub fn best_index(costs: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &cost) in costs.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(j) if cost < costs[j] => best = Some(i),
            _ => {}
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_config() -> CmaConfig {
        CmaConfig::builder().seed(42).build()
    }

    #[test]
    fn test_empty_mean_rejected() {
        let err = CmaEs::new(vec![], 0.5, CmaConfig::default()).unwrap_err();
        assert!(matches!(err, StratusError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_non_positive_sigma_rejected() {
        let err = CmaEs::new(vec![0.0; 4], 0.0, CmaConfig::default()).unwrap_err();
        assert!(matches!(err, StratusError::InvalidConfiguration(_)));

        let err = CmaEs::new(vec![0.0; 4], -1.0, CmaConfig::default()).unwrap_err();
        assert!(matches!(err, StratusError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_ask_shape() {
        // One ask on a 4-dimensional problem yields exactly 8 candidates of length 4
        let mut es = CmaEs::new(vec![0.0; 4], 0.5, seeded_config()).unwrap();
        let population = es.ask();
        assert_eq!(population.len(), 8);
        for candidate in &population {
            assert_eq!(candidate.len(), 4);
        }
    }

    #[test]
    fn test_ask_leaves_distribution_unchanged() {
        let mut es = CmaEs::new(vec![1.0, 2.0, 3.0], 0.5, seeded_config()).unwrap();
        let mean_before = es.mean().to_vec();
        let sigma_before = es.sigma();
        let _ = es.ask();
        assert_eq!(es.mean(), mean_before.as_slice());
        assert_eq!(es.sigma(), sigma_before);
        assert_eq!(es.generation(), 0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let es = CmaEs::new(vec![0.0; 6], 1.0, seeded_config()).unwrap();
        let sum: f64 = es.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tell_length_mismatch() {
        let mut es = CmaEs::new(vec![0.0; 3], 0.5, seeded_config()).unwrap();
        let population = es.ask();
        let costs = vec![0.0; population.len() - 1];
        let err = es.tell(&population, &costs).unwrap_err();
        assert!(matches!(err, StratusError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_tell_candidate_dimension_mismatch() {
        let mut es = CmaEs::new(vec![0.0; 3], 0.5, seeded_config()).unwrap();
        let population = vec![vec![0.0; 3], vec![0.0; 5]];
        let costs = vec![1.0, 2.0];
        let err = es.tell(&population, &costs).unwrap_err();
        assert!(matches!(err, StratusError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_tell_rejects_non_finite_costs() {
        let mut es = CmaEs::new(vec![0.0; 2], 0.5, seeded_config()).unwrap();
        let population = es.ask();
        let mut costs = vec![1.0; population.len()];
        costs[3] = f64::NAN;
        let err = es.tell(&population, &costs).unwrap_err();
        assert!(matches!(err, StratusError::NumericalError(_)));
    }

    #[test]
    fn test_tell_advances_generation_and_best() {
        let mut es = CmaEs::new(vec![0.0; 4], 0.5, seeded_config()).unwrap();
        let population = es.ask();
        let costs: Vec<f64> = (0..population.len()).map(|i| i as f64).collect();
        es.tell(&population, &costs).unwrap();

        assert_eq!(es.generation(), 1);
        assert_eq!(es.best_cost(), Some(0.0));
        assert_eq!(es.best_parameters().unwrap(), population[0].as_slice());
    }

    #[test]
    fn test_best_tie_breaks_to_earliest() {
        let mut es = CmaEs::new(vec![0.0; 2], 0.5, seeded_config()).unwrap();
        let population = es.ask();
        // All candidates share the minimum cost; index 0 must win
        let costs = vec![7.0; population.len()];
        es.tell(&population, &costs).unwrap();
        assert_eq!(es.best_parameters().unwrap(), population[0].as_slice());
    }

    #[test]
    fn test_best_index_tie_break() {
        assert_eq!(best_index(&[3.0, 1.0, 1.0, 2.0]), Some(1));
        assert_eq!(best_index(&[5.0]), Some(0));
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn test_sphere_improves() {
        let config = CmaConfig::builder()
            .seed(7)
            .population_size(8)
            .max_generations(150)
            .build();
        let mut es = CmaEs::new(vec![3.0; 4], 1.0, config).unwrap();

        while !es.should_stop() {
            let population = es.ask();
            let costs: Vec<f64> = population
                .iter()
                .map(|x| x.iter().map(|v| v * v).sum())
                .collect();
            es.tell(&population, &costs).unwrap();
        }

        // Initial cost at the mean is 36.0; the optimizer must get far below it
        assert!(es.best_cost().unwrap() < 1.0, "best = {:?}", es.best_cost());
    }

    #[test]
    fn test_max_generations_stop() {
        let config = CmaConfig::builder().seed(1).max_generations(3).build();
        let mut es = CmaEs::new(vec![0.0; 2], 0.5, config).unwrap();

        let mut generations = 0;
        while !es.should_stop() {
            let population = es.ask();
            let costs: Vec<f64> = population.iter().map(|x| x[0].abs()).collect();
            es.tell(&population, &costs).unwrap();
            generations += 1;
        }

        assert_eq!(generations, 3);
        assert_eq!(es.stop_reason(), Some(StopReason::MaxGenerations));
    }

    #[test]
    fn test_target_cost_stop() {
        let config = CmaConfig::builder().seed(2).target_cost(1e9).build();
        let mut es = CmaEs::new(vec![0.0; 2], 0.5, config).unwrap();
        let population = es.ask();
        let costs: Vec<f64> = population.iter().map(|x| x[0] * x[0]).collect();
        es.tell(&population, &costs).unwrap();
        // Any finite cost beats a 1e9 target
        assert_eq!(es.stop_reason(), Some(StopReason::TargetReached));
    }

    #[test]
    fn test_stagnation_stop() {
        let config = CmaConfig::builder()
            .seed(3)
            .stagnation_window(5)
            .max_generations(1000)
            .build();
        let mut es = CmaEs::new(vec![0.0; 2], 0.5, config).unwrap();

        // A constant objective can never improve the best cost
        while !es.should_stop() {
            let population = es.ask();
            let costs = vec![1.0; population.len()];
            es.tell(&population, &costs).unwrap();
        }

        assert_eq!(es.stop_reason(), Some(StopReason::Stagnation));
        assert!(es.generation() <= 6);
    }

    #[test]
    fn test_telemetry_keys() {
        let es = CmaEs::new(vec![0.0; 2], 0.5, seeded_config()).unwrap();
        let telemetry = es.emit_telemetry();
        assert!(telemetry.contains_key("cma_generation"));
        assert!(telemetry.contains_key("cma_sigma"));
        assert!(telemetry.contains_key("cma_condition"));
        assert!(telemetry.contains_key("cma_best_cost"));
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let make = || {
            let config = CmaConfig::builder().seed(99).build();
            CmaEs::new(vec![0.5; 3], 0.7, config).unwrap()
        };
        let mut a = make();
        let mut b = make();
        assert_eq!(a.ask(), b.ask());
    }
}
