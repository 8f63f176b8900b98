//! Cart-pole balancing environment.
//!
//! Classic inverted-pendulum dynamics: a pole hinged to a cart on a
//! frictionless track, driven by a fixed-magnitude force applied left or
//! right each step. Euler integration at 50 Hz.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stratus_core::{Environment, Result, StepOutcome, StratusError};

const GRAVITY: f64 = 9.8;
const CART_MASS: f64 = 1.0;
const POLE_MASS: f64 = 0.1;
const TOTAL_MASS: f64 = CART_MASS + POLE_MASS;
/// Half the pole length; the torque arm of the pole's center of mass.
const POLE_HALF_LENGTH: f64 = 0.5;
const POLE_MASS_LENGTH: f64 = POLE_MASS * POLE_HALF_LENGTH;
const FORCE_MAG: f64 = 10.0;
/// Integration step in seconds.
const TAU: f64 = 0.02;

/// Episode ends when the pole tilts past 12 degrees.
const THETA_THRESHOLD: f64 = 12.0 * std::f64::consts::PI / 180.0;
/// Episode ends when the cart leaves the track.
const X_THRESHOLD: f64 = 2.4;

/// Reset draws each state component uniformly from this symmetric range.
const RESET_SPREAD: f64 = 0.05;

/// Cart-pole environment.
///
/// Observation is `[x, x_dot, theta, theta_dot]`. The action vector's
/// first element is rounded to a discrete action: 0 pushes left, 1 pushes
/// right; anything else is an invalid action and fails the episode.
/// Reward is 1.0 per step, including the terminating step.
pub struct CartPole {
    state: Option<[f64; 4]>,
    done: bool,
    rng: StdRng,
}

impl CartPole {
    /// Observation dimensionality.
    pub const OBSERVATION_DIM: usize = 4;

    /// Creates an environment with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates an environment with a fixed seed for reproducible episodes.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: None,
            done: false,
            rng,
        }
    }

    fn decode_action(action: &[f64]) -> Result<bool> {
        let first = *action.first().ok_or_else(|| {
            StratusError::environment("empty action vector")
        })?;
        if !first.is_finite() {
            return Err(StratusError::environment(format!(
                "non-finite action {first}"
            )));
        }
        match first.round() as i64 {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StratusError::environment(format!(
                "invalid discrete action {other}, expected 0 or 1"
            ))),
        }
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Result<Vec<f64>> {
        let mut state = [0.0; 4];
        for slot in &mut state {
            *slot = self.rng.gen_range(-RESET_SPREAD..RESET_SPREAD);
        }
        self.state = Some(state);
        self.done = false;
        Ok(state.to_vec())
    }

    fn step(&mut self, action: &[f64]) -> Result<StepOutcome> {
        let [x, x_dot, theta, theta_dot] = self.state.ok_or_else(|| {
            StratusError::environment("step called before reset")
        })?;
        if self.done {
            return Err(StratusError::environment(
                "step called on terminated episode without reset",
            ));
        }

        let push_right = Self::decode_action(action)?;
        let force = if push_right { FORCE_MAG } else { -FORCE_MAG };

        let cos_theta = theta.cos();
        let sin_theta = theta.sin();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_HALF_LENGTH
                * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        let next = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.state = Some(next);

        self.done = next[0].abs() > X_THRESHOLD || next[2].abs() > THETA_THRESHOLD;

        Ok(StepOutcome::new(next.to_vec(), 1.0, self.done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_within_spread() {
        let mut env = CartPole::seeded(42);
        let obs = env.reset().unwrap();
        assert_eq!(obs.len(), CartPole::OBSERVATION_DIM);
        for component in obs {
            assert!(component.abs() < RESET_SPREAD);
        }
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = CartPole::seeded(42);
        let err = env.step(&[0.0]).unwrap_err();
        assert!(matches!(err, StratusError::EnvironmentFailure(_)));
    }

    #[test]
    fn test_invalid_action_fails() {
        let mut env = CartPole::seeded(42);
        env.reset().unwrap();
        assert!(env.step(&[2.0]).is_err());
        assert!(env.step(&[-1.0]).is_err());
        assert!(env.step(&[f64::NAN]).is_err());
        assert!(env.step(&[]).is_err());
    }

    #[test]
    fn test_push_right_accelerates_cart() {
        let mut env = CartPole::seeded(42);
        env.reset().unwrap();
        let before = env.state.unwrap()[1];
        let outcome = env.step(&[1.0]).unwrap();
        assert!(outcome.observation[1] > before);
    }

    #[test]
    fn test_reward_is_one_per_step() {
        let mut env = CartPole::seeded(42);
        env.reset().unwrap();
        let outcome = env.step(&[0.0]).unwrap();
        assert_eq!(outcome.reward, 1.0);
    }

    #[test]
    fn test_constant_push_terminates() {
        // Always pushing one way must tip the pole or run off the track
        let mut env = CartPole::seeded(7);
        env.reset().unwrap();
        let mut steps = 0;
        loop {
            let outcome = env.step(&[1.0]).unwrap();
            steps += 1;
            if outcome.done {
                break;
            }
            assert!(steps < 500, "episode never terminated");
        }
        let state = env.state.unwrap();
        assert!(state[0].abs() > X_THRESHOLD || state[2].abs() > THETA_THRESHOLD);
    }

    #[test]
    fn test_step_after_done_fails() {
        let mut env = CartPole::seeded(7);
        env.reset().unwrap();
        loop {
            if env.step(&[1.0]).unwrap().done {
                break;
            }
        }
        assert!(env.step(&[1.0]).is_err());
        // Reset recovers the environment completely
        env.reset().unwrap();
        assert!(env.step(&[1.0]).is_ok());
    }

    #[test]
    fn test_seeded_episodes_reproduce() {
        let run = |seed: u64| {
            let mut env = CartPole::seeded(seed);
            let first = env.reset().unwrap();
            let outcome = env.step(&[1.0]).unwrap();
            (first, outcome.observation)
        };
        assert_eq!(run(99), run(99));
    }
}
