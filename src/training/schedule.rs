//! Annealed hyperparameters. Everything here is a pure function of the
//! model's training-iteration counter, the replay buffer size and the latest
//! recorded win rate.

use serde::{Deserialize, Serialize};

/// Priority exponent (alpha) and importance exponent (beta) annealing.
///
/// Both move linearly from their start to their end value as the buffer
/// fills up to `anneal_size` experiences, then stay put.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub alpha_start: f64,
    pub alpha_end: f64,
    pub beta_start: f64,
    pub beta_end: f64,
    pub anneal_size: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        PriorityConfig {
            alpha_start: 0.6,
            alpha_end: 0.3,
            beta_start: 0.4,
            beta_end: 0.9,
            anneal_size: 50_000,
        }
    }
}

impl PriorityConfig {
    fn progress(&self, size: usize) -> f64 {
        if self.anneal_size == 0 {
            return 1.0;
        }
        size.min(self.anneal_size) as f64 / self.anneal_size as f64
    }

    pub fn priority_exponent(&self, size: usize) -> f64 {
        self.alpha_start + (self.alpha_end - self.alpha_start) * self.progress(size)
    }

    pub fn importance_exponent(&self, size: usize) -> f64 {
        self.beta_start + (self.beta_end - self.beta_start) * self.progress(size)
    }
}

/// Exploration, discount and learning-rate schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub min_epsilon: f64,
    pub epsilon_decay: f64,
    pub gamma_initial: f64,
    pub gamma_mid: f64,
    pub gamma_final: f64,
    /// Iterations over which gamma ramps from `gamma_initial` to `gamma_mid`.
    pub gamma_horizon: u64,
    pub learning_rate: f64,
    pub learning_rate_decay: f64,
    pub min_learning_rate: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            min_epsilon: 0.1,
            epsilon_decay: 0.9999,
            gamma_initial: 0.1,
            gamma_mid: 0.5,
            gamma_final: 0.9,
            gamma_horizon: 100_000,
            learning_rate: 0.01,
            learning_rate_decay: 1.0,
            min_learning_rate: 1e-4,
        }
    }
}

impl ScheduleConfig {
    /// `max(min_epsilon, epsilon_decay ^ iteration)`.
    pub fn epsilon(&self, iteration: u64) -> f64 {
        self.epsilon_decay
            .powf(iteration as f64)
            .max(self.min_epsilon)
    }

    /// Linear ramp to `gamma_mid`; afterwards tracks the win rate inside
    /// `[gamma_mid, gamma_final]`.
    pub fn gamma(&self, iteration: u64, win_rate: f64) -> f64 {
        if iteration < self.gamma_horizon {
            let progress = iteration as f64 / self.gamma_horizon as f64;
            return self.gamma_initial + (self.gamma_mid - self.gamma_initial) * progress;
        }
        let tracked = self.gamma_mid + (win_rate - 0.5) * (self.gamma_final - self.gamma_mid);
        tracked.clamp(self.gamma_mid, self.gamma_final)
    }

    pub fn learning_rate(&self, iteration: u64) -> f64 {
        (self.learning_rate * self.learning_rate_decay.powf(iteration as f64))
            .max(self.min_learning_rate)
    }
}

/// Snapshot of every annealed value at one point in training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub epsilon: f64,
    pub gamma: f64,
    pub learning_rate: f64,
    pub priority_exponent: f64,
    pub importance_exponent: f64,
}

impl Hyperparameters {
    pub fn at(
        schedule: &ScheduleConfig,
        priority: &PriorityConfig,
        iteration: u64,
        win_rate: f64,
        buffer_len: usize,
    ) -> Self {
        Hyperparameters {
            epsilon: schedule.epsilon(iteration),
            gamma: schedule.gamma(iteration, win_rate),
            learning_rate: schedule.learning_rate(iteration),
            priority_exponent: priority.priority_exponent(buffer_len),
            importance_exponent: priority.importance_exponent(buffer_len),
        }
    }
}
