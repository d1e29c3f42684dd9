use serde::{Deserialize, Serialize};

use crate::training::{Hyperparameters, PriorityConfig, ScheduleConfig};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub win_rate: f32,
    pub draw_rate: f32,
    pub current_loss: f32,
    pub average_td_error: f32,
    pub training_iterations: u64,
    pub buffer_len: usize,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub batch: usize,
    pub timestamp: u64,
    pub learner: String,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: Hyperparameters,
}

/// Trainer settings and counters written to training_state.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerState {
    pub iteration: u64,
    pub win_rate: f64,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub importance_weighting: bool,
    pub schedule: ScheduleConfig,
    pub priority: PriorityConfig,
}
