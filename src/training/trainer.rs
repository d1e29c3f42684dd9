use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::model::QModel;
use crate::checkpoint::{
    CheckpointData, CheckpointManager, CheckpointMetadata, CheckpointMetrics, Checkpointable,
    TrainerState,
};
use crate::error::{CheckpointError, ModelError};
use crate::store::ExperienceStore;
use crate::training::experience::Experience;
use crate::training::metrics::TrainingMetrics;
use crate::training::replay_buffer::ReplayBuffer;
use crate::training::schedule::{Hyperparameters, PriorityConfig, ScheduleConfig};

/// Added to every TD error so no experience ends up with zero priority.
pub const PRIORITY_EPSILON: f64 = 1e-6;

/// Window used for the rolling metrics written into checkpoints.
const METRICS_WINDOW: usize = 100;

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Scale training targets by each sample's importance weight.
    pub importance_weighting: bool,
    /// Experiences pulled from the store when a trainer starts.
    pub warm_start_limit: usize,
    /// Fixed seed for exploration and sampling. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub schedule: ScheduleConfig,
    pub priority: PriorityConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            batch_size: 64,
            replay_capacity: 100_000,
            importance_weighting: true,
            warm_start_limit: 50_000,
            seed: None,
            schedule: ScheduleConfig::default(),
            priority: PriorityConfig::default(),
        }
    }
}

/// Summary of one training step.
#[derive(Debug, Clone)]
pub struct TrainStepReport {
    /// Model iteration count after the step.
    pub iteration: u64,
    pub loss: f32,
    pub mean_td_error: f32,
    pub hyperparameters: Hyperparameters,
    pub batch_size: usize,
}

/// Deep Q-learning over a prioritized replay buffer.
pub struct Trainer<M> {
    name: String,
    model: M,
    buffer: ReplayBuffer,
    config: TrainerConfig,
    store: Option<Arc<dyn ExperienceStore>>,
    rng: StdRng,
    win_rate: f64,
    metrics: TrainingMetrics,
}

impl<M: QModel> Trainer<M> {
    pub fn new(model: M, config: TrainerConfig) -> Self {
        let (rng, buffer) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                ReplayBuffer::seeded(config.replay_capacity, seed.rotate_left(17)),
            ),
            None => (
                StdRng::from_os_rng(),
                ReplayBuffer::new(config.replay_capacity),
            ),
        };
        let buffer = buffer.with_priority_config(config.priority.clone());

        Trainer {
            name: "learner".to_string(),
            model,
            buffer,
            config,
            store: None,
            rng,
            win_rate: 0.0,
            metrics: TrainingMetrics::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a store: observed experiences are recorded there, the buffer
    /// is warm-started from a sample of what it already holds, and the
    /// latest win rate is read back.
    pub fn with_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        match store.fetch_experience_sample(self.config.warm_start_limit) {
            Ok(experiences) => {
                if !experiences.is_empty() {
                    info!(
                        "{}: warm start with {} stored experiences",
                        self.name,
                        experiences.len()
                    );
                }
                self.buffer.extend(experiences);
            }
            Err(e) => warn!("{}: warm start failed: {e}", self.name),
        }
        self.store = Some(store);
        self.refresh_win_rate();
        self
    }

    /// Re-read the latest win rate from the store. Missing or unreadable
    /// history counts as 0.0.
    pub fn refresh_win_rate(&mut self) {
        self.win_rate = match &self.store {
            Some(store) => store.latest_win_rate().unwrap_or_else(|e| {
                warn!("{}: failed to read win rate: {e}", self.name);
                None
            }),
            None => None,
        }
        .unwrap_or(0.0);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::at(
            &self.config.schedule,
            &self.config.priority,
            self.model.iteration_count(),
            self.win_rate,
            self.buffer.len(),
        )
    }

    pub fn epsilon(&self) -> f64 {
        self.config.schedule.epsilon(self.model.iteration_count())
    }

    pub fn gamma(&self) -> f64 {
        self.config
            .schedule
            .gamma(self.model.iteration_count(), self.win_rate)
    }

    /// Epsilon-greedy choice among `legal` action indices.
    pub fn select_action(&mut self, state: &[f32], legal: &[usize], explore: bool) -> Option<usize> {
        if legal.is_empty() {
            return None;
        }
        if explore && self.rng.random::<f64>() < self.epsilon() {
            return Some(legal[self.rng.random_range(0..legal.len())]);
        }
        self.greedy_action(state, legal)
    }

    /// Highest-valued legal action; the earliest one wins ties.
    pub fn greedy_action(&self, state: &[f32], legal: &[usize]) -> Option<usize> {
        let values = self.model.predict(state);
        let mut best: Option<(usize, f32)> = None;
        for &action in legal {
            let value = values[action];
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((action, value));
            }
        }
        best.map(|(action, _)| action)
    }

    /// Record a transition, then train once the buffer holds a full batch.
    pub fn observe(&mut self, experience: Experience) -> Option<TrainStepReport> {
        if let Some(store) = &self.store {
            if let Err(e) = store.record_experience(&experience) {
                warn!("{}: failed to record experience: {e}", self.name);
            }
        }
        if experience.done {
            self.metrics.record_game(experience.reward);
        }
        self.buffer.add(experience);

        (self.buffer.len() >= self.config.batch_size).then(|| self.train_step())
    }

    /// One pass over a prioritized sample: fit each experience towards its
    /// TD target and refresh its priority.
    ///
    /// # Panics
    /// Panics if the replay buffer is empty.
    pub fn train_step(&mut self) -> TrainStepReport {
        let hyperparameters = self.hyperparameters();
        self.model.set_learning_rate(hyperparameters.learning_rate);

        let batch = self.buffer.sample(self.config.batch_size);
        let mut total_loss = 0.0f32;
        let mut total_td_error = 0.0f64;

        for experience in &batch {
            let prediction = self.model.predict(&experience.state);
            let previous = f64::from(prediction[experience.action]);
            let value = if experience.done {
                f64::from(experience.reward)
            } else {
                let next = self.model.predict(&experience.next_state);
                f64::from(experience.reward) + hyperparameters.gamma * max_value(&next)
            };

            let weight = self
                .config
                .importance_weighting
                .then_some(experience.importance_weight);
            let target = td_target(prediction, experience.action, value, weight);
            total_loss += self.model.fit(&experience.state, &target);

            let td_error = (value - previous).abs();
            total_td_error += td_error;
            if let Some(id) = experience.id() {
                let priority = if td_error.is_finite() {
                    td_error + PRIORITY_EPSILON
                } else {
                    self.buffer.max_priority()
                };
                self.buffer.update_priority(id, priority);
            }
        }

        let n = batch.len().max(1);
        let report = TrainStepReport {
            iteration: self.model.iteration_count(),
            loss: total_loss / n as f32,
            mean_td_error: (total_td_error / n as f64) as f32,
            hyperparameters,
            batch_size: batch.len(),
        };
        self.metrics.record_update(report.loss, report.mean_td_error);
        debug!(
            "{}: step {} loss {:.4} td {:.4} eps {:.3} gamma {:.3} lr {:.5}",
            self.name,
            report.iteration,
            report.loss,
            report.mean_td_error,
            hyperparameters.epsilon,
            hyperparameters.gamma,
            hyperparameters.learning_rate,
        );
        report
    }

    /// Cache a new win rate and forward it to the store.
    pub fn record_win_rate(&mut self, win_rate: f64, opponent: &str) {
        self.win_rate = win_rate;
        if let Some(store) = &self.store {
            if let Err(e) = store.record_win_rate(win_rate, opponent) {
                warn!("{}: failed to record win rate: {e}", self.name);
            }
        }
    }

    /// Restore model weights and the cached win rate from a checkpoint.
    pub fn restore(&mut self, data: &CheckpointData) -> Result<(), CheckpointError> {
        self.model.load(&data.path)?;
        let state: TrainerState = serde_json::from_str(&data.training_state_json)?;
        self.win_rate = state.win_rate;
        info!(
            "{}: restored checkpoint from batch {} ({} iterations)",
            self.name,
            data.metadata.batch,
            self.model.iteration_count()
        );
        Ok(())
    }
}

/// The model's prediction with the taken action's entry replaced by `value`,
/// optionally scaled by an importance weight.
pub fn td_target(mut prediction: Vec<f32>, action: usize, value: f64, weight: Option<f64>) -> Vec<f32> {
    prediction[action] = value as f32;
    if let Some(weight) = weight {
        let weight = weight as f32;
        prediction.iter_mut().for_each(|v| *v *= weight);
    }
    prediction
}

fn max_value(values: &[f32]) -> f64 {
    f64::from(values.iter().copied().fold(f32::NEG_INFINITY, f32::max))
}

impl<M: QModel> Checkpointable for Trainer<M> {
    fn save_model(&self, dir: &Path) -> Result<(), ModelError> {
        self.model.save(dir)
    }

    fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&TrainerState {
            iteration: self.model.iteration_count(),
            win_rate: self.win_rate,
            batch_size: self.config.batch_size,
            replay_capacity: self.config.replay_capacity,
            importance_weighting: self.config.importance_weighting,
            schedule: self.config.schedule.clone(),
            priority: self.config.priority.clone(),
        })
    }

    fn checkpoint_metadata(&self, batch: usize, timestamp: u64) -> CheckpointMetadata {
        CheckpointMetadata {
            batch,
            timestamp,
            learner: self.name.clone(),
            metrics: CheckpointMetrics {
                win_rate: self.win_rate as f32,
                draw_rate: self.metrics.draw_rate(METRICS_WINDOW),
                current_loss: self.metrics.average_loss(METRICS_WINDOW),
                average_td_error: self.metrics.average_td_error(METRICS_WINDOW),
                training_iterations: self.model.iteration_count(),
                buffer_len: self.buffer.len(),
            },
            hyperparameters: self.hyperparameters(),
        }
    }
}

/// What the self-play harness needs from a learning participant. Shared
/// between concurrent matches, so every method takes `&self`.
pub trait Learner: Send + Sync {
    fn name(&self) -> &str;

    fn choose_action(&self, state: &[f32], legal: &[usize], explore: bool) -> Option<usize>;

    fn learn(&self, experience: Experience) -> Option<TrainStepReport>;

    fn record_win_rate(&self, win_rate: f64, opponent: &str);

    fn save_checkpoint(
        &self,
        manager: &CheckpointManager,
        batch: usize,
    ) -> Result<PathBuf, CheckpointError>;
}

/// Cloneable, thread-safe handle to a [`Trainer`].
pub struct TrainerHandle<M> {
    name: String,
    inner: Arc<Mutex<Trainer<M>>>,
}

impl<M> Clone for TrainerHandle<M> {
    fn clone(&self) -> Self {
        TrainerHandle {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: QModel> TrainerHandle<M> {
    pub fn new(trainer: Trainer<M>) -> Self {
        TrainerHandle {
            name: trainer.name().to_string(),
            inner: Arc::new(Mutex::new(trainer)),
        }
    }

    /// Lock the trainer. A panic while the lock was held does not leave the
    /// trainer in a torn state, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Trainer<M>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: QModel> Learner for TrainerHandle<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&self, state: &[f32], legal: &[usize], explore: bool) -> Option<usize> {
        self.lock().select_action(state, legal, explore)
    }

    fn learn(&self, experience: Experience) -> Option<TrainStepReport> {
        self.lock().observe(experience)
    }

    fn record_win_rate(&self, win_rate: f64, opponent: &str) {
        self.lock().record_win_rate(win_rate, opponent)
    }

    fn save_checkpoint(
        &self,
        manager: &CheckpointManager,
        batch: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let trainer = self.lock();
        manager.save_checkpoint(&*trainer, batch)
    }
}
