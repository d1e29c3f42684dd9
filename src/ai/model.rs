//! Action-value models used by the learning agent.

use std::fs;
use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::ai::state_encoding::{to_tensor, ACTION_SIZE, STATE_SIZE};
use crate::error::ModelError;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

const WEIGHTS_FILE: &str = "q_network";
const STATE_FILE: &str = "model_state.json";

/// Capability the trainer needs from a value model.
pub trait QModel: Send {
    /// One value per action for an encoded state.
    fn predict(&self, state: &[f32]) -> Vec<f32>;

    /// One optimization step towards `target`. Returns the loss.
    fn fit(&mut self, state: &[f32], target: &[f32]) -> f32;

    /// Number of `fit` calls over the model's lifetime, including restored ones.
    fn iteration_count(&self) -> u64;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, learning_rate: f64);

    /// Persist weights and counters under `dir`.
    fn save(&self, dir: &Path) -> Result<(), ModelError>;

    /// Restore what [`QModel::save`] wrote.
    fn load(&mut self, dir: &Path) -> Result<(), ModelError>;
}

/// Model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub learning_rate: f64,
    /// Element-wise gradient clipping threshold.
    pub gradient_clip: f32,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            learning_rate: 0.01,
            gradient_clip: 1.0,
            seed: 7997,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelState {
    iterations: u64,
    learning_rate: f64,
}

/// MLP value model trained with Adam on the CPU backend.
pub struct QNetworkModel {
    network: QNetwork<TrainBackend>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<
        burn::optim::Adam,
        QNetwork<TrainBackend>,
        TrainBackend,
    >,
    net_config: QNetworkConfig,
    device: <TrainBackend as Backend>::Device,
    learning_rate: f64,
    iterations: u64,
}

impl QNetworkModel {
    pub fn new(config: &ModelConfig) -> Self {
        let device = Default::default();
        TrainBackend::seed(config.seed);
        let net_config = QNetworkConfig::new()
            .with_input_size(STATE_SIZE)
            .with_output_size(ACTION_SIZE);
        let network: QNetwork<TrainBackend> = net_config.init(&device);
        let optimizer = AdamConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Value(config.gradient_clip)))
            .init();

        QNetworkModel {
            network,
            optimizer,
            net_config,
            device,
            learning_rate: config.learning_rate,
            iterations: 0,
        }
    }

    /// Restore a model from `dir`, or start fresh when nothing usable is there.
    pub fn load_or_new(dir: &Path, config: &ModelConfig) -> Self {
        let mut model = Self::new(config);
        if dir.join(STATE_FILE).exists() {
            if let Err(e) = model.load(dir) {
                warn!("could not load model from {}: {e}; starting fresh", dir.display());
                model = Self::new(config);
            }
        }
        model
    }
}

impl QModel for QNetworkModel {
    fn predict(&self, state: &[f32]) -> Vec<f32> {
        let input = to_tensor::<InferBackend>(state, &self.device);
        self.network
            .valid()
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .expect("f32 tensor data extraction")
    }

    fn fit(&mut self, state: &[f32], target: &[f32]) -> f32 {
        let input = to_tensor::<TrainBackend>(state, &self.device);
        let target = to_tensor::<TrainBackend>(target, &self.device);

        // L2 loss over the full action vector
        let diff = self.network.forward(input) - target;
        let loss = (diff.clone() * diff).mean();
        let loss_val = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.network = self
            .optimizer
            .step(self.learning_rate, self.network.clone(), grads);
        self.iterations += 1;

        loss_val
    }

    fn iteration_count(&self) -> u64 {
        self.iterations
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn save(&self, dir: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(dir)?;
        let recorder = DefaultRecorder::default();
        self.network
            .clone()
            .valid()
            .save_file(dir.join(WEIGHTS_FILE), &recorder)
            .map_err(|e| ModelError::Save(e.to_string()))?;

        let state = ModelState {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
        };
        fs::write(dir.join(STATE_FILE), serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    fn load(&mut self, dir: &Path) -> Result<(), ModelError> {
        let state: ModelState = serde_json::from_str(&fs::read_to_string(dir.join(STATE_FILE))?)?;

        let recorder = DefaultRecorder::default();
        let network: QNetwork<TrainBackend> = self
            .net_config
            .init(&self.device)
            .load_file(dir.join(WEIGHTS_FILE), &recorder, &self.device)
            .map_err(|e| ModelError::Load(e.to_string()))?;

        self.network = network;
        self.iterations = state.iterations;
        self.learning_rate = state.learning_rate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_predict_shape_and_range() {
        let model = QNetworkModel::new(&ModelConfig::default());
        let values = model.predict(&[0.0; STATE_SIZE]);
        assert_eq!(values.len(), ACTION_SIZE);
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_fit_counts_iterations_and_moves_towards_target() {
        let mut model = QNetworkModel::new(&ModelConfig::default());
        let mut state = vec![0.0; STATE_SIZE];
        state[27] = 1.0;
        state[28] = -1.0;
        let target = vec![0.5; ACTION_SIZE];

        let first = model.fit(&state, &target);
        let mut last = first;
        for _ in 0..30 {
            last = model.fit(&state, &target);
        }
        assert_eq!(model.iteration_count(), 31);
        assert!(last < first, "loss should decrease: {first} -> {last}");
    }

    #[test]
    fn test_set_learning_rate() {
        let mut model = QNetworkModel::new(&ModelConfig::default());
        assert_eq!(model.learning_rate(), 0.01);
        model.set_learning_rate(0.001);
        assert_eq!(model.learning_rate(), 0.001);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut model = QNetworkModel::new(&ModelConfig::default());
        let state = vec![0.25; STATE_SIZE];
        model.fit(&state, &vec![0.1; ACTION_SIZE]);
        model.fit(&state, &vec![0.1; ACTION_SIZE]);
        model.save(tmp.path()).unwrap();

        let restored = QNetworkModel::load_or_new(tmp.path(), &ModelConfig::default());
        assert_eq!(restored.iteration_count(), 2);
        let before = model.predict(&state);
        let after = restored.predict(&state);
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_load_or_new_falls_back_on_garbage() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(STATE_FILE), "not json").unwrap();
        let model = QNetworkModel::load_or_new(tmp.path(), &ModelConfig::default());
        assert_eq!(model.iteration_count(), 0);
    }

    #[test]
    fn test_load_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut model = QNetworkModel::new(&ModelConfig::default());
        assert!(model.load(&tmp.path().join("nope")).is_err());
    }
}
