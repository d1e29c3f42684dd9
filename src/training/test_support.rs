use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ai::model::QModel;
use crate::error::{ModelError, StoreError};
use crate::store::{BatchRecord, ExperienceStore, ResultsSink};
use crate::training::Experience;

const STUB_FILE: &str = "stub_model.json";

/// Model with fixed predictions that records every fit call.
#[derive(Debug, Clone)]
pub(crate) struct StubModel {
    pub values: Vec<f32>,
    pub fits: Vec<(Vec<f32>, Vec<f32>)>,
    pub iterations: u64,
    pub learning_rate: f64,
    pub rates_seen: Vec<f64>,
}

impl StubModel {
    pub fn new(values: Vec<f32>) -> Self {
        StubModel {
            values,
            fits: Vec::new(),
            iterations: 0,
            learning_rate: 0.01,
            rates_seen: Vec::new(),
        }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(vec![value; 64])
    }
}

impl QModel for StubModel {
    fn predict(&self, _state: &[f32]) -> Vec<f32> {
        self.values.clone()
    }

    fn fit(&mut self, state: &[f32], target: &[f32]) -> f32 {
        self.fits.push((state.to_vec(), target.to_vec()));
        self.rates_seen.push(self.learning_rate);
        self.iterations += 1;
        0.5
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
        fs::write(dir.join(STUB_FILE), serde_json::to_string(&self.iterations)?)?;
        Ok(())
    }

    fn load(&mut self, dir: &Path) -> Result<(), ModelError> {
        let text = fs::read_to_string(dir.join(STUB_FILE))?;
        self.iterations = serde_json::from_str(&text)?;
        Ok(())
    }
}

/// Store whose every operation fails, as if its backing disk were gone.
#[derive(Debug, Default)]
pub(crate) struct FailingStore;

impl FailingStore {
    fn error() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("unreachable/store"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        }
    }
}

impl ExperienceStore for FailingStore {
    fn record_experience(&self, _experience: &Experience) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn fetch_experience_sample(&self, _limit: usize) -> Result<Vec<Experience>, StoreError> {
        Err(Self::error())
    }

    fn record_win_rate(&self, _win_rate: f64, _opponent: &str) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn latest_win_rate(&self) -> Result<Option<f64>, StoreError> {
        Err(Self::error())
    }
}

impl ResultsSink for FailingStore {
    fn append(&self, _record: &BatchRecord) -> Result<(), StoreError> {
        Err(Self::error())
    }
}
