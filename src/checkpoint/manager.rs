use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::{CheckpointError, ModelError};
use crate::store::unix_timestamp;

const LATEST_FILE: &str = "latest";
const METADATA_FILE: &str = "metadata.json";
const TRAINING_STATE_FILE: &str = "training_state.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// Something whose state can be written into a checkpoint directory.
pub trait Checkpointable {
    /// Write model weights into `dir`.
    fn save_model(&self, dir: &Path) -> Result<(), ModelError>;

    fn training_state_json(&self) -> Result<String, serde_json::Error>;

    fn checkpoint_metadata(&self, batch: usize, timestamp: u64) -> CheckpointMetadata;
}

/// Checkpoint contents as read back from disk. The owner parses its own
/// training state.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state_json: String,
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    /// Manager for a subdirectory, with the same retention settings. Used to
    /// keep each learner's checkpoints apart.
    pub fn scoped(&self, name: &str) -> CheckpointManager {
        let dir_name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: self.config.checkpoint_dir.join(dir_name),
            ..self.config.clone()
        })
    }

    pub fn dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save a checkpoint for `batch`. Written to a temporary directory first
    /// and renamed into place.
    pub fn save_checkpoint(
        &self,
        item: &dyn Checkpointable,
        batch: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", batch);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;
        item.save_model(&tmp_dir)?;
        fs::write(tmp_dir.join(TRAINING_STATE_FILE), item.training_state_json()?)?;

        let metadata = item.checkpoint_metadata(batch, unix_timestamp());
        fs::write(
            tmp_dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        fs::write(self.config.checkpoint_dir.join(LATEST_FILE), &dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        let metadata = read_metadata(&dir.join(METADATA_FILE))?;
        let ts_path = dir.join(TRAINING_STATE_FILE);
        let training_state_json =
            fs::read_to_string(&ts_path).map_err(|e| CheckpointError::MetadataRead {
                path: ts_path,
                source: e,
            })?;

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            training_state_json,
        })
    }

    /// Load whatever the `latest` marker points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        if !self.config.checkpoint_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let marker = self.config.checkpoint_dir.join(LATEST_FILE);
        let name = match fs::read_to_string(&marker) {
            Ok(name) => name,
            Err(_) => {
                return Err(CheckpointError::NoLatest(self.config.checkpoint_dir.clone()));
            }
        };
        self.load_checkpoint(&self.config.checkpoint_dir.join(name.trim()))
    }

    /// List all checkpoints sorted by batch (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.batch);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by win_rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_win_rate.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}
