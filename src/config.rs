use std::path::{Path, PathBuf};

use log::warn;

use crate::ai::heuristic::HeuristicKind;
use crate::ai::minimax::Pruning;
use crate::ai::model::ModelConfig;
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::training::{SelfPlayConfig, TrainerConfig};

/// Settings for the search contestant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub depth: usize,
    pub heuristic: HeuristicKind,
    pub alpha_beta: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: 4,
            heuristic: HeuristicKind::default(),
            alpha_beta: true,
        }
    }
}

impl SearchConfig {
    pub fn pruning(&self) -> Pruning {
        if self.alpha_beta {
            Pruning::AlphaBeta
        } else {
            Pruning::None
        }
    }
}

/// Where experiences, win rates and batch results are written.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Keep experiences and win rates on disk; otherwise they live in memory.
    pub persist: bool,
    pub data_dir: PathBuf,
    pub results_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            persist: true,
            data_dir: PathBuf::from("data"),
            results_file: PathBuf::from("game_results.json"),
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub model: ModelConfig,
    pub trainer: TrainerConfig,
    pub selfplay: SelfPlayConfig,
    pub checkpoint: CheckpointManagerConfig,
    pub storage: StorageConfig,
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn in_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.depth == 0 {
            return Err(invalid("search.depth must be > 0"));
        }

        if self.model.learning_rate <= 0.0 {
            return Err(invalid("model.learning_rate must be > 0"));
        }
        if self.model.gradient_clip <= 0.0 {
            return Err(invalid("model.gradient_clip must be > 0"));
        }

        let trainer = &self.trainer;
        if trainer.batch_size == 0 {
            return Err(invalid("trainer.batch_size must be > 0"));
        }
        if trainer.replay_capacity < trainer.batch_size {
            return Err(invalid("trainer.replay_capacity must be >= trainer.batch_size"));
        }

        let schedule = &trainer.schedule;
        if !in_unit_interval(schedule.min_epsilon) {
            return Err(invalid("trainer.schedule.min_epsilon must be in [0, 1]"));
        }
        if schedule.epsilon_decay <= 0.0 || schedule.epsilon_decay > 1.0 {
            return Err(invalid("trainer.schedule.epsilon_decay must be in (0, 1]"));
        }
        if !in_unit_interval(schedule.gamma_initial)
            || !in_unit_interval(schedule.gamma_mid)
            || !in_unit_interval(schedule.gamma_final)
        {
            return Err(invalid("trainer.schedule gamma values must be in [0, 1]"));
        }
        if schedule.gamma_mid > schedule.gamma_final {
            return Err(invalid(
                "trainer.schedule.gamma_mid must be <= trainer.schedule.gamma_final",
            ));
        }
        if schedule.learning_rate <= 0.0 || schedule.min_learning_rate <= 0.0 {
            return Err(invalid("trainer.schedule learning rates must be > 0"));
        }
        if schedule.learning_rate_decay <= 0.0 || schedule.learning_rate_decay > 1.0 {
            return Err(invalid("trainer.schedule.learning_rate_decay must be in (0, 1]"));
        }

        let priority = &trainer.priority;
        if !in_unit_interval(priority.alpha_start) || !in_unit_interval(priority.alpha_end) {
            return Err(invalid("trainer.priority alpha values must be in [0, 1]"));
        }
        if !in_unit_interval(priority.beta_start) || !in_unit_interval(priority.beta_end) {
            return Err(invalid("trainer.priority beta values must be in [0, 1]"));
        }

        let selfplay = &self.selfplay;
        if selfplay.games_per_batch == 0 {
            return Err(invalid("selfplay.games_per_batch must be > 0"));
        }
        if selfplay.batches == 0 {
            return Err(invalid("selfplay.batches must be > 0"));
        }
        if selfplay.move_timeout_ms == 0 {
            return Err(invalid("selfplay.move_timeout_ms must be > 0"));
        }
        if selfplay.reward_shaping < 0.0 {
            return Err(invalid("selfplay.reward_shaping must be >= 0"));
        }

        if self.checkpoint.keep_last_n == 0 {
            return Err(invalid("checkpoint.keep_last_n must be >= 1"));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[search]
depth = 6
heuristic = "mobility"

[trainer.schedule]
min_epsilon = 0.05
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.search.depth, 6);
        assert_eq!(config.search.heuristic, HeuristicKind::Mobility);
        assert!(config.search.alpha_beta);
        assert!((config.trainer.schedule.min_epsilon - 0.05).abs() < 1e-9);
        // Other fields should be defaults
        assert!((config.trainer.schedule.epsilon_decay - 0.9999).abs() < 1e-12);
        assert_eq!(config.trainer.batch_size, 64);
        assert_eq!(config.selfplay.games_per_batch, 10);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert_eq!(config.search, default.search);
        assert_eq!(config.trainer, default.trainer);
        assert_eq!(config.selfplay, default.selfplay);
        assert_eq!(config.storage, default.storage);
    }

    #[test]
    fn test_pruning_flag() {
        let mut search = SearchConfig::default();
        assert_eq!(search.pruning(), Pruning::AlphaBeta);
        search.alpha_beta = false;
        assert_eq!(search.pruning(), Pruning::None);
    }

    #[test]
    fn test_validation_rejects_zero_depth() {
        let mut config = AppConfig::default();
        config.search.depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.model.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_batch_size() {
        let mut config = AppConfig::default();
        config.trainer.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_replay_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.trainer.replay_capacity = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.trainer.schedule.gamma_final = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trainer.schedule.gamma_mid = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_decay_out_of_range() {
        let mut config = AppConfig::default();
        config.trainer.schedule.epsilon_decay = 1.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_priority_exponent_out_of_range() {
        let mut config = AppConfig::default();
        config.trainer.priority.beta_end = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_games_per_batch() {
        let mut config = AppConfig::default();
        config.selfplay.games_per_batch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.selfplay.move_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_keep_last() {
        let mut config = AppConfig::default();
        config.checkpoint.keep_last_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.selfplay.games_per_batch, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[selfplay]
games_per_batch = 24
move_timeout_ms = 250

[storage]
persist = false
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.selfplay.games_per_batch, 24);
        assert_eq!(config.selfplay.move_timeout_ms, 250);
        assert!(!config.storage.persist);
        // Others are defaults
        assert!((config.model.learning_rate - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[trainer]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
