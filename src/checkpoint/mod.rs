mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig, Checkpointable};
pub use metadata::{CheckpointMetadata, CheckpointMetrics, TrainerState};
