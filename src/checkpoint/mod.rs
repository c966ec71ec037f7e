mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig, MODEL_FILE};
pub use metadata::{CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics};
