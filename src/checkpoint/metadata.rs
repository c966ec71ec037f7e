use serde::{Deserialize, Serialize};

use crate::training::metrics::TrainingStats;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Greedy win rate against the random baseline, or the rolling
    /// self-play win rate when no evaluation ran.
    pub win_rate: f32,
    pub draw_rate: f32,
    pub average_game_length: f32,
    pub current_loss: f32,
    pub update_count: usize,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
    pub epsilon_min: f32,
    pub epsilon_decay_episodes: usize,
    pub batch_size: usize,
    pub buffer_capacity: usize,
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub metrics: CheckpointMetrics,
    pub stats: TrainingStats,
    pub hyperparameters: CheckpointHyperparameters,
}
