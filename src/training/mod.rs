//! Training infrastructure: self-play episodes, replay buffer, metrics, the
//! trainer loop and its optional background update worker.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;
pub mod worker;

pub use episode::EvalReport;
pub use metrics::{EpisodeOutcome, TrainingStats};
pub use replay_buffer::{ReplayBuffer, Transition};
pub use trainer::{Trainer, TrainerConfig};
