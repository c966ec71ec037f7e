use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::ai::{DqnAgent, RandomAgent};
use crate::checkpoint::{
    CheckpointHyperparameters, CheckpointManager, CheckpointMetadata, CheckpointMetrics,
};
use crate::error::TrainingError;
use crate::game::RulesDelegate;
use crate::training::episode::{self, derive_seed, EvalReport};
use crate::training::metrics::{EpisodeOutcome, TrainingMetrics, TrainingStats};
use crate::training::replay_buffer::ReplayBuffer;
use crate::training::worker::{UpdateSettings, UpdateWorker};

/// Trainer configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub max_moves_per_episode: usize,
    pub discount_factor: f32,
    pub buffer_capacity: usize,
    pub batch_size: usize,
    /// Run a batch update every this many episodes.
    pub update_interval: usize,
    /// Shape the played action's output bucket instead of output 0.
    pub shape_action_bucket: bool,
    /// Train on a background thread against a shared network.
    pub background_updates: bool,
    pub seed: u64,
    pub log_interval: usize,
    /// 0 disables periodic evaluation.
    pub eval_interval: usize,
    pub eval_games: usize,
    /// 0 disables periodic checkpoints.
    pub checkpoint_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 20,
            max_moves_per_episode: 200,
            discount_factor: 0.95,
            buffer_capacity: 10_000,
            batch_size: 32,
            update_interval: 1,
            shape_action_bucket: false,
            background_updates: false,
            seed: 42,
            log_interval: 10,
            eval_interval: 0,
            eval_games: 20,
            checkpoint_interval: 0,
        }
    }
}

/// Self-play trainer: one [`DqnAgent`] plays both sides and learns from a
/// shared replay buffer.
pub struct Trainer {
    config: TrainerConfig,
    agent: DqnAgent,
    buffer: ReplayBuffer,
    stats: TrainingStats,
    metrics: TrainingMetrics,
    episodes_played: usize,
    interrupt: Arc<AtomicBool>,
    checkpoints: Option<CheckpointManager>,
}

impl Trainer {
    pub fn new(config: TrainerConfig, agent: DqnAgent) -> Self {
        let buffer = ReplayBuffer::with_seed(config.buffer_capacity, derive_seed(config.seed, 0));
        let window = config.log_interval.max(1);
        Trainer {
            config,
            agent,
            buffer,
            stats: TrainingStats::default(),
            metrics: TrainingMetrics::with_capacity(window),
            episodes_played: 0,
            interrupt: Arc::new(AtomicBool::new(false)),
            checkpoints: None,
        }
    }

    /// Save checkpoints through `manager` every `checkpoint_interval` episodes.
    pub fn with_checkpoints(mut self, manager: CheckpointManager) -> Self {
        self.checkpoints = Some(manager);
        self
    }

    /// Flag that stops training at the next episode or turn boundary.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> TrainingStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TrainingStats::default();
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn agent(&self) -> &DqnAgent {
        &self.agent
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn episodes_played(&self) -> usize {
        self.episodes_played
    }

    /// Resume episode numbering (and epsilon decay) after a checkpoint.
    pub fn set_episodes_played(&mut self, episodes: usize) {
        self.episodes_played = episodes;
        self.agent.decay_epsilon(episodes);
    }

    /// Continue counting from statistics saved in a checkpoint.
    pub fn restore_stats(&mut self, stats: TrainingStats) {
        self.stats = stats;
    }

    /// Play `num_episodes` self-play games, learning as configured.
    ///
    /// Stops early, with `Ok`, when the interrupt flag is raised. An invalid
    /// action from the agent is fatal: the episode is recorded as abandoned
    /// and the error returned.
    pub fn train_self_play(
        &mut self,
        rules: &dyn RulesDelegate,
        num_episodes: usize,
    ) -> Result<TrainingStats, TrainingError> {
        let start = self.episodes_played + 1;
        let end = self.episodes_played + num_episodes;
        info!(
            episodes = num_episodes,
            start,
            end,
            epsilon = self.agent.epsilon(),
            "starting self-play training"
        );

        let worker = self.config.background_updates.then(|| {
            UpdateWorker::spawn(
                self.agent.network().clone(),
                *self.agent.action_space(),
                UpdateSettings {
                    discount: self.config.discount_factor,
                    learning_rate: self.agent.learning_rate(),
                    shape_action_bucket: self.config.shape_action_bucket,
                },
            )
        });

        let result = self.run_episodes(rules, num_episodes, worker.as_ref());

        if let Some(worker) = worker {
            match worker.finish() {
                Ok((network, losses)) => {
                    self.agent.replace_network(network);
                    self.record_worker_losses(losses);
                }
                Err(e) => warn!(error = %e, "could not collect weights from update worker"),
            }
        }
        result?;

        info!(
            total = self.stats.total_games,
            wins = self.stats.wins,
            losses = self.stats.losses,
            draws = self.stats.draws,
            abandoned = self.stats.abandoned,
            "training finished"
        );
        Ok(self.stats)
    }

    fn run_episodes(
        &mut self,
        rules: &dyn RulesDelegate,
        num_episodes: usize,
        worker: Option<&UpdateWorker>,
    ) -> Result<(), TrainingError> {
        for _ in 0..num_episodes {
            if self.is_interrupted() {
                info!(episode = self.episodes_played, "training interrupted");
                return Ok(());
            }
            if let Some(worker) = worker {
                self.agent.replace_network(worker.snapshot()?);
                self.drain_worker_losses(worker);
            }

            let trace = episode::play_self_play_episode(
                &mut self.agent,
                rules,
                self.config.max_moves_per_episode,
                &self.interrupt,
            );
            for transition in trace.transitions {
                self.buffer.push(transition);
            }
            self.stats.record(trace.result.outcome);
            self.metrics.record_episode(trace.result);
            self.episodes_played += 1;
            let episode = self.episodes_played;

            if let Some(e) = trace.fatal {
                error!(episode, error = %e, "action selection failed, aborting training");
                return Err(e.into());
            }
            if trace.result.outcome == EpisodeOutcome::Abandoned && self.is_interrupted() {
                info!(episode, "training interrupted mid-episode");
                return Ok(());
            }

            if self.config.update_interval > 0 && episode % self.config.update_interval == 0 {
                self.update(worker)?;
            }
            self.agent.decay_epsilon(episode);

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                self.log_progress(episode);
            }
            if self.config.eval_interval > 0 && episode % self.config.eval_interval == 0 {
                let report = self.evaluate(rules, self.config.eval_games)?;
                info!(
                    episode,
                    games = report.games,
                    win_rate = report.win_rate(),
                    "evaluation vs random"
                );
            }
            if self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0
            {
                self.save_checkpoint(rules, episode)?;
            }
        }
        Ok(())
    }

    /// One batch update from the replay buffer, skipped while the buffer
    /// holds fewer than `batch_size` transitions.
    fn update(&mut self, worker: Option<&UpdateWorker>) -> Result<(), TrainingError> {
        let batch = match self.buffer.sample(self.config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                debug!(error = %e, "skipping update");
                return Ok(());
            }
        };
        match worker {
            Some(worker) => worker.submit(batch)?,
            None => {
                let loss = self.agent.train_on_batch(
                    &batch,
                    self.config.discount_factor,
                    self.config.shape_action_bucket,
                )?;
                self.metrics.record_update(loss);
            }
        }
        Ok(())
    }

    fn drain_worker_losses(&mut self, worker: &UpdateWorker) {
        self.record_worker_losses(worker.drain_losses());
    }

    /// One loss per batch the worker finished.
    fn record_worker_losses(&mut self, losses: Vec<f32>) {
        self.agent.record_external_updates(losses.len());
        for loss in losses {
            self.metrics.record_update(loss);
        }
    }

    fn log_progress(&self, episode: usize) {
        let window = self.config.log_interval;
        info!(
            episode,
            epsilon = self.agent.epsilon(),
            loss = self.metrics.average_loss(window),
            win_rate = self.metrics.win_rate(window),
            draw_rate = self.metrics.draw_rate(window),
            avg_len = self.metrics.average_game_length(window),
            buffer = self.buffer.len(),
            "progress"
        );
    }

    /// Play the greedy agent against [`RandomAgent`] for `games` games,
    /// alternating sides. Exploration is restored afterwards.
    pub fn evaluate(
        &mut self,
        rules: &dyn RulesDelegate,
        games: usize,
    ) -> Result<EvalReport, TrainingError> {
        let seed = derive_seed(self.config.seed, self.episodes_played + 1);
        let mut random = RandomAgent::with_seed(seed);
        let saved_epsilon = self.agent.epsilon();
        self.agent.set_epsilon(0.0);
        let report = episode::evaluate_against(
            &mut self.agent,
            &mut random,
            rules,
            games,
            self.config.max_moves_per_episode,
        );
        self.agent.set_epsilon(saved_epsilon);
        report.map_err(TrainingError::from)
    }

    fn save_checkpoint(
        &mut self,
        rules: &dyn RulesDelegate,
        episode: usize,
    ) -> Result<(), TrainingError> {
        if self.checkpoints.is_none() {
            return Ok(());
        }
        let window = self.config.log_interval.max(1);
        let win_rate = if self.config.eval_games > 0 {
            self.evaluate(rules, self.config.eval_games)?.win_rate()
        } else {
            self.metrics.win_rate(window)
        };
        let (input_size, hidden_size, output_size) = self.agent.network().dims();
        let agent_config = self.agent.config();
        let metadata = CheckpointMetadata {
            episode,
            timestamp: CheckpointManager::now_timestamp(),
            metrics: CheckpointMetrics {
                win_rate,
                draw_rate: self.metrics.draw_rate(window),
                average_game_length: self.metrics.average_game_length(window),
                current_loss: self.metrics.average_loss(window),
                update_count: self.agent.update_count(),
            },
            stats: self.stats,
            hyperparameters: CheckpointHyperparameters {
                learning_rate: agent_config.learning_rate,
                discount_factor: self.config.discount_factor,
                epsilon: self.agent.epsilon(),
                epsilon_min: agent_config.epsilon_min,
                epsilon_decay_episodes: agent_config.epsilon_decay_episodes,
                batch_size: self.config.batch_size,
                buffer_capacity: self.config.buffer_capacity,
                input_size,
                hidden_size,
                output_size,
            },
        };

        if let Some(manager) = &self.checkpoints {
            match manager.save_checkpoint(self.agent.network(), &metadata) {
                Ok(path) => info!(path = %path.display(), "checkpoint saved"),
                Err(e) => {
                    error!(error = %e, "checkpoint failed");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
