use std::collections::VecDeque;

use crate::game::Player;

/// How a self-play episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Won(Player),
    Draw,
    /// Stopped by an interrupt, a rules failure or an invalid action.
    Abandoned,
}

/// Lifetime counters, from player one's perspective.
///
/// `wins + losses + draws + abandoned == total_games` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrainingStats {
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub abandoned: u64,
}

impl TrainingStats {
    pub fn record(&mut self, outcome: EpisodeOutcome) {
        self.total_games += 1;
        match outcome {
            EpisodeOutcome::Won(Player::One) => self.wins += 1,
            EpisodeOutcome::Won(Player::Two) => self.losses += 1,
            EpisodeOutcome::Draw => self.draws += 1,
            EpisodeOutcome::Abandoned => self.abandoned += 1,
        }
    }

    /// Games that reached a result.
    pub fn completed(&self) -> u64 {
        self.wins + self.losses + self.draws
    }
}

/// Result of a single episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeResult {
    pub outcome: EpisodeOutcome,
    pub game_length: usize,
}

/// Rolling-window view of recent episodes and updates.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f32>,
    capacity: usize,
    total_episodes: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_update(&mut self, loss: f32) {
        self.update_losses.push_back(loss);
        if self.update_losses.len() > self.capacity {
            self.update_losses.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    fn rate(&self, last_n: usize, pred: impl Fn(&EpisodeOutcome) -> bool) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let hits = self.recent(n).filter(|r| pred(&r.outcome)).count();
        hits as f32 / n as f32
    }

    /// Share of the last `last_n` episodes won by player one.
    pub fn win_rate(&self, last_n: usize) -> f32 {
        self.rate(last_n, |o| *o == EpisodeOutcome::Won(Player::One))
    }

    pub fn draw_rate(&self, last_n: usize) -> f32 {
        self.rate(last_n, |o| *o == EpisodeOutcome::Draw)
    }

    pub fn abandon_rate(&self, last_n: usize) -> f32 {
        self.rate(last_n, |o| *o == EpisodeOutcome::Abandoned)
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        let n = self.update_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.update_losses.iter().rev().take(n).sum();
        sum / n as f32
    }

    /// Average number of turns over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.recent(n).map(|r| r.game_length).sum();
        total as f32 / n as f32
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: EpisodeOutcome, game_length: usize) -> EpisodeResult {
        EpisodeResult {
            outcome,
            game_length,
        }
    }

    #[test]
    fn test_stats_partition_total() {
        let mut stats = TrainingStats::default();
        for outcome in [
            EpisodeOutcome::Won(Player::One),
            EpisodeOutcome::Won(Player::Two),
            EpisodeOutcome::Won(Player::Two),
            EpisodeOutcome::Draw,
            EpisodeOutcome::Abandoned,
        ] {
            stats.record(outcome);
        }
        assert_eq!(stats.total_games, 5);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 2);
        assert_eq!(stats.completed(), 4);
        assert_eq!(
            stats.wins + stats.losses + stats.draws + stats.abandoned,
            stats.total_games
        );
    }

    #[test]
    fn test_win_rate() {
        let mut m = TrainingMetrics::new();
        for _ in 0..7 {
            m.record_episode(result(EpisodeOutcome::Won(Player::One), 10));
        }
        for _ in 0..3 {
            m.record_episode(result(EpisodeOutcome::Won(Player::Two), 10));
        }
        assert!((m.win_rate(10) - 0.7).abs() < 1e-6);
        // Only the three most recent episodes, all losses.
        assert_eq!(m.win_rate(3), 0.0);
    }

    #[test]
    fn test_draw_and_abandon_rate() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(EpisodeOutcome::Draw, 42));
        m.record_episode(result(EpisodeOutcome::Won(Player::One), 10));
        m.record_episode(result(EpisodeOutcome::Abandoned, 3));
        m.record_episode(result(EpisodeOutcome::Draw, 200));
        assert!((m.draw_rate(10) - 0.5).abs() < 1e-6);
        assert!((m.abandon_rate(10) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_average_loss() {
        let mut m = TrainingMetrics::new();
        assert_eq!(m.average_loss(10), 0.0);
        m.record_update(1.0);
        m.record_update(3.0);
        assert!((m.average_loss(10) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut m = TrainingMetrics::with_capacity(2);
        m.record_episode(result(EpisodeOutcome::Draw, 20));
        m.record_episode(result(EpisodeOutcome::Draw, 30));
        m.record_episode(result(EpisodeOutcome::Draw, 40));
        assert!((m.average_game_length(10) - 35.0).abs() < 1e-6);
        assert_eq!(m.total_episodes(), 3);
    }
}
