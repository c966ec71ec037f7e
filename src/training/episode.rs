use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::ai::Agent;
use crate::error::{PolicyError, SessionError};
use crate::game::{Player, RulesDelegate};
use crate::session::GameSession;
use crate::training::metrics::{EpisodeOutcome, EpisodeResult};
use crate::training::replay_buffer::Transition;

/// Everything one self-play episode produced.
pub struct EpisodeTrace {
    /// In the order they should enter the replay buffer.
    pub transitions: Vec<Transition>,
    pub result: EpisodeResult,
    /// Set when action selection failed for a reason other than an empty
    /// candidate list; the caller is expected to stop training.
    pub fatal: Option<PolicyError>,
}

/// Play one self-play episode with `agent` on both sides.
///
/// Rewards are from the mover's point of view. Each mover's transition is
/// held back until the opponent has replied, so when the reply ends the game
/// the held transition can be rewritten with the negated reward and marked
/// terminal. `interrupt` is polled before every turn.
pub fn play_self_play_episode(
    agent: &mut dyn Agent,
    rules: &dyn RulesDelegate,
    max_moves: usize,
    interrupt: &AtomicBool,
) -> EpisodeTrace {
    let mut state = rules.initial_state();
    let mut transitions = Vec::new();
    let mut pending: Option<Transition> = None;
    let mut moves = 0;
    let mut fatal = None;

    let outcome = loop {
        if interrupt.load(Ordering::Relaxed) {
            debug!(moves, "episode interrupted");
            transitions.extend(pending.take());
            break EpisodeOutcome::Abandoned;
        }
        if moves >= max_moves {
            transitions.extend(pending.take().map(|t| ended(t, 0.0)));
            break EpisodeOutcome::Draw;
        }

        let mover = state.current_player();
        let action = match agent.select_action(&state, rules) {
            Ok(action) => action,
            Err(PolicyError::NoLegalActions) => {
                debug!(moves, player = mover.name(), "no legal actions, scoring as draw");
                transitions.extend(pending.take().map(|t| ended(t, 0.0)));
                break EpisodeOutcome::Draw;
            }
            Err(e) => {
                transitions.extend(pending.take());
                fatal = Some(e);
                break EpisodeOutcome::Abandoned;
            }
        };

        let step = match rules.apply(&state, &action) {
            Ok(step) => step,
            Err(e) => {
                warn!(error = %e, moves, "rules rejected action, abandoning episode");
                transitions.extend(pending.take());
                break EpisodeOutcome::Abandoned;
            }
        };
        moves += 1;

        let transition = Transition {
            state,
            action,
            reward: step.reward,
            next_state: step.next_state.clone(),
            terminal: step.terminal,
        };
        state = step.next_state;

        if step.terminal {
            transitions.extend(pending.take().map(|t| ended(t, -step.reward)));
            transitions.push(transition);
            break winner_outcome(mover, step.reward);
        }
        transitions.extend(pending.replace(transition));
    };

    EpisodeTrace {
        transitions,
        result: EpisodeResult {
            outcome,
            game_length: moves,
        },
        fatal,
    }
}

fn ended(mut transition: Transition, reward: f32) -> Transition {
    transition.reward = reward;
    transition.terminal = true;
    transition
}

fn winner_outcome(mover: Player, reward: f32) -> EpisodeOutcome {
    if reward > 0.0 {
        EpisodeOutcome::Won(mover)
    } else if reward < 0.0 {
        EpisodeOutcome::Won(mover.other())
    } else {
        EpisodeOutcome::Draw
    }
}

/// Tally of evaluation games, from the evaluated agent's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalReport {
    pub games: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    /// Games cut short by a rules failure.
    pub abandoned: usize,
}

impl EvalReport {
    pub fn win_rate(&self) -> f32 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f32 / self.games as f32
    }
}

/// Play a single evaluation game between two agents.
/// Returns Some(true) if agent won, Some(false) if agent lost, None if draw.
pub fn play_eval_game(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    rules: &dyn RulesDelegate,
    agent_first: bool,
    max_moves: usize,
) -> Result<Option<bool>, SessionError> {
    let mut session = if agent_first {
        GameSession::new(rules, agent, opponent, max_moves)
    } else {
        GameSession::new(rules, opponent, agent, max_moves)
    };
    let winner = session.play_to_end()?;
    let agent_side = if agent_first { Player::One } else { Player::Two };
    Ok(winner.map(|w| w == agent_side))
}

/// Play `games` evaluation games, alternating who moves first. Invalid
/// actions propagate; rules failures only abandon the game at hand.
pub fn evaluate_against(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    rules: &dyn RulesDelegate,
    games: usize,
    max_moves: usize,
) -> Result<EvalReport, PolicyError> {
    let mut report = EvalReport::default();
    for game_idx in 0..games {
        let agent_first = game_idx % 2 == 0;
        report.games += 1;
        match play_eval_game(agent, opponent, rules, agent_first, max_moves) {
            Ok(Some(true)) => report.wins += 1,
            Ok(Some(false)) => report.losses += 1,
            Ok(None) => report.draws += 1,
            Err(SessionError::Rules(e)) => {
                warn!(error = %e, game_idx, "evaluation game abandoned");
                report.abandoned += 1;
            }
            Err(SessionError::Policy(e)) => return Err(e),
        }
    }
    Ok(report)
}

/// Derive a deterministic seed for a given stream index.
pub fn derive_seed(base_seed: u64, index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
