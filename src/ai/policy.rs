use rand::Rng;
use tracing::trace;

use crate::ai::action_space::ActionSpace;
use crate::ai::network::ValueNetwork;
use crate::ai::state_encoding::encode_state;
use crate::error::PolicyError;
use crate::game::{Action, GameState, RulesDelegate};

/// Epsilon-greedy action selection over a value network.
///
/// With probability `epsilon` a legal candidate is drawn uniformly; otherwise
/// each candidate is scored by the network output at
/// `encode(action) % output_size` and the best one is taken. Ties go to the
/// candidate enumerated first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    pub epsilon: f32,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f32) -> Self {
        EpsilonGreedy { epsilon }
    }

    pub fn select_action<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        rules: &dyn RulesDelegate,
        space: &ActionSpace,
        network: &ValueNetwork,
        rng: &mut R,
    ) -> Result<Action, PolicyError> {
        let candidates = space.legal_actions(state, rules);
        if candidates.is_empty() {
            return Err(PolicyError::NoLegalActions);
        }

        let explore = rng.random::<f32>() < self.epsilon;
        let action = if explore {
            candidates[rng.random_range(0..candidates.len())]
        } else {
            let q = compute_q_values(network, state)?;
            best_candidate(&candidates, &q, space)?
        };

        if !space.is_valid_bounds(&action) {
            return Err(PolicyError::InvalidAction(action));
        }
        trace!(%action, explore, "selected action");
        Ok(action)
    }
}

/// Network output for the encoded `state`.
pub fn compute_q_values(
    network: &ValueNetwork,
    state: &GameState,
) -> Result<Vec<f32>, PolicyError> {
    Ok(network.forward(&encode_state(state))?)
}

/// Output slot scoring `action`. Several actions share a slot when the id
/// range exceeds the output size.
pub fn action_bucket(space: &ActionSpace, action: &Action, output_size: usize) -> Result<usize, PolicyError> {
    let id = space.encode(action)?;
    Ok(id % output_size.max(1))
}

fn best_candidate(
    candidates: &[Action],
    q: &[f32],
    space: &ActionSpace,
) -> Result<Action, PolicyError> {
    let mut best = candidates[0];
    let mut best_q = f32::NEG_INFINITY;
    for action in candidates {
        let bucket = action_bucket(space, action, q.len())?;
        let value = q.get(bucket).copied().unwrap_or(0.0);
        if value > best_q {
            best_q = value;
            best = *action;
        }
    }
    Ok(best)
}
