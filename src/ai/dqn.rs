use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::action_space::ActionSpace;
use crate::ai::agent::Agent;
use crate::ai::network::ValueNetwork;
use crate::ai::policy::{self, EpsilonGreedy};
use crate::ai::state_encoding::{encode_state, feature_len};
use crate::error::{ModelIoError, PolicyError};
use crate::game::{Action, GameState, RulesDelegate};
use crate::training::replay_buffer::Transition;

/// Learning-agent hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Exploration rate at the start of training.
    pub epsilon: f32,
    pub epsilon_min: f32,
    /// Episodes over which epsilon falls linearly to `epsilon_min`.
    /// 0 keeps epsilon fixed.
    pub epsilon_decay_episodes: usize,
    pub learning_rate: f32,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            epsilon: 0.1,
            epsilon_min: 0.1,
            epsilon_decay_episodes: 0,
            learning_rate: 0.001,
            hidden_size: 256,
            output_size: 100,
        }
    }
}

/// Bootstrapped training target for one transition.
///
/// Starts from the network's current prediction for `transition.state` and
/// overwrites a single output: slot 0, or the action's bucket when
/// `shape_action_bucket` is set. The new value is the reward for terminal
/// transitions, otherwise `reward + discount * max(q(next_state))`.
///
/// Returns the target together with the index that was shaped.
pub fn bootstrap_target(
    network: &ValueNetwork,
    space: &ActionSpace,
    transition: &Transition,
    discount: f32,
    shape_action_bucket: bool,
) -> Result<(Vec<f32>, usize), PolicyError> {
    let mut target = policy::compute_q_values(network, &transition.state)?;
    let slot = if shape_action_bucket {
        policy::action_bucket(space, &transition.action, target.len())?
    } else {
        0
    };

    let value = if transition.terminal {
        transition.reward
    } else {
        let next = policy::compute_q_values(network, &transition.next_state)?;
        let best = next.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let best = if best.is_finite() { best } else { 0.0 };
        transition.reward + discount * best
    };

    if let Some(t) = target.get_mut(slot) {
        *t = value;
    }
    Ok((target, slot))
}

/// One `update` per transition, each against a freshly computed target.
/// Returns the mean squared error of the predictions before each step.
pub fn train_network_on_batch(
    network: &mut ValueNetwork,
    space: &ActionSpace,
    batch: &[Transition],
    discount: f32,
    learning_rate: f32,
    shape_action_bucket: bool,
) -> Result<f32, PolicyError> {
    if batch.is_empty() {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for transition in batch {
        let input = encode_state(&transition.state);
        let (target, slot) =
            bootstrap_target(network, space, transition, discount, shape_action_bucket)?;
        // Only `slot` differs from the current prediction.
        let predicted = network.forward(&input)?;
        if let (Some(p), Some(t)) = (predicted.get(slot), target.get(slot)) {
            total += (p - t) * (p - t) / predicted.len() as f32;
        }
        network.update(&input, &target, learning_rate)?;
    }
    Ok(total / batch.len() as f32)
}

/// Epsilon-greedy agent backed by a [`ValueNetwork`].
pub struct DqnAgent {
    network: ValueNetwork,
    policy: EpsilonGreedy,
    space: ActionSpace,
    config: AgentConfig,
    rng: StdRng,
    update_count: usize,
}

impl DqnAgent {
    /// Network input size follows from `space`; weights and exploration
    /// draws both come from `seed`.
    pub fn new(config: AgentConfig, space: ActionSpace, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let input = feature_len(space.width, space.height, space.piece_types);
        let network = ValueNetwork::new(input, config.hidden_size, config.output_size, &mut rng);
        DqnAgent {
            network,
            policy: EpsilonGreedy::new(config.epsilon),
            space,
            config,
            rng,
            update_count: 0,
        }
    }

    pub fn compute_q_values(&self, state: &GameState) -> Result<Vec<f32>, PolicyError> {
        policy::compute_q_values(&self.network, state)
    }

    /// Apply one gradient step per transition in `batch`.
    pub fn train_on_batch(
        &mut self,
        batch: &[Transition],
        discount: f32,
        shape_action_bucket: bool,
    ) -> Result<f32, PolicyError> {
        let loss = train_network_on_batch(
            &mut self.network,
            &self.space,
            batch,
            discount,
            self.config.learning_rate,
            shape_action_bucket,
        )?;
        self.update_count += 1;
        Ok(loss)
    }

    /// Linear decay from the configured start value towards `epsilon_min`
    /// after `episodes_done` episodes.
    pub fn decay_epsilon(&mut self, episodes_done: usize) {
        if self.config.epsilon_decay_episodes == 0 {
            return;
        }
        let progress =
            (episodes_done as f32 / self.config.epsilon_decay_episodes as f32).min(1.0);
        self.policy.epsilon =
            self.config.epsilon + (self.config.epsilon_min - self.config.epsilon) * progress;
    }

    pub fn epsilon(&self) -> f32 {
        self.policy.epsilon
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy play).
    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.policy.epsilon = epsilon;
    }

    pub fn learning_rate(&self) -> f32 {
        self.config.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.config.learning_rate = learning_rate;
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Count batches trained outside the agent, on a weight copy that is
    /// later swapped in with [`replace_network`](Self::replace_network).
    pub fn record_external_updates(&mut self, batches: usize) {
        self.update_count += batches;
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    pub fn network(&self) -> &ValueNetwork {
        &self.network
    }

    /// Swap in weights trained elsewhere (e.g. by the update worker).
    pub fn replace_network(&mut self, network: ValueNetwork) {
        self.network = network;
    }

    pub fn save_model(&self, path: &Path) -> Result<(), ModelIoError> {
        self.network.save(path)
    }

    /// Load weights saved with the same dimensions. On failure the current
    /// weights are kept.
    pub fn load_model(&mut self, path: &Path) -> Result<(), ModelIoError> {
        self.network.load(path)
    }
}

impl Agent for DqnAgent {
    fn select_action(
        &mut self,
        state: &GameState,
        rules: &dyn RulesDelegate,
    ) -> Result<Action, PolicyError> {
        self.policy
            .select_action(state, rules, &self.space, &self.network, &mut self.rng)
    }

    fn name(&self) -> &str {
        "DQN"
    }
}
