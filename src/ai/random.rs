use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::error::PolicyError;
use crate::game::{Action, GameState, RulesDelegate};

use super::agent::Agent;

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn select_action(
        &mut self,
        state: &GameState,
        rules: &dyn RulesDelegate,
    ) -> Result<Action, PolicyError> {
        let actions = rules.legal_actions(state);
        if actions.is_empty() {
            return Err(PolicyError::NoLegalActions);
        }
        let idx = self.rng.random_range(0..actions.len());
        Ok(actions[idx])
    }

    fn name(&self) -> &str {
        "Random"
    }
}
