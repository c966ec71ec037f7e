use crate::error::RulesError;

use super::{Action, GameState};

/// Result of applying an action through the rules engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub next_state: GameState,
    /// Reward from the perspective of the player who moved: `+1` win,
    /// `-1` loss, `0` draw or non-terminal.
    pub reward: f32,
    pub terminal: bool,
}

/// Narrow interface to the rules engine. The learning core never decides
/// legality itself; it only shapes what this returns.
pub trait RulesDelegate {
    /// Position an episode starts from.
    fn initial_state(&self) -> GameState;

    /// Every rule-legal action for the side to move in `state`.
    fn legal_actions(&self, state: &GameState) -> Vec<Action>;

    /// Apply `action` to `state`.
    fn apply(&self, state: &GameState, action: &Action) -> Result<StepOutcome, RulesError>;
}
