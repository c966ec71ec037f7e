use crate::error::PolicyError;
use crate::game::{Action, GameState, RulesDelegate};

/// Anything that can choose a move for the side to play.
///
/// Sessions and the trainer only talk to players through this trait; a
/// human front end or a scripted opponent implements it the same way the
/// learning agent does.
pub trait Agent {
    /// Choose an action for `state.current_player()`. Candidates come from
    /// `rules`; the agent never decides legality itself.
    fn select_action(
        &mut self,
        state: &GameState,
        rules: &dyn RulesDelegate,
    ) -> Result<Action, PolicyError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
