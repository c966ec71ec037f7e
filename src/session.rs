//! Turn orchestration for a single game between two agents.

use tracing::debug;

use crate::ai::Agent;
use crate::error::{PolicyError, SessionError};
use crate::game::{Action, GameState, Player, RulesDelegate};

/// Queries and turn control a front end needs to drive a game.
pub trait SessionControl {
    fn is_finished(&self) -> bool;

    fn current_player(&self) -> Player;

    /// Winner of a finished game; `None` while running or on a draw.
    fn winner(&self) -> Option<Player>;

    /// Let the side to move play one action. Returns the action played, or
    /// `None` when the game was already over or ended because the side to
    /// move had nothing to play.
    fn advance_turn(&mut self) -> Result<Option<Action>, SessionError>;
}

/// A game in progress: the rules, one agent per side and the position.
pub struct GameSession<'a> {
    rules: &'a dyn RulesDelegate,
    agents: [&'a mut dyn Agent; 2],
    state: GameState,
    max_moves: usize,
    moves: usize,
    finished: bool,
    winner: Option<Player>,
}

impl<'a> GameSession<'a> {
    /// `first` plays as player one. Games longer than `max_moves` end in a
    /// draw.
    pub fn new(
        rules: &'a dyn RulesDelegate,
        first: &'a mut dyn Agent,
        second: &'a mut dyn Agent,
        max_moves: usize,
    ) -> Self {
        GameSession {
            rules,
            state: rules.initial_state(),
            agents: [first, second],
            max_moves,
            moves: 0,
            finished: false,
            winner: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Advance until the game is over.
    pub fn play_to_end(&mut self) -> Result<Option<Player>, SessionError> {
        while !self.finished {
            self.advance_turn()?;
        }
        Ok(self.winner)
    }

    fn finish(&mut self, winner: Option<Player>) {
        self.finished = true;
        self.winner = winner;
        debug!(moves = self.moves, ?winner, "session finished");
    }
}

impl SessionControl for GameSession<'_> {
    fn is_finished(&self) -> bool {
        self.finished
    }

    fn current_player(&self) -> Player {
        self.state.current_player()
    }

    fn winner(&self) -> Option<Player> {
        self.winner
    }

    fn advance_turn(&mut self) -> Result<Option<Action>, SessionError> {
        if self.finished {
            return Ok(None);
        }
        if self.moves >= self.max_moves {
            self.finish(None);
            return Ok(None);
        }

        let mover = self.state.current_player();
        let agent = &mut self.agents[mover.index()];
        let action = match agent.select_action(&self.state, self.rules) {
            Ok(action) => action,
            Err(PolicyError::NoLegalActions) => {
                self.finish(None);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = self.rules.apply(&self.state, &action)?;
        self.state = outcome.next_state;
        self.moves += 1;

        if outcome.terminal {
            let winner = if outcome.reward > 0.0 {
                Some(mover)
            } else if outcome.reward < 0.0 {
                Some(mover.other())
            } else {
                None
            };
            self.finish(winner);
        }
        Ok(Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::RandomAgent;
    use crate::error::RulesError;
    use crate::game::pieces::QUEEN;
    use crate::game::SandboxRules;

    /// Plays a fixed list of actions in order.
    struct Scripted {
        actions: Vec<Action>,
        next: usize,
    }

    impl Scripted {
        fn new(actions: Vec<Action>) -> Self {
            Scripted { actions, next: 0 }
        }
    }

    impl Agent for Scripted {
        fn select_action(
            &mut self,
            _state: &GameState,
            _rules: &dyn RulesDelegate,
        ) -> Result<Action, PolicyError> {
            let action = self
                .actions
                .get(self.next)
                .copied()
                .ok_or(PolicyError::NoLegalActions)?;
            self.next += 1;
            Ok(action)
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    fn place(x: usize, y: usize, piece: usize) -> Action {
        Action::Place { x, y, piece }
    }

    #[test]
    fn test_scripted_win_for_player_one() {
        let rules = SandboxRules::new(4, 4, 5, 50);
        // Player two puts its queen in the corner, player one surrounds it.
        let mut one = Scripted::new(vec![place(1, 0, 3), place(0, 1, 3)]);
        let mut two = Scripted::new(vec![place(0, 0, QUEEN)]);
        let mut session = GameSession::new(&rules, &mut one, &mut two, 100);

        assert_eq!(session.current_player(), Player::One);
        assert_eq!(session.advance_turn().unwrap(), Some(place(1, 0, 3)));
        assert_eq!(session.current_player(), Player::Two);
        session.advance_turn().unwrap();
        assert!(!session.is_finished());
        session.advance_turn().unwrap();

        assert!(session.is_finished());
        assert_eq!(session.winner(), Some(Player::One));
        assert_eq!(session.moves(), 3);
        assert_eq!(session.advance_turn().unwrap(), None);
    }

    #[test]
    fn test_move_cap_is_draw() {
        // Queens only: two pieces can never surround one.
        let rules = SandboxRules::new(4, 4, 1, 50);
        let mut one = RandomAgent::with_seed(1);
        let mut two = RandomAgent::with_seed(2);
        let mut session = GameSession::new(&rules, &mut one, &mut two, 4);

        assert_eq!(session.play_to_end().unwrap(), None);
        assert_eq!(session.moves(), 4);
        assert_eq!(session.state().turn(), 4);
    }

    #[test]
    fn test_nothing_to_play_is_draw() {
        let rules = SandboxRules::new(4, 4, 5, 50);
        let mut one = Scripted::new(vec![place(1, 1, 3)]);
        let mut two = Scripted::new(Vec::new());
        let mut session = GameSession::new(&rules, &mut one, &mut two, 100);

        assert_eq!(session.play_to_end().unwrap(), None);
        assert_eq!(session.moves(), 1);
    }

    #[test]
    fn test_rules_rejection_surfaces() {
        let rules = SandboxRules::new(4, 4, 5, 50);
        let mut one = Scripted::new(vec![place(1, 1, 3)]);
        let mut two = Scripted::new(vec![place(3, 3, 3)]);
        let mut session = GameSession::new(&rules, &mut one, &mut two, 100);

        session.advance_turn().unwrap();
        let err = session.advance_turn().unwrap_err();
        assert_eq!(
            err,
            SessionError::Rules(RulesError::IllegalAction(place(3, 3, 3)))
        );
        assert!(!session.is_finished());
    }
}
