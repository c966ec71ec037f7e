//! A reduced Hive rule set on a square grid.
//!
//! Good enough to drive self-play end to end without the full rules engine:
//! pieces are placed next to the hive, a player may step a piece one cell
//! orthogonally once their queen is down, and a queen whose in-bounds
//! neighbours are all occupied is surrounded.

use crate::error::RulesError;

use super::pieces::{self, PIECE_NAMES, QUEEN};
use super::rules::{RulesDelegate, StepOutcome};
use super::{Action, GameState, Player};

const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone)]
pub struct SandboxRules {
    width: usize,
    height: usize,
    piece_types: usize,
    turn_limit: u32,
}

impl SandboxRules {
    /// `piece_types` is clamped to the size of the piece catalogue.
    pub fn new(width: usize, height: usize, piece_types: usize, turn_limit: u32) -> Self {
        SandboxRules {
            width,
            height,
            piece_types: piece_types.min(PIECE_NAMES.len()),
            turn_limit,
        }
    }

    fn neighbours(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        DIRECTIONS.iter().filter_map(move |&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < self.width && ny < self.height).then_some((nx, ny))
        })
    }

    fn touches_hive(&self, state: &GameState, x: usize, y: usize) -> bool {
        self.neighbours(x, y).any(|(nx, ny)| state.is_occupied(nx, ny))
    }

    fn in_bounds(&self, action: &Action) -> bool {
        let cell_ok = |x: usize, y: usize| x < self.width && y < self.height;
        let fields_ok = match *action {
            Action::Place { x, y, .. } => cell_ok(x, y),
            Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                ..
            } => cell_ok(from_x, from_y) && cell_ok(to_x, to_y),
        };
        fields_ok && action.piece() < self.piece_types
    }

    /// Whether `player`'s queen is on the grid with no free neighbour.
    fn is_surrounded(&self, state: &GameState, player: Player) -> bool {
        let queen = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .find(|&(x, y)| state.cell(x, y, QUEEN) == player.occupancy());
        match queen {
            Some((x, y)) => self.neighbours(x, y).all(|(nx, ny)| state.is_occupied(nx, ny)),
            None => false,
        }
    }

    fn placement_targets(&self, state: &GameState) -> Vec<(usize, usize)> {
        let first_move = state.is_empty_board();
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                !state.is_occupied(x, y) && (first_move || self.touches_hive(state, x, y))
            })
            .collect()
    }
}

impl RulesDelegate for SandboxRules {
    fn initial_state(&self) -> GameState {
        GameState::new(
            self.width,
            self.height,
            self.piece_types,
            pieces::starting_hand(self.piece_types),
        )
    }

    fn legal_actions(&self, state: &GameState) -> Vec<Action> {
        let player = state.current_player();
        let mut actions = Vec::new();

        let targets = self.placement_targets(state);
        for (piece, name) in PIECE_NAMES.iter().enumerate().take(self.piece_types) {
            if state.hand_count(player, name) == 0 {
                continue;
            }
            actions.extend(targets.iter().map(|&(x, y)| Action::Place { x, y, piece }));
        }

        if state.queen_placed(player) {
            for y in 0..self.height {
                for x in 0..self.width {
                    let Some((piece, owner)) = state.piece_at(x, y) else {
                        continue;
                    };
                    if owner != player {
                        continue;
                    }
                    for (to_x, to_y) in self.neighbours(x, y) {
                        if !state.is_occupied(to_x, to_y) {
                            actions.push(Action::Move {
                                from_x: x,
                                from_y: y,
                                to_x,
                                to_y,
                                piece,
                            });
                        }
                    }
                }
            }
        }

        actions
    }

    fn apply(&self, state: &GameState, action: &Action) -> Result<StepOutcome, RulesError> {
        if !self.in_bounds(action) {
            return Err(RulesError::OutOfBounds(*action));
        }
        if !self.legal_actions(state).contains(action) {
            return Err(RulesError::IllegalAction(*action));
        }

        let player = state.current_player();
        let occupancy = player.occupancy();
        let placed = match *action {
            Action::Place { x, y, piece } => {
                let name = PIECE_NAMES[piece];
                let remaining = state.hand_count(player, name) - 1;
                let next = state
                    .with_cell(x, y, piece, occupancy)
                    .with_hand_count(player, name, remaining);
                if piece == QUEEN {
                    next.with_queen_placed(player)
                } else {
                    next
                }
            }
            Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                piece,
            } => state
                .with_cell(from_x, from_y, piece, 0)
                .with_cell(to_x, to_y, piece, occupancy),
        };
        let next_state = placed.advance_turn();

        let mover_lost = self.is_surrounded(&next_state, player);
        let opponent_lost = self.is_surrounded(&next_state, player.other());
        let (reward, terminal) = match (mover_lost, opponent_lost) {
            (true, true) => (0.0, true),
            (false, true) => (1.0, true),
            (true, false) => (-1.0, true),
            (false, false) => (0.0, next_state.turn() >= self.turn_limit),
        };

        Ok(StepOutcome {
            next_state,
            reward,
            terminal,
        })
    }
}
