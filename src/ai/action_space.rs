use tracing::trace;

use crate::error::PolicyError;
use crate::game::{Action, GameState, RulesDelegate};

/// Bijective integer encoding of actions over a `width × height` grid with
/// `piece_types` channels.
///
/// Ids are laid out in two disjoint ranges:
///
/// ```text
/// [0, C*P)              Place: cell*P + piece
/// [C*P, C*P + C*C*P)    Move:  C*P + (from_cell*C + to_cell)*P + piece
/// ```
///
/// where `C = width * height` and `cell = y * width + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    pub width: usize,
    pub height: usize,
    pub piece_types: usize,
}

impl ActionSpace {
    pub fn new(width: usize, height: usize, piece_types: usize) -> Self {
        ActionSpace {
            width,
            height,
            piece_types,
        }
    }

    /// Action space matching the dimensions of `state`.
    pub fn for_state(state: &GameState) -> Self {
        Self::new(state.width(), state.height(), state.channels())
    }

    fn cells(&self) -> usize {
        self.width * self.height
    }

    /// Number of Place ids; also the first Move id.
    pub fn place_count(&self) -> usize {
        self.cells() * self.piece_types
    }

    /// Total size of the id range.
    pub fn num_actions(&self) -> usize {
        self.place_count() + self.cells() * self.cells() * self.piece_types
    }

    fn cell_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn cell_coords(&self, cell: usize) -> (usize, usize) {
        (cell % self.width, cell / self.width)
    }

    pub fn encode_place(&self, x: usize, y: usize, piece: usize) -> usize {
        self.cell_index(x, y) * self.piece_types + piece
    }

    /// Inverse of [`encode_place`](Self::encode_place). `None` for ids
    /// outside the Place range.
    pub fn decode_place(&self, id: usize) -> Option<(usize, usize, usize)> {
        if id >= self.place_count() {
            return None;
        }
        let (x, y) = self.cell_coords(id / self.piece_types);
        Some((x, y, id % self.piece_types))
    }

    pub fn encode_move(
        &self,
        from_x: usize,
        from_y: usize,
        to_x: usize,
        to_y: usize,
        piece: usize,
    ) -> usize {
        let pair = self.cell_index(from_x, from_y) * self.cells() + self.cell_index(to_x, to_y);
        self.place_count() + pair * self.piece_types + piece
    }

    /// Inverse of [`encode_move`](Self::encode_move), returning
    /// `(from_x, from_y, to_x, to_y, piece)`.
    pub fn decode_move(&self, id: usize) -> Option<(usize, usize, usize, usize, usize)> {
        if id < self.place_count() || id >= self.num_actions() {
            return None;
        }
        let rel = id - self.place_count();
        let piece = rel % self.piece_types;
        let pair = rel / self.piece_types;
        let (from_x, from_y) = self.cell_coords(pair / self.cells());
        let (to_x, to_y) = self.cell_coords(pair % self.cells());
        Some((from_x, from_y, to_x, to_y, piece))
    }

    /// Id of a bounds-valid action.
    pub fn encode(&self, action: &Action) -> Result<usize, PolicyError> {
        if !self.is_valid_bounds(action) {
            return Err(PolicyError::InvalidAction(*action));
        }
        Ok(match *action {
            Action::Place { x, y, piece } => self.encode_place(x, y, piece),
            Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                piece,
            } => self.encode_move(from_x, from_y, to_x, to_y, piece),
        })
    }

    pub fn decode(&self, id: usize) -> Result<Action, PolicyError> {
        if let Some((x, y, piece)) = self.decode_place(id) {
            return Ok(Action::Place { x, y, piece });
        }
        self.decode_move(id)
            .map(|(from_x, from_y, to_x, to_y, piece)| Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                piece,
            })
            .ok_or(PolicyError::UnknownActionId(id))
    }

    /// Coordinates and piece index lie inside the declared ranges. Says
    /// nothing about rule legality.
    pub fn is_valid_bounds(&self, action: &Action) -> bool {
        let cell_ok = |x: usize, y: usize| x < self.width && y < self.height;
        let cells_ok = match *action {
            Action::Place { x, y, .. } => cell_ok(x, y),
            Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                ..
            } => cell_ok(from_x, from_y) && cell_ok(to_x, to_y),
        };
        cells_ok && action.piece() < self.piece_types
    }

    /// Rule-legal candidates for `state`, exactly as enumerated by `rules`.
    /// Bounds are checked on the chosen action, not here, so a misbehaving
    /// delegate surfaces as [`PolicyError::InvalidAction`].
    pub fn legal_actions(&self, state: &GameState, rules: &dyn RulesDelegate) -> Vec<Action> {
        let actions = rules.legal_actions(state);
        trace!(count = actions.len(), turn = state.turn(), "enumerated candidates");
        actions
    }
}
