use std::fmt;

/// A candidate move: drop a new piece from the hand, or relocate one already
/// on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Place {
        x: usize,
        y: usize,
        piece: usize,
    },
    Move {
        from_x: usize,
        from_y: usize,
        to_x: usize,
        to_y: usize,
        piece: usize,
    },
}

impl Action {
    /// Piece type (channel) the action concerns.
    pub fn piece(&self) -> usize {
        match *self {
            Action::Place { piece, .. } | Action::Move { piece, .. } => piece,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(self, Action::Place { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Place { x, y, piece } => write!(f, "place #{piece} at ({x}, {y})"),
            Action::Move {
                from_x,
                from_y,
                to_x,
                to_y,
                piece,
            } => write!(f, "move #{piece} ({from_x}, {from_y}) -> ({to_x}, {to_y})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let place = Action::Place { x: 1, y: 2, piece: 3 };
        assert_eq!(place.piece(), 3);
        assert!(place.is_place());

        let mv = Action::Move {
            from_x: 0,
            from_y: 0,
            to_x: 4,
            to_y: 5,
            piece: 1,
        };
        assert_eq!(mv.piece(), 1);
        assert!(!mv.is_place());
    }

    #[test]
    fn test_display() {
        let place = Action::Place { x: 1, y: 2, piece: 0 };
        assert_eq!(place.to_string(), "place #0 at (1, 2)");
    }
}
