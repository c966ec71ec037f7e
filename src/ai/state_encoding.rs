use crate::game::{GameState, Player};

/// Number of scalar features appended after the grid.
pub const METADATA_FEATURES: usize = 4;

/// Length of the encoding for a `width × height × channels` grid.
pub fn feature_len(width: usize, height: usize, channels: usize) -> usize {
    width * height * channels + METADATA_FEATURES
}

/// Encode a game state as a flat feature vector.
///
/// Layout, for a `W × H × D` grid:
///
/// ```text
/// [0, W*H*D)   occupancy, (x, y, c) at (y*W + x)*D + c  (+1 / -1 / 0)
/// W*H*D        current player (0.0 = one, 1.0 = two)
/// W*H*D + 1    turn counter
/// W*H*D + 2    queen placed by player one (0.0 / 1.0)
/// W*H*D + 3    queen placed by player two (0.0 / 1.0)
/// ```
pub fn encode_state(state: &GameState) -> Vec<f32> {
    let grid = state.grid();
    let mut data = Vec::with_capacity(grid.len() + METADATA_FEATURES);
    data.extend(grid.iter().map(|&v| f32::from(v)));

    data.push(match state.current_player() {
        Player::One => 0.0,
        Player::Two => 1.0,
    });
    data.push(state.turn() as f32);
    data.push(flag(state.queen_placed(Player::One)));
    data.push(flag(state.queen_placed(Player::Two)));
    data
}

fn flag(set: bool) -> f32 {
    if set {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::pieces::{starting_hand, QUEEN};

    #[test]
    fn test_encode_initial_state_shape() {
        let state = GameState::new(10, 10, 8, starting_hand(8));
        let data = encode_state(&state);
        assert_eq!(data.len(), 804);
        assert_eq!(data.len(), feature_len(10, 10, 8));
        assert!(data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_grid_order_is_row_column_channel() {
        let (w, h, d) = (3, 2, 4);
        let state = GameState::new(w, h, d, starting_hand(d))
            .with_cell(2, 1, 3, Player::One.occupancy())
            .with_cell(0, 1, 1, Player::Two.occupancy());
        let data = encode_state(&state);

        assert_eq!(data[(w + 2) * d + 3], 1.0);
        assert_eq!(data[w * d + 1], -1.0);
        assert_eq!(data.iter().take(w * h * d).filter(|&&v| v != 0.0).count(), 2);
    }

    #[test]
    fn test_metadata_tail() {
        let state = GameState::new(2, 2, 5, starting_hand(5))
            .with_cell(0, 0, QUEEN, Player::One.occupancy())
            .with_queen_placed(Player::One)
            .advance_turn()
            .advance_turn()
            .advance_turn();
        let data = encode_state(&state);
        let tail = &data[20..];
        assert_eq!(tail, &[1.0, 3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let state = GameState::new(4, 4, 5, starting_hand(5)).with_cell(1, 1, 2, 1);
        assert_eq!(encode_state(&state), encode_state(&state.clone()));
    }
}
