use std::collections::BTreeMap;

use super::Player;

/// Immutable snapshot of a position.
///
/// The grid is stored flat with `(x, y, channel)` at
/// `(y * width + x) * channels + channel`; an entry is `+1` for a piece of
/// player one, `-1` for player two and `0` when empty. Every modifier returns
/// a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    width: usize,
    height: usize,
    channels: usize,
    grid: Vec<i8>,
    hands: [BTreeMap<String, u32>; 2],
    current_player: Player,
    turn: u32,
    queen_placed: [bool; 2],
}

impl GameState {
    /// Empty grid with both players holding `hand`; player one to move.
    pub fn new(width: usize, height: usize, channels: usize, hand: BTreeMap<String, u32>) -> Self {
        GameState {
            width,
            height,
            channels,
            grid: vec![0; width * height * channels],
            hands: [hand.clone(), hand],
            current_player: Player::One,
            turn: 0,
            queen_placed: [false; 2],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw occupancy grid in encoder order.
    pub fn grid(&self) -> &[i8] {
        &self.grid
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn queen_placed(&self, player: Player) -> bool {
        self.queen_placed[player.index()]
    }

    /// Remaining count of `piece` in `player`'s hand (0 when unknown).
    pub fn hand_count(&self, player: Player, piece: &str) -> u32 {
        self.hands[player.index()].get(piece).copied().unwrap_or(0)
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    fn offset(&self, x: usize, y: usize, channel: usize) -> usize {
        (y * self.width + x) * self.channels + channel
    }

    /// Occupancy at `(x, y, channel)`; out-of-range reads are empty.
    pub fn cell(&self, x: usize, y: usize, channel: usize) -> i8 {
        if !self.in_bounds(x, y) || channel >= self.channels {
            return 0;
        }
        self.grid[self.offset(x, y, channel)]
    }

    /// Top piece at `(x, y)` as `(channel, owner)`, if any.
    pub fn piece_at(&self, x: usize, y: usize) -> Option<(usize, Player)> {
        (0..self.channels).find_map(|c| match self.cell(x, y, c) {
            v if v > 0 => Some((c, Player::One)),
            v if v < 0 => Some((c, Player::Two)),
            _ => None,
        })
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.piece_at(x, y).is_some()
    }

    /// True when nothing has been placed yet.
    pub fn is_empty_board(&self) -> bool {
        self.grid.iter().all(|&v| v == 0)
    }

    /// Copy with `(x, y, channel)` set to `value`. Out-of-range writes are
    /// ignored.
    pub fn with_cell(&self, x: usize, y: usize, channel: usize, value: i8) -> Self {
        let mut next = self.clone();
        if self.in_bounds(x, y) && channel < self.channels {
            let idx = self.offset(x, y, channel);
            next.grid[idx] = value;
        }
        next
    }

    /// Copy with `player`'s count of `piece` replaced.
    pub fn with_hand_count(&self, player: Player, piece: &str, count: u32) -> Self {
        let mut next = self.clone();
        next.hands[player.index()].insert(piece.to_string(), count);
        next
    }

    pub fn with_queen_placed(&self, player: Player) -> Self {
        let mut next = self.clone();
        next.queen_placed[player.index()] = true;
        next
    }

    /// Copy with the other player to move and the turn counter incremented.
    pub fn advance_turn(&self) -> Self {
        let mut next = self.clone();
        next.current_player = self.current_player.other();
        next.turn += 1;
        next
    }
}
