use std::collections::BTreeMap;

/// Piece names in channel order. Channel 0 is the queen bee.
pub const PIECE_NAMES: [&str; 8] = [
    "QueenBee",
    "Beetle",
    "Spider",
    "Ant",
    "Grasshopper",
    "Ladybug",
    "Mosquito",
    "Pillbug",
];

/// Starting count per player for each entry of [`PIECE_NAMES`].
pub const PIECE_COUNTS: [u32; 8] = [1, 2, 2, 3, 3, 1, 1, 1];

/// Number of piece types in the base set (no expansion pieces).
pub const BASE_PIECE_TYPES: usize = 5;

/// Channel index of the queen bee.
pub const QUEEN: usize = 0;

/// Name of the piece in channel `piece`, if it exists.
pub fn piece_name(piece: usize) -> Option<&'static str> {
    PIECE_NAMES.get(piece).copied()
}

/// Channel of a named piece.
pub fn piece_index(name: &str) -> Option<usize> {
    PIECE_NAMES.iter().position(|&n| n == name)
}

/// Starting hand for a game using the first `piece_types` channels.
pub fn starting_hand(piece_types: usize) -> BTreeMap<String, u32> {
    PIECE_NAMES
        .iter()
        .zip(PIECE_COUNTS)
        .take(piece_types)
        .map(|(name, count)| (name.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_hand() {
        let hand = starting_hand(BASE_PIECE_TYPES);
        assert_eq!(hand.len(), 5);
        assert_eq!(hand["QueenBee"], 1);
        assert_eq!(hand["Ant"], 3);
        assert!(!hand.contains_key("Mosquito"));
        assert_eq!(hand.values().sum::<u32>(), 11);
    }

    #[test]
    fn test_name_index_lookup() {
        for (i, name) in PIECE_NAMES.iter().enumerate() {
            assert_eq!(piece_index(name), Some(i));
            assert_eq!(piece_name(i), Some(*name));
        }
        assert_eq!(piece_name(8), None);
        assert_eq!(piece_index("Tideworm"), None);
    }
}
