//! The live position set and its move histories.

use std::collections::HashMap;

use crate::board::Board;

/// Result tokens a finished MoveSet ends with.
pub const RESULT_TOKENS: [&str; 3] = ["1-0", "0-1", "½-½"];

/// One path that reached a position: the SAN half-moves plus the capture and
/// promotion multisets accumulated along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSet {
    /// Space-separated SAN tokens, with the result token appended when the
    /// game ended.
    pub moves: String,
    /// Captured pieces as characters (`L`/`D` shades for bishops).
    pub captures: String,
    /// Promoted-to pieces as characters.
    pub promotions: String,
}

impl MoveSet {
    pub fn start() -> Self {
        MoveSet {
            moves: String::new(),
            captures: String::new(),
            promotions: String::new(),
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.moves.split_whitespace()
    }

    /// SAN tokens only, without a trailing result token.
    pub fn san_count(&self) -> usize {
        self.tokens().filter(|t| !RESULT_TOKENS.contains(t)).count()
    }

    pub fn is_finished(&self) -> bool {
        self.tokens().last().is_some_and(|t| RESULT_TOKENS.contains(&t))
    }

    /// A copy extended by one half-move.
    pub fn extended(
        &self,
        san: &str,
        capture: Option<char>,
        promotion: Option<char>,
        result: Option<&str>,
    ) -> MoveSet {
        let mut moves = self.moves.clone();
        if !moves.is_empty() {
            moves.push(' ');
        }
        moves.push_str(san);
        if let Some(result) = result {
            moves.push(' ');
            moves.push_str(result);
        }
        let mut captures = self.captures.clone();
        captures.extend(capture);
        let mut promotions = self.promotions.clone();
        promotions.extend(promotion);
        MoveSet { moves, captures, promotions }
    }
}

/// A reachable position with every retained history that produced it.
#[derive(Debug, Clone)]
pub struct Position {
    pub board: Board,
    /// Whether future-entry lookahead can still prune this line.
    pub check_future: bool,
    pub move_sets: Vec<MoveSet>,
}

impl Position {
    /// Appends histories up to the cook cap (`max_cooks_to_keep + 1`, so the
    /// host can report "at least").
    pub fn absorb(&mut self, move_sets: Vec<MoveSet>, cap: usize) {
        for ms in move_sets {
            if self.move_sets.len() > cap {
                break;
            }
            self.move_sets.push(ms);
        }
    }
}

/// The frontier after some number of consumed marks, keyed by position key.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    pub map: HashMap<String, Position>,
}

impl Frontier {
    pub fn start(board: Board) -> Self {
        let mut map = HashMap::new();
        map.insert(
            board.key(),
            Position {
                board,
                check_future: true,
                move_sets: vec![MoveSet::start()],
            },
        );
        Frontier { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn sorted_keys(&self) -> Vec<&String> {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        keys
    }

    /// Merges another frontier in (used when chunked runs re-join).
    pub fn merge(&mut self, other: Frontier, cap: usize) {
        for (key, position) in other.map {
            match self.map.entry(key) {
                std::collections::hash_map::Entry::Occupied(mut e) => {
                    e.get_mut().absorb(position.move_sets, cap);
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(position);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moveset_extension() {
        let start = MoveSet::start();
        let after = start.extended("e4", None, None, None);
        let after = after.extended("e5", None, None, None);
        assert_eq!(after.moves, "e4 e5");
        assert_eq!(after.san_count(), 2);
        assert!(!after.is_finished());

        let mated = after.extended("Qh4#", None, None, Some("0-1"));
        assert_eq!(mated.moves, "e4 e5 Qh4# 0-1");
        assert_eq!(mated.san_count(), 3);
        assert!(mated.is_finished());

        let capture = after.extended("exd5", Some('p'), None, None);
        assert_eq!(capture.captures, "p");
    }

    #[test]
    fn test_cook_cap() {
        let board = crate::board::Board::from_start(&crate::config::StartPosition::Standard).unwrap();
        let mut frontier = Frontier::start(board);
        let key = frontier.sorted_keys()[0].clone();
        let position = frontier.map.get_mut(&key).unwrap();

        let extra: Vec<MoveSet> = (0..10).map(|_| MoveSet::start()).collect();
        position.absorb(extra, 2);
        // One original plus at most cap + 1 total.
        assert!(position.move_sets.len() <= 3);
    }
}
