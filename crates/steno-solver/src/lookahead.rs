//! Cheap future-entry probes: a position whose FEN can no longer satisfy a
//! remaining castling or pawn mark is dropped without expanding it.
//!
//! Further probes (mating material for `#`, exact pawn counts for `%`) stay
//! conservatively true.

use steno_core::{CastleMark, MarkEntry, Vocabulary};

/// What the remaining entries still require, per colour (`[white, black]`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FutureNeeds {
    pub castle_short: [bool; 2],
    pub castle_long: [bool; 2],
    pub castle_any: [bool; 2],
    pub pawn: [bool; 2],
}

impl FutureNeeds {
    /// Is there anything left that lookahead could prune on?
    pub fn any(&self) -> bool {
        *self != FutureNeeds::default()
    }

    fn absorb_entry(&mut self, entry: &MarkEntry, vocab: Vocabulary) {
        let side = entry.index % 2;
        for (negated, mark) in entry.user_atoms() {
            if negated {
                continue;
            }
            match vocab.castle_mark(mark) {
                Some(CastleMark::Short) => self.castle_short[side] = true,
                Some(CastleMark::Long) => self.castle_long[side] = true,
                Some(CastleMark::Either) => self.castle_any[side] = true,
                None => {}
            }
            if vocab.requires_pawn(mark) {
                self.pawn[side] = true;
            }
        }
    }
}

/// Suffix table: `needs[i]` is what entries `i..` still require, so the
/// successors produced by entry `i` consult `needs[i + 1]`.
pub fn future_needs(entries: &[MarkEntry], vocab: Vocabulary) -> Vec<FutureNeeds> {
    let mut table = vec![FutureNeeds::default(); entries.len() + 1];
    for i in (0..entries.len()).rev() {
        let mut needs = table[i + 1];
        needs.absorb_entry(&entries[i], vocab);
        table[i] = needs;
    }
    table
}

/// Can a position key still satisfy the remaining requirements?
pub fn fen_could_solve(key: &str, needs: &FutureNeeds) -> bool {
    let mut fields = key.split_whitespace();
    let placement = fields.next().unwrap_or("");
    let _turn = fields.next();
    let castling = fields.next().unwrap_or("-");

    // Side-specific checks only make sense for the standard right letters;
    // Chess960 rook-file letters stay conservative.
    let standard_letters = castling.chars().all(|c| "KQkq-".contains(c));

    for side in 0..2 {
        let white = side == 0;
        let has_any_right = castling
            .chars()
            .any(|c| c.is_ascii_uppercase() == white && c != '-');
        let wants_castle =
            needs.castle_short[side] || needs.castle_long[side] || needs.castle_any[side];
        if wants_castle && !has_any_right {
            return false;
        }
        if standard_letters {
            if needs.castle_short[side] && !castling.contains(if white { 'K' } else { 'k' }) {
                return false;
            }
            if needs.castle_long[side] && !castling.contains(if white { 'Q' } else { 'q' }) {
                return false;
            }
        }
        if needs.pawn[side] && !placement.contains(if white { 'P' } else { 'p' }) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use steno_core::parse;

    #[test]
    fn test_suffix_table() {
        let parsed = parse("~~~~~~o~P", Vocabulary::Classic).unwrap();
        let table = future_needs(&parsed.entries, Vocabulary::Classic);
        // Before anything is consumed, White still needs a short castle and
        // a pawn move.
        assert!(table[0].castle_short[0]);
        assert!(table[0].pawn[0]);
        // After the castle at index 6, only the pawn need remains.
        assert!(!table[7].castle_short[0]);
        assert!(table[7].pawn[0]);
        assert!(!table[9].any());
    }

    #[test]
    fn test_castling_rights_prune() {
        let mut needs = FutureNeeds::default();
        needs.castle_short[0] = true;

        assert!(fen_could_solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            &needs
        ));
        // White lost the king-side right.
        assert!(!fen_could_solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Qkq -",
            &needs
        ));
        // Black's rights are irrelevant to a White need.
        assert!(fen_could_solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w K -",
            &needs
        ));

        let mut needs = FutureNeeds::default();
        needs.castle_any[1] = true;
        assert!(!fen_could_solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQ -",
            &needs
        ));
    }

    #[test]
    fn test_pawn_prune() {
        let mut needs = FutureNeeds::default();
        needs.pawn[1] = true;
        assert!(!fen_could_solve("4k3/8/8/8/8/8/4P3/4K3 w - -", &needs));
        needs.pawn[1] = false;
        needs.pawn[0] = true;
        assert!(fen_could_solve("4k3/8/8/8/8/8/4P3/4K3 w - -", &needs));
    }
}
