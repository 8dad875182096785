//! Bracketed-condition evaluation against the post-move board and the
//! per-history capture/promotion multisets.

use shakmaty::Move;
use steno_core::{CondAtom, CondGroup};

use crate::board::{move_origin, Board};
use crate::frontier::MoveSet;

pub struct CondInput<'a> {
    /// Board after the candidate move.
    pub after: &'a Board,
    pub m: &'a Move,
    /// The capture character of this move, if it captured.
    pub capture: Option<char>,
}

/// Evaluates every group; history-sensitive atoms filter the MoveSet list.
/// The move is rejected when a group leaves no surviving history.
pub fn eval_conditions(
    groups: &[&CondGroup],
    input: &CondInput,
    move_sets: &mut Vec<MoveSet>,
) -> bool {
    for group in groups {
        move_sets.retain(|ms| group_holds(group, input, ms));
        if move_sets.is_empty() {
            return false;
        }
    }
    true
}

fn group_holds(group: &CondGroup, input: &CondInput, ms: &MoveSet) -> bool {
    group
        .any
        .iter()
        .any(|alternative| alternative.iter().all(|atom| atom_holds(atom, input, ms)))
}

fn atom_holds(atom: &CondAtom, input: &CondInput, ms: &MoveSet) -> bool {
    match atom {
        CondAtom::CapturedNow(piece) => match input.capture {
            // The colour is implicit in a bare capture condition.
            Some(actual) => piece_class_matches(
                piece.to_ascii_uppercase(),
                actual.to_ascii_uppercase(),
            ),
            None => false,
        },
        CondAtom::CapturedAll(pieces) => multiset_contains(&ms.captures, pieces),
        CondAtom::PromotedAll(pieces) => {
            if pieces.is_empty() {
                !ms.promotions.is_empty()
            } else {
                multiset_contains(&ms.promotions, pieces)
            }
        }
        CondAtom::WhitePawnAtLeast(rank) => {
            let rank = *rank as u32;
            input.after.pawn_on_rank(true, |r| r >= rank)
        }
        CondAtom::BlackPawnAtMost(rank) => {
            let rank = *rank as u32;
            input.after.pawn_on_rank(false, |r| r <= rank)
        }
        CondAtom::Empty(at) => at
            .squares()
            .iter()
            .all(|&(f, r)| input.after.piece_at(f as u32, r as u32).is_none()),
        CondAtom::PieceAt(piece, at) => at.squares().iter().any(|&(f, r)| {
            input
                .after
                .piece_at(f as u32, r as u32)
                .is_some_and(|(actual, _)| piece_class_matches(*piece, actual))
        }),
        CondAtom::OriginWas(at) => move_origin(input.m)
            .is_some_and(|sq| at.covers(sq.file() as u8, sq.rank() as u8)),
    }
}

/// `B`/`b` match either bishop shade; everything else is exact.
fn piece_class_matches(cond: char, actual: char) -> bool {
    match cond {
        'B' => matches!(actual, 'B' | 'L' | 'D'),
        'b' => matches!(actual, 'b' | 'l' | 'd'),
        _ => cond == actual,
    }
}

/// Multiset containment of `needles` in `hay`, with the bishop letters
/// acting as a shade hierarchy.
fn multiset_contains(hay: &str, needles: &str) -> bool {
    let count = |s: &str, ch: char| s.chars().filter(|&x| x == ch).count();
    let mut seen = Vec::new();
    for needle in needles.chars() {
        if seen.contains(&needle) {
            continue;
        }
        seen.push(needle);
        let need = count(needles, needle);
        let have = match needle {
            'B' => count(hay, 'L') + count(hay, 'D'),
            'b' => count(hay, 'l') + count(hay, 'd'),
            other => count(hay, other),
        };
        if have < need {
            return false;
        }
    }
    // Shade-specific and generic bishop demands share one pool per colour.
    if count(needles, 'B') + count(needles, 'L') + count(needles, 'D')
        > count(hay, 'L') + count(hay, 'D')
    {
        return false;
    }
    if count(needles, 'b') + count(needles, 'l') + count(needles, 'd')
        > count(hay, 'l') + count(hay, 'd')
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::move_dest;
    use crate::config::StartPosition;
    use steno_core::CondGroup;

    fn setup() -> (Board, Board, Move) {
        let board = Board::from_start(&StartPosition::Standard).unwrap();
        let moves = board.legal_moves();
        let e4 = moves
            .iter()
            .find(|m| move_dest(m).to_string() == "e4")
            .unwrap()
            .clone();
        let after = board.make(&e4).unwrap();
        (board, after, e4)
    }

    fn eval_one(text: &str, input: &CondInput, ms: MoveSet) -> bool {
        let group = CondGroup::parse(text).unwrap();
        let mut sets = vec![ms];
        eval_conditions(&[&group], input, &mut sets)
    }

    #[test]
    fn test_board_atoms() {
        let (_, after, e4) = setup();
        let input = CondInput { after: &after, m: &e4, capture: None };
        let ms = MoveSet::start();

        assert!(eval_one("^4", &input, ms.clone()));
        assert!(!eval_one("^5", &input, ms.clone()));
        // Black's pawns have not advanced at all yet.
        assert!(!eval_one("v2", &input, ms.clone()));
        assert!(eval_one("v7", &input, ms.clone()));
        assert!(eval_one("-e2", &input, ms.clone()));
        assert!(!eval_one("-e", &input, ms.clone()));
        assert!(eval_one("-5", &input, ms.clone()));
        assert!(eval_one("Pe4", &input, ms.clone()));
        assert!(eval_one("Pe", &input, ms.clone()));
        assert!(!eval_one("pe4", &input, ms.clone()));
        assert!(eval_one("@e2", &input, ms.clone()));
        assert!(eval_one("@e", &input, ms.clone()));
        assert!(!eval_one("@d2", &input, ms));
    }

    #[test]
    fn test_alternatives_and_conjunctions() {
        let (_, after, e4) = setup();
        let input = CondInput { after: &after, m: &e4, capture: None };
        let ms = MoveSet::start();

        assert!(eval_one("^5|Pe4", &input, ms.clone()));
        assert!(eval_one("Pe4&-e2", &input, ms.clone()));
        assert!(!eval_one("Pe4&^5", &input, ms));
    }

    #[test]
    fn test_history_atoms_filter_movesets() {
        let (_, after, e4) = setup();
        let input = CondInput { after: &after, m: &e4, capture: Some('p') };

        let with_capture = MoveSet {
            moves: String::new(),
            captures: "pn".to_string(),
            promotions: "Q".to_string(),
        };
        let without = MoveSet::start();

        let group = CondGroup::parse("Xpn").unwrap();
        let mut sets = vec![with_capture.clone(), without.clone()];
        assert!(eval_conditions(&[&group], &input, &mut sets));
        assert_eq!(sets.len(), 1);

        let group = CondGroup::parse("=Q").unwrap();
        let mut sets = vec![with_capture, without];
        assert!(eval_conditions(&[&group], &input, &mut sets));
        assert_eq!(sets.len(), 1);

        // Empty promotion list means "any promotion happened".
        let group = CondGroup::parse("=").unwrap();
        let mut sets = vec![MoveSet::start()];
        assert!(!eval_conditions(&[&group], &input, &mut sets));
    }

    #[test]
    fn test_captured_now_ignores_case() {
        let (_, after, e4) = setup();
        let input = CondInput { after: &after, m: &e4, capture: Some('q') };
        assert!(eval_one("xq", &input, MoveSet::start()));
        assert!(eval_one("xQ", &input, MoveSet::start()));
        assert!(!eval_one("xn", &input, MoveSet::start()));
    }

    #[test]
    fn test_bishop_shades() {
        let hay = "Ld";
        assert!(multiset_contains(hay, "B"));
        assert!(multiset_contains(hay, "L"));
        assert!(!multiset_contains(hay, "D"));
        assert!(multiset_contains(hay, "d"));
        assert!(multiset_contains(hay, "b"));
        assert!(multiset_contains("LD", "BB"));
        // The generic demand falls back to the other shade.
        assert!(multiset_contains("LD", "BL"));
        assert!(!multiset_contains("LL", "BD"));
        assert!(!multiset_contains("LD", "BBL"));
    }
}
