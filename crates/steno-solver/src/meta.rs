//! Meta-marks and meta-conditions: constraints implied by future marks.
//!
//! Three rules run once before the search (no premature game end, promotion
//! prerequisites, castling support); extinction recovery runs after every
//! entry once the frontier shows which pieces are gone. All injection is
//! idempotent through the rendered-text guards on `MarkEntry`.

use steno_core::{CastleMark, CondAtom, CondGroup, MarkEntry, PartialSquare, Vocabulary};

use crate::frontier::Frontier;

pub fn synthesise(entries: &mut [MarkEntry], vocab: Vocabulary, standard_start: bool) {
    no_premature_end(entries, vocab, standard_start);
    promotion_prerequisites(entries, vocab);
    castling_support(entries, vocab, standard_start);
}

/// Rule 1: between the opening moves and the final entry the game must not
/// already be over.
fn no_premature_end(entries: &mut [MarkEntry], vocab: Vocabulary, standard_start: bool) {
    if !standard_start {
        return;
    }
    let last = entries.len().saturating_sub(1);
    for entry in entries.iter_mut() {
        if entry.index >= 2 && entry.index < last {
            entry.push_meta_mark("!#");
            if entry.index > 17 {
                entry.push_meta_mark(&format!("!{}", vocab.forced_draw_char()));
            }
        }
    }
}

/// Rule 2: a promotion mark needs the promoting side's pawn far enough up
/// the board on each of the four preceding move pairs, unless the required
/// piece already exists by promotion.
fn promotion_prerequisites(entries: &mut [MarkEntry], vocab: Vocabulary) {
    let demands: Vec<(usize, bool, String)> = entries
        .iter()
        .filter_map(|entry| {
            let mut targets = String::new();
            for (negated, mark) in entry.user_atoms() {
                if negated {
                    continue;
                }
                match vocab.promotion_mark(mark) {
                    Some(Some(role)) => targets.push(role),
                    Some(None) => targets = "NBRQ".to_string(),
                    None => {}
                }
            }
            if targets.is_empty() {
                None
            } else {
                Some((entry.index, entry.is_white(), targets))
            }
        })
        .collect();

    for (index, white, targets) in demands {
        let targets = if white { targets } else { targets.to_lowercase() };
        pawn_advance_schedule(entries, index, white, &targets, 0);
    }
}

/// The `[colourBase >= (8 - turn) | =P]` ladder behind a promotion point.
/// Entries below `min_index` are already consumed and skipped.
fn pawn_advance_schedule(
    entries: &mut [MarkEntry],
    index: usize,
    white: bool,
    targets: &str,
    min_index: usize,
) {
    for turn in 1..=4usize {
        let Some(base) = index.checked_sub(2 * turn) else {
            break;
        };
        let pawn_atom = if white {
            CondAtom::WhitePawnAtLeast(7 - turn as u8)
        } else {
            CondAtom::BlackPawnAtMost(turn as u8)
        };
        let group = CondGroup {
            any: vec![
                vec![pawn_atom],
                vec![CondAtom::PromotedAll(targets.to_string())],
            ],
        };
        for j in [base, base + 1] {
            if j >= min_index && j < index {
                entries[j].push_meta_condition(group.clone());
            }
        }
    }
}

/// Rule 3: a castling mark pins down the whole earlier game of that colour.
fn castling_support(entries: &mut [MarkEntry], vocab: Vocabulary, standard_start: bool) {
    let castles: Vec<(usize, bool, Option<bool>)> = entries
        .iter()
        .flat_map(|entry| {
            let index = entry.index;
            let white = entry.is_white();
            entry
                .user_atoms()
                .filter(|(negated, _)| !negated)
                .filter_map(|(_, mark)| vocab.castle_mark(mark))
                .map(move |castle| {
                    let side = match castle {
                        CastleMark::Short => Some(true),
                        CastleMark::Long => Some(false),
                        // An either-side mark is provably king-side only while
                        // queen-side castling is still impossible.
                        CastleMark::Either if standard_start && index < 8 => Some(true),
                        CastleMark::Either => None,
                    };
                    (index, white, side)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    for (index, white, side) in castles {
        for entry in entries[..index].iter_mut() {
            if entry.is_white() == white {
                entry.push_meta_mark("!K");
            }
        }
        if index >= 1 {
            entries[index - 1].push_meta_mark("!+");
        }

        let Some(short) = side else { continue };
        let back = if white { 0u8 } else { 7u8 };
        let rook_char = if white { 'R' } else { 'r' };
        let rook_file = if short { 7u8 } else { 0u8 };
        let rook_home = CondGroup::single(CondAtom::PieceAt(rook_char, square(rook_file, back)));
        for entry in entries[..index].iter_mut() {
            entry.push_meta_condition(rook_home.clone());
        }

        let between: &[u8] = if short { &[5, 6] } else { &[1, 2, 3] };
        if index >= 1 {
            for &file in between {
                entries[index - 1]
                    .push_meta_condition(CondGroup::single(CondAtom::Empty(square(file, back))));
            }
        }
        if standard_start && index >= 2 {
            for &file in between {
                let group = if !short && file == 1 {
                    // The b-square may still hold an enemy knight or bishop:
                    // it has one opponent move left to vacate.
                    let knight = if white { 'n' } else { 'N' };
                    let bishop = if white { 'l' } else { 'D' };
                    CondGroup::any_of(vec![
                        CondAtom::Empty(square(1, back)),
                        CondAtom::PieceAt(knight, square(1, back)),
                        CondAtom::PieceAt(bishop, square(1, back)),
                    ])
                } else {
                    CondGroup::single(CondAtom::Empty(square(file, back)))
                };
                entries[index - 2].push_meta_condition(group);
            }
        }
    }
}

/// Rule 4, run after each consumed entry: if every live position has lost a
/// piece type a future mark still needs, demand the promotion that recreates
/// it, early enough to land in time. One piece type per step.
pub fn extinction_forecast(
    entries: &mut [MarkEntry],
    next_index: usize,
    frontier: &Frontier,
    vocab: Vocabulary,
) {
    const RECREATABLE: [char; 4] = ['Q', 'R', 'B', 'N'];
    for white in [true, false] {
        for role in RECREATABLE {
            let fen_char = if white { role } else { role.to_ascii_lowercase() };
            let extinct = frontier.map.keys().all(|key| {
                !key.split_whitespace().next().unwrap_or("").contains(fen_char)
            });
            if !extinct {
                continue;
            }
            let Some(entry_index) = entries
                .iter()
                .find(|e| {
                    e.index >= next_index
                        && e.is_white() == white
                        && e.has_positive_user_mark(|c| vocab.piece_letter(c) == Some(role))
                })
                .map(|e| e.index)
            else {
                continue;
            };
            // In PGN the mark itself can be the promotion; elsewhere the
            // piece must exist by the colour's previous move.
            let target = if vocab == Vocabulary::Pgn {
                entry_index
            } else {
                entry_index.saturating_sub(2).max(next_index)
            };
            let targets = fen_char.to_string();
            entries[target].push_meta_condition(CondGroup::single(CondAtom::PromotedAll(
                targets.clone(),
            )));
            pawn_advance_schedule(entries, target, white, &targets, next_index);
            return;
        }
    }
}

fn square(file: u8, rank: u8) -> PartialSquare {
    PartialSquare {
        file: Some(file),
        rank: Some(rank),
    }
}
