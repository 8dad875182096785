//! Mark matching: does a candidate move satisfy a mark expression?
//!
//! The expression is a conjunction scanned atom by atom; `&` is a separator
//! and `!` inverts the atom after it. Atoms that need the post-move board
//! (`+`, `#` and the forced-draw marks) are deferred to a second phase so a
//! move is only applied once it has passed everything else.

use shakmaty::{Move, Role};
use steno_core::{CastleMark, MarkEntry, Vocabulary};

use crate::board::{
    castle_side, is_capture, is_en_passant, move_dest, move_origin, move_role, promotion_role,
    Board, EndgameKind,
};
use crate::frontier::MoveSet;

pub struct MatchContext<'a> {
    pub board: &'a Board,
    pub entry: &'a MarkEntry,
    pub vocab: Vocabulary,
}

/// Outcome of the pre-move phase.
pub struct PreMatch {
    /// Which parent histories witness the `"` mark; `None` when the mark is
    /// absent and every history survives.
    pub witness: Option<Vec<bool>>,
    /// Whether `match_post` still has atoms to confirm.
    pub needs_post: bool,
}

/// Phase one: every atom that can be decided on the pre-move board.
/// Returns `None` when the move is rejected.
pub fn match_pre(ctx: &MatchContext, m: &Move, move_sets: &[MoveSet]) -> Option<PreMatch> {
    let disambig = if ctx.vocab == Vocabulary::Pgn {
        ctx.board.san_disambiguation(m)
    } else {
        (None, None)
    };
    let mut witness: Option<Vec<bool>> = None;
    let mut needs_post = false;

    for (negated, mark) in ctx.entry.all_atoms() {
        if is_post_atom(ctx.vocab, mark) {
            needs_post = true;
            continue;
        }
        if mark == '"' {
            let flags = witness.get_or_insert_with(|| vec![true; move_sets.len()]);
            let mut any = false;
            for (i, ms) in move_sets.iter().enumerate() {
                let witnessed = from_previous_destination(ctx, ms, m);
                flags[i] &= witnessed != negated;
                any |= flags[i];
            }
            if !any {
                return None;
            }
            continue;
        }
        if eval_atom(ctx, m, mark, disambig) == negated {
            return None;
        }
    }

    Some(PreMatch { witness, needs_post })
}

/// Phase two: the post-move atoms, against the board after the move.
pub fn match_post(ctx: &MatchContext, m: &Move, after: &Board) -> bool {
    for (negated, mark) in ctx.entry.all_atoms() {
        if !is_post_atom(ctx.vocab, mark) {
            continue;
        }
        let holds = match mark {
            '+' => after.is_check() && promotion_role(m).is_none(),
            '#' => after.is_checkmate() && promotion_role(m).is_none(),
            // The dialect's forced-draw mark: the game just ended without
            // check, by stalemate or insufficient material.
            _ => {
                !after.is_check()
                    && matches!(
                        after.endgame(),
                        Some(EndgameKind::Stalemate) | Some(EndgameKind::InsufficientMaterial)
                    )
            }
        };
        if holds == negated {
            return false;
        }
    }
    true
}

fn is_post_atom(vocab: Vocabulary, mark: char) -> bool {
    mark == '+' || mark == '#' || vocab.is_forced_draw_mark(mark)
}

fn eval_atom(ctx: &MatchContext, m: &Move, mark: char, disambig: (Option<u32>, Option<u32>)) -> bool {
    let vocab = ctx.vocab;
    let castling = castle_side(m);

    if vocab.is_any_mark(mark) {
        return true;
    }
    if let Some(required) = vocab.castle_mark(mark) {
        return match required {
            CastleMark::Short => castling == Some(true),
            CastleMark::Long => castling == Some(false),
            CastleMark::Either => castling.is_some(),
        };
    }
    if Vocabulary::is_file(mark) {
        let file = mark as u32 - 'a' as u32;
        if castling.is_some() {
            // PGN castles match only through `O`/`-`.
            return vocab != Vocabulary::Pgn && move_dest(m).file() as u32 == file;
        }
        return move_dest(m).file() as u32 == file
            || (vocab == Vocabulary::Pgn && disambig.0 == Some(file));
    }
    if Vocabulary::is_rank(mark) {
        let rank = mark as u32 - '1' as u32;
        if castling.is_some() {
            return vocab != Vocabulary::Pgn && move_dest(m).rank() as u32 == rank;
        }
        return move_dest(m).rank() as u32 == rank
            || (vocab == Vocabulary::Pgn && disambig.1 == Some(rank));
    }
    if let Some(role_letter) = vocab.piece_letter(mark) {
        if role_char(move_role(m)) == role_letter {
            return true;
        }
        // In PGN a piece letter also names the promotion target.
        return vocab == Vocabulary::Pgn
            && promotion_role(m).map(role_char) == Some(role_letter);
    }
    if let Some(target) = vocab.promotion_mark(mark) {
        return match target {
            Some(letter) => promotion_role(m).map(role_char) == Some(letter),
            None => promotion_role(m).is_some(),
        };
    }
    match mark {
        'x' => is_capture(m),
        '%' => is_en_passant(m),
        '-' => !is_capture(m), // Extended non-capture; PGN `-` is a castle mark
        '|' | '_' | '/' | '\\' | '<' | '>' | '^' | 'v' => {
            let Some(origin) = move_origin(m) else {
                return false;
            };
            let dest = move_dest(m);
            let df = dest.file() as i32 - origin.file() as i32;
            let dr = dest.rank() as i32 - origin.rank() as i32;
            match mark {
                '|' => df == 0,
                '_' => dr == 0,
                '/' => df == dr && df != 0,
                '\\' => df == -dr && df != 0,
                '<' => df < 0,
                '>' => df > 0,
                '^' => dr > 0,
                _ => dr < 0,
            }
        }
        _ => false,
    }
}

/// The `"` mark: the move starts where this player's previous move ended.
fn from_previous_destination(ctx: &MatchContext, ms: &MoveSet, m: &Move) -> bool {
    let index = ctx.entry.index;
    if index < 2 {
        return false;
    }
    let Some(previous) = ms.tokens().nth(index - 2) else {
        return false;
    };
    let mover_white = index % 2 == 0;
    let Some((file, rank)) = san_destination(previous, mover_white) else {
        return false;
    };
    let Some(origin) = move_origin(m) else {
        return false;
    };
    origin.file() as u32 == file && origin.rank() as u32 == rank
}

/// The destination square encoded in a SAN token; castling resolves to the
/// king's landing square on the mover's back rank.
pub fn san_destination(token: &str, mover_white: bool) -> Option<(u32, u32)> {
    let token = token.trim_end_matches(['+', '#']);
    let back = if mover_white { 0 } else { 7 };
    if token == "O-O-O" {
        return Some((2, back));
    }
    if token == "O-O" {
        return Some((6, back));
    }
    let token = match token.find('=') {
        Some(at) => &token[..at],
        None => token,
    };
    let bytes = token.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (file, rank) = (bytes[bytes.len() - 2], bytes[bytes.len() - 1]);
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    Some(((file - b'a') as u32, (rank - b'1') as u32))
}

fn role_char(role: Role) -> char {
    match role {
        Role::Pawn => 'P',
        Role::Knight => 'N',
        Role::Bishop => 'B',
        Role::Rook => 'R',
        Role::Queen => 'Q',
        Role::King => 'K',
    }
}

/// Does the entry demand a forced draw (sets the recheck obligation)?
pub fn demands_draw(entry: &MarkEntry, vocab: Vocabulary) -> bool {
    entry
        .all_atoms()
        .any(|(neg, c)| !neg && vocab.is_forced_draw_mark(c))
}
