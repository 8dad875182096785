//! Static steno rejection: stenos that cannot be satisfied by any legal game
//! fail before the search starts.

use steno_core::{MarkEntry, StenoError, Vocabulary};

/// Half-move indices (0-based) before which certain marks are impossible
/// from the standard starting position.
const EARLIEST_MATE: usize = 3;
const EARLIEST_SHORT_CASTLE: usize = 6;
const EARLIEST_ANY_CASTLE: usize = 8;
const EARLIEST_FORCED_DRAW: usize = 17;

pub fn validate(
    entries: &[MarkEntry],
    vocab: Vocabulary,
    standard_start: bool,
) -> Result<(), StenoError> {
    let last = entries.len().saturating_sub(1);
    let mut castles = [0usize; 2];
    let mut promotions = [0usize; 2];
    let mut en_passants = [0usize; 2];
    let mut captures = [0usize; 2];

    for entry in entries {
        let i = entry.index;
        let side = i % 2;
        for (negated, mark) in entry.user_atoms() {
            if negated {
                continue;
            }
            if vocab.is_endgame_mark(mark) && i < last {
                return fail(entry, mark, "endgame mark before the final half-move");
            }
            if vocab.castle_mark(mark).is_some() {
                castles[side] += 1;
            }
            if vocab.promotion_mark(mark).is_some() {
                promotions[side] += 1;
                if i < 8 {
                    return fail(entry, mark, "promotion within the first eight half-moves");
                }
            }
            if mark == '%' {
                en_passants[side] += 1;
                if i < 4 {
                    return fail(entry, mark, "en passant within the first four half-moves");
                }
            }
            if mark == 'x' {
                captures[side] += 1;
            }
            if i < 2 {
                if mark == 'x' || mark == '+' {
                    return fail(entry, mark, "capture or check on the first two half-moves");
                }
                if vocab == Vocabulary::Extended && Vocabulary::is_early_direction_mark(mark, i) {
                    return fail(entry, mark, "impossible direction on the first two half-moves");
                }
            }
            if standard_start {
                if mark == '#' && i < EARLIEST_MATE {
                    return fail(entry, mark, "mate before Black's second move");
                }
                if let Some(castle) = vocab.castle_mark(mark) {
                    let earliest = match (castle, vocab) {
                        (steno_core::CastleMark::Short, _) => EARLIEST_SHORT_CASTLE,
                        (_, Vocabulary::Pgn) => EARLIEST_SHORT_CASTLE,
                        _ => EARLIEST_ANY_CASTLE,
                    };
                    // `Either` can only be the short castle inside the short
                    // window, so the short bound applies to it too.
                    let earliest = if castle == steno_core::CastleMark::Either {
                        EARLIEST_SHORT_CASTLE
                    } else {
                        earliest
                    };
                    if i < earliest {
                        return fail(entry, mark, "castling too early");
                    }
                }
                if vocab.is_forced_draw_mark(mark) && i < EARLIEST_FORCED_DRAW {
                    return fail(entry, mark, "forced draw before Black's ninth move");
                }
            }
        }
    }

    for side in 0..2 {
        let colour = if side == 0 { "White" } else { "Black" };
        if castles[side] > 1 {
            return Err(StenoError::invalid(colour, "more than one castling mark"));
        }
        if promotions[side] > 8 {
            return Err(StenoError::invalid(colour, "more than eight promotion marks"));
        }
        if en_passants[side] > 8 {
            return Err(StenoError::invalid(colour, "more than eight en-passant marks"));
        }
        if captures[side] > 15 {
            return Err(StenoError::invalid(colour, "more than fifteen capture marks"));
        }
    }

    Ok(())
}

fn fail(entry: &MarkEntry, mark: char, reason: &str) -> Result<(), StenoError> {
    Err(StenoError::invalid(
        format!("`{mark}` at half-move {}", entry.index + 1),
        reason,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use steno_core::parse;

    fn check(steno: &str, vocab: Vocabulary) -> Result<(), StenoError> {
        let parsed = parse(steno, vocab).unwrap();
        validate(&parsed.entries, vocab, true)
    }

    #[test]
    fn test_endgame_mark_must_be_last() {
        assert!(check("~~~#", Vocabulary::Classic).is_ok());
        assert!(check("~~~#~", Vocabulary::Classic).is_err());
    }

    #[test]
    fn test_early_mate_window() {
        assert!(check("~~#", Vocabulary::Classic).is_err());
        assert!(check("~~~#", Vocabulary::Classic).is_ok());
    }

    #[test]
    fn test_early_capture_check_direction() {
        assert!(check("x~", Vocabulary::Classic).is_err());
        assert!(check("~+", Vocabulary::Classic).is_err());
        assert!(check("~~x", Vocabulary::Classic).is_ok());
        // Down-board on White's first move and up-board on Black's first.
        assert!(check("v~", Vocabulary::Extended).is_err());
        assert!(check("~^", Vocabulary::Extended).is_err());
        assert!(check("^~", Vocabulary::Extended).is_ok());
    }

    #[test]
    fn test_castling_windows() {
        // Index 6 is the earliest short castle; queen-side needs index 8.
        assert!(check("~~~~~o", Vocabulary::Classic).is_err());
        assert!(check("~~~~~~o", Vocabulary::Classic).is_ok());
        assert!(check("~~~~~~O", Vocabulary::Classic).is_err());
        assert!(check("~~~~~~~~O", Vocabulary::Classic).is_ok());
        // PGN `O` means either side and gets the short window.
        assert!(check("~~~~~~O", Vocabulary::Pgn).is_ok());
        assert!(check("~~~~~O", Vocabulary::Pgn).is_err());
    }

    #[test]
    fn test_promotion_and_en_passant_windows() {
        assert!(check("~~~~~~~q", Vocabulary::Classic).is_err());
        assert!(check("~~~~~~~~q", Vocabulary::Classic).is_ok());
        assert!(check("~~~%", Vocabulary::Classic).is_err());
        assert!(check("~~~~%", Vocabulary::Classic).is_ok());
    }

    #[test]
    fn test_per_colour_counts() {
        // Two castle marks for White.
        let parsed = parse("~~~~~~o~o", Vocabulary::Classic);
        // `o` appears at indices 6 and 8, both White.
        let parsed = parsed.unwrap();
        assert!(validate(&parsed.entries, Vocabulary::Classic, true).is_err());

        // Sixteen capture marks for one colour overflow.
        let mut steno = String::from("~~");
        for _ in 0..16 {
            steno.push_str("x~");
        }
        let parsed = parse(&steno, Vocabulary::Classic).unwrap();
        assert!(validate(&parsed.entries, Vocabulary::Classic, true).is_err());
    }

    #[test]
    fn test_negated_marks_do_not_count() {
        // `!#` mid-steno is fine; a bare `#` is not.
        let parsed = parse("~~~&!#~", Vocabulary::Classic).unwrap();
        assert!(validate(&parsed.entries, Vocabulary::Classic, true).is_ok());
    }

    #[test]
    fn test_forced_draw_window() {
        // `=` at index 16 is too early; index 17 clears the window.
        let steno = format!("{}=", "~".repeat(16));
        assert!(check(&steno, Vocabulary::Classic).is_err());
        let steno = format!("{}=", "~".repeat(17));
        assert!(check(&steno, Vocabulary::Classic).is_ok());
    }
}
