//! Cross-cutting solver laws.

use std::sync::Arc;

use steno_core::MarkEntry;
use steno_solver::board::Board;
use steno_solver::frontier::MoveSet;
use steno_solver::matcher::{match_pre, MatchContext};
use steno_solver::message::CollectingSink;
use steno_solver::{Solver, SolverConfig, Vocabulary};

fn run(vocab: Vocabulary, steno: &str, tweak: impl FnOnce(&mut SolverConfig)) -> steno_solver::SolveOutcome {
    let mut config = SolverConfig {
        vocabulary: vocab,
        max_solver_tasks: 2,
        ..SolverConfig::default()
    };
    tweak(&mut config);
    let solver = Solver::new(config, Arc::new(CollectingSink::new())).expect("solver");
    solver.solve(steno).expect("solve")
}

fn accepted(board: &Board, marks: &str, vocab: Vocabulary, index: usize) -> Vec<String> {
    let entry = MarkEntry::new(index, marks.to_string());
    let ctx = MatchContext { board, entry: &entry, vocab };
    let history = [MoveSet::start()];
    let mut out = Vec::new();
    for m in board.legal_moves() {
        if match_pre(&ctx, &m, &history).is_some() {
            let after = board.make(&m).expect("legal move");
            out.push(board.san_with_suffix(&m, &after));
        }
    }
    out.sort();
    out
}

/// Law 1: after entry `i` every history holds exactly `i + 1` SAN tokens.
#[test]
fn history_lengths_match_consumed_marks() {
    let outcome = run(Vocabulary::Classic, "NgN", |_| {});
    assert!(!outcome.positions.is_empty());
    for position in &outcome.positions {
        for ms in &position.move_sets {
            assert_eq!(ms.san_count(), 3, "line {}", ms.moves);
        }
    }
}

/// Law 2: every frontier key round-trips through the board service.
#[test]
fn keys_roundtrip_through_fen() {
    let outcome = run(Vocabulary::Classic, "ee", |_| {});
    assert!(!outcome.positions.is_empty());
    for position in &outcome.positions {
        let board = Board::from_key(&position.key, 2, false).expect("key parses");
        assert_eq!(board.key(), position.key);
    }
}

/// Law 4: a mark and its negation partition the legal moves.
#[test]
fn polarity_partitions_legal_moves() {
    let board = Board::from_key(
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        2,
        false,
    )
    .expect("board");
    let total = board.legal_moves().len();
    for mark in ['e', 'x', 'N', 'P', '4'] {
        let with = accepted(&board, &mark.to_string(), Vocabulary::Classic, 2).len();
        let without = accepted(&board, &format!("~!{mark}"), Vocabulary::Classic, 2).len();
        assert_eq!(with + without, total, "mark {mark}");
    }
}

/// Law 5: conjunction order is irrelevant.
#[test]
fn conjunction_is_commutative() {
    let board = Board::from_key(
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        2,
        false,
    )
    .expect("board");
    assert_eq!(
        accepted(&board, "P&x", Vocabulary::Classic, 2),
        accepted(&board, "x&P", Vocabulary::Classic, 2)
    );
    assert_eq!(
        accepted(&board, "N&!c", Vocabulary::Classic, 2),
        accepted(&board, "!c&N", Vocabulary::Classic, 2)
    );
}

/// Law 6: Classic short+long castling marks cover exactly what the PGN (and
/// Extended either-side) castle marks accept.
#[test]
fn castle_dialects_agree() {
    let board = Board::from_key("r3k2r/8/8/8/8/8/8/R3K2R w KQkq -", 8, false).expect("board");
    let mut classic: Vec<String> = accepted(&board, "o", Vocabulary::Classic, 8);
    classic.extend(accepted(&board, "O", Vocabulary::Classic, 8));
    classic.sort();
    let pgn = accepted(&board, "O", Vocabulary::Pgn, 8);
    let extended = accepted(&board, "0", Vocabulary::Extended, 8);
    assert_eq!(classic, pgn);
    assert_eq!(classic, extended);
}

/// Law 8: the cook cap bounds histories per position at cap + 1.
///
/// Four knight half-moves can return both knights home, so the starting
/// position key collects 16 distinct move orders.
#[test]
fn cook_cap_bounds_histories() {
    let start_key = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";

    let outcome = run(Vocabulary::Classic, "NNNN", |c| c.max_cooks_to_keep = 1);
    for position in &outcome.positions {
        assert!(position.move_sets.len() <= 2, "cap exceeded at {}", position.key);
    }

    // With the cap at 4, the start key keeps exactly cap + 1 of its 16
    // cooks so the host can report "at least".
    let outcome = run(Vocabulary::Classic, "NNNN", |c| c.max_cooks_to_keep = 4);
    let home = outcome
        .positions
        .iter()
        .find(|p| p.key == start_key)
        .expect("both knights can go home");
    assert_eq!(home.move_sets.len(), 5);

    let outcome = run(Vocabulary::Classic, "NNNN", |c| c.max_cooks_to_keep = 100);
    let home = outcome
        .positions
        .iter()
        .find(|p| p.key == start_key)
        .expect("both knights can go home");
    assert_eq!(home.move_sets.len(), 16);
}
