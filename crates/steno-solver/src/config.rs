//! Solver configuration.

use std::path::PathBuf;

use steno_core::Vocabulary;

use crate::error::SolveError;

/// Upper bound shared by the numeric limits; also the `MAX` sentinel.
pub const LIMIT_CEILING: u64 = 2_000_000_000;

/// Where the game starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    /// A Chess960 back rank, e.g. `RKRNNQBB`; pawns and castling rights are
    /// the standard ones.
    Chess960 { back_rank: String },
    /// An explicit FEN (first 3-6 fields; the rest default).
    Fen(String),
}

impl StartPosition {
    pub fn parse(text: &str) -> Result<Self, SolveError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(StartPosition::Standard);
        }
        if text.len() == 8 && text.chars().all(|c| c.is_ascii_alphabetic()) {
            let back_rank = text.to_ascii_uppercase();
            let mut sorted: Vec<char> = back_rank.chars().collect();
            sorted.sort_unstable();
            if sorted.iter().collect::<String>() != "BBKNNQRR" {
                return Err(SolveError::InvalidFen(format!(
                    "back rank `{text}` must be a BBKNNQRR arrangement"
                )));
            }
            let start = StartPosition::Chess960 { back_rank };
            crate::board::Board::from_start(&start)?;
            return Ok(start);
        }

        let fields: Vec<&str> = text.split_whitespace().collect();
        if !(3..=6).contains(&fields.len()) {
            return Err(SolveError::InvalidFen(format!(
                "`{text}`: expected 3 to 6 FEN fields"
            )));
        }
        let defaults = ["-", "0", "1"];
        let mut fen = fields.join(" ");
        for default in &defaults[fields.len() - 3..] {
            fen.push(' ');
            fen.push_str(default);
        }
        let start = StartPosition::Fen(fen);
        crate::board::Board::from_start(&start)?;
        Ok(start)
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, StartPosition::Standard)
    }

    pub fn is_chess960(&self) -> bool {
        matches!(self, StartPosition::Chess960 { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub vocabulary: Vocabulary,
    pub max_positions_to_examine: u64,
    pub max_cooks_to_keep: usize,
    pub max_solver_tasks: usize,
    /// How many solutions `Success` lists; 0 lists none, 1 is rejected.
    pub max_solutions_to_list: usize,
    pub display_positions: bool,
    pub show_meta_marks: bool,
    pub allow_chunking: bool,
    pub start: StartPosition,
    pub output_file: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            vocabulary: Vocabulary::Classic,
            max_positions_to_examine: 10_000_000,
            max_cooks_to_keep: 4,
            max_solver_tasks: num_cpus::get(),
            max_solutions_to_list: 10,
            display_positions: false,
            show_meta_marks: false,
            allow_chunking: true,
            start: StartPosition::Standard,
            output_file: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(1..=LIMIT_CEILING).contains(&self.max_positions_to_examine) {
            return Err(SolveError::InvalidLimit(format!(
                "max positions {} out of range",
                self.max_positions_to_examine
            )));
        }
        if !(1..=LIMIT_CEILING as usize).contains(&self.max_cooks_to_keep) {
            return Err(SolveError::InvalidLimit(format!(
                "max cooks {} out of range",
                self.max_cooks_to_keep
            )));
        }
        if self.max_solver_tasks == 0 {
            return Err(SolveError::InvalidLimit("solver tasks must be positive".into()));
        }
        if self.max_solutions_to_list == 1 {
            return Err(SolveError::InvalidLimit(
                "solutions to list must be 0 or more than 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parses a decimal limit with an optional `K`/`M`/`B` suffix; `MAX` is the
/// upper bound.
pub fn parse_limit(text: &str) -> Result<u64, SolveError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("max") {
        return Ok(LIMIT_CEILING);
    }
    let (digits, multiplier) = match text.chars().last() {
        Some('K') | Some('k') => (&text[..text.len() - 1], 1_000),
        Some('M') | Some('m') => (&text[..text.len() - 1], 1_000_000),
        Some('B') | Some('b') => (&text[..text.len() - 1], 1_000_000_000),
        _ => (text, 1),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| SolveError::InvalidLimit(format!("`{text}` is not a number")))?;
    let value = value
        .checked_mul(multiplier)
        .ok_or_else(|| SolveError::InvalidLimit(format!("`{text}` overflows")))?;
    if !(1..=LIMIT_CEILING).contains(&value) {
        return Err(SolveError::InvalidLimit(format!("`{text}` out of range")));
    }
    Ok(value)
}

/// Parses a vocabulary code, mapping failures to the configuration error.
pub fn parse_vocabulary(text: &str) -> Result<Vocabulary, SolveError> {
    Vocabulary::from_code(text).ok_or_else(|| SolveError::InvalidVocabulary(text.to_string()))
}
