//! Solver error types

use steno_core::StenoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error(transparent)]
    InvalidSteno(#[from] StenoError),

    #[error("invalid checkpoint chunk: {0}")]
    InvalidCheckpointChunk(String),

    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    #[error("position limit reached after {examined} positions")]
    PositionLimitReached { examined: u64 },

    #[error("solve aborted by user")]
    UserAborted,
}

impl SolveError {
    /// Position-limit exhaustion and user cancellation surface as `Abort`
    /// messages; everything else is an `Error`.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            SolveError::PositionLimitReached { .. } | SolveError::UserAborted
        )
    }
}
