//! Mark-language error type

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StenoError {
    /// The steno text is malformed or violates a static rule. `context`
    /// points at the offending substring or names the half-move.
    #[error("invalid steno at `{context}`: {reason}")]
    InvalidSteno { context: String, reason: String },
}

impl StenoError {
    pub fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        StenoError::InvalidSteno {
            context: context.into(),
            reason: reason.into(),
        }
    }
}
