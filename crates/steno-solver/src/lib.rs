//! The Steno-Chess solver: a breadth-first, concurrent search over every
//! legal game matching a steno, mark by mark.
//!
//! Pipeline: `steno-core` parses the mark stream; [`validator`] rejects
//! impossible stenos; [`meta`] injects constraints implied by future marks;
//! [`engine`] expands the position frontier entry by entry with
//! [`matcher`]/[`eval`] deciding each candidate move; [`checkpoint`]
//! serialises the frontier for resumable, chunked solving. The chess rules
//! themselves live behind the [`board`] adapter (shakmaty).

pub mod board;
pub mod cancel;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod frontier;
pub mod lookahead;
pub mod matcher;
pub mod message;
pub mod meta;
pub mod validator;

pub use cancel::CancelToken;
pub use steno_core::Vocabulary;
pub use config::{parse_limit, parse_vocabulary, SolverConfig, StartPosition};
pub use engine::{solve_once, SolveOutcome, SolvedPosition, Solver};
pub use error::SolveError;
pub use message::{CollectingSink, Message, MessageSink, NullSink, TracingSink};
