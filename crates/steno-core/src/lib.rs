//! Steno-Chess mark language: vocabularies, mark/condition expressions,
//! and the steno parser.
//!
//! A steno is a string of one-character marks, one per half-move, optionally
//! decorated with `&`/`!` conjunctions, bracketed post-move conditions, a
//! chunk directive, and a single `$` checkpoint marker. This crate turns the
//! raw text into an ordered list of [`entry::MarkEntry`] values; the solver
//! crate drives the search over them.

pub mod conditions;
pub mod entry;
pub mod error;
pub mod parser;
pub mod vocabulary;

pub use conditions::{CondAtom, CondGroup, PartialSquare};
pub use entry::MarkEntry;
pub use error::StenoError;
pub use parser::{parse, ParsedSteno, CHUNK_SIZE};
pub use vocabulary::{CastleMark, Vocabulary};
