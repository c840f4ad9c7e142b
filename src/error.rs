//! Error types for markspan operations.
//!
//! The error surface is deliberately narrow: template *syntax* problems and
//! malformed entity *sets* are surfaced to the caller, everything else
//! degrades gracefully inside total functions (see the crate docs).

use thiserror::Error;

/// Errors raised when compiling template source.
///
/// These always indicate an authoring mistake in the template itself,
/// never in the data it is rendered against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateSyntaxError {
    /// A conditional or loop block was opened but never closed.
    #[error("unterminated block: {{{0}}} has no matching close tag")]
    UnterminatedBlock(String),

    /// A close tag names a different block than the nearest open tag.
    #[error("mismatched close tag: expected {{/{expected}}}, found {{/{found}}}")]
    MismatchedCloseTag { expected: String, found: String },

    /// A filter expression could not be parsed (empty name, empty or
    /// unterminated argument).
    #[error("malformed filter expression: {0:?}")]
    MalformedFilter(String),

    /// Blocks nest deeper than the configured limit.
    #[error("block nesting exceeds depth limit of {0}")]
    NestingTooDeep(usize),
}

/// Errors raised when an externally supplied entity set cannot be laid
/// over its text buffer.
///
/// The parser never produces these; they guard the inverse direction,
/// where entities arrive from outside (renderer input, wire decoding).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEntitySetError {
    /// An entity extends past the end of the text buffer.
    #[error("entity range {offset}+{length} exceeds text length {text_len} (code units)")]
    OutOfBounds {
        offset: u32,
        length: u32,
        text_len: u32,
    },

    /// An entity boundary falls between the two code units of a non-BMP
    /// scalar value, so it has no character position.
    #[error("entity boundary at code unit {offset} splits a surrogate pair")]
    Misaligned { offset: u32 },

    /// Two entities overlap without either containing the other.
    #[error("entities partially overlap: {a_offset}+{a_length} vs {b_offset}+{b_length}")]
    PartialOverlap {
        a_offset: u32,
        a_length: u32,
        b_offset: u32,
        b_length: u32,
    },
}

/// Errors that can occur during template compilation or entity rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("template syntax error: {0}")]
    Template(#[from] TemplateSyntaxError),

    #[error("malformed entity set: {0}")]
    EntitySet(#[from] MalformedEntitySetError),
}

pub type Result<T> = std::result::Result<T, Error>;
