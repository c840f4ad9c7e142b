//! Markdown ↔ entity conversion.
//!
//! This module is the formatting engine's core: markdown-flavored source
//! in, plain text plus offset-addressed entities out, and the inverse for
//! editing and round-trip use. The design separates three pure concerns:
//!
//! - [`parse`]: markdown source → [`FormattedText`] (total, never fails)
//! - [`render`]: [`FormattedText`] → markdown source (validates its input)
//! - [`escape`]: delimiter escaping shared by the renderer and the
//!   `escape_md` template filter
//!
//! ## Design Notes
//!
//! - **Code-unit addressing**: entity offsets count UTF-16 code units of
//!   the *stripped* output text, never source positions; all width
//!   arithmetic goes through [`crate::offset`].
//! - **Masking**: Code and Pre spans are consumed before any delimiter
//!   matching, so their contents are never reinterpreted as markup.
//! - **Graceful degradation**: unmatched or ambiguous delimiters become
//!   literal text. Only the inverse direction can fail, and only because
//!   its entity input arrives from outside the parser.
//! - **Dialect as a value**: the spoiler / custom-emoji / mention link
//!   forms and the nesting depth limit live in [`ParserConfig`], passed
//!   per call; there is no process-wide parser state.
//!
//! [`FormattedText`]: crate::entity::FormattedText

mod escape;
mod normalize;
mod parse;
mod render;

pub use escape::escape_markdown;
pub use normalize::normalize_markdown;
pub use parse::{ParserConfig, parse, parse_with};
pub use render::render;
