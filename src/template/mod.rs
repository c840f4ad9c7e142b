//! Template compilation and rendering.
//!
//! A small templating grammar for message bodies: `{name}` substitution
//! with dotted paths and pipe-chained filters, `{?name}…{/name}`
//! conditionals (negatable as `{?!name}`), and `{#name}…{/name}` loops
//! with `{.}` as the current item. Compilation and evaluation are split
//! so a template compiles once and renders many times:
//!
//! - [`compile`]: source → [`Template`] node tree ([`TemplateSyntaxError`]
//!   on structural mistakes)
//! - [`evaluate`]: node tree + [`Context`] + [`FilterRegistry`] → text
//!
//! The evaluator's output is markdown source, fed to
//! [`crate::markdown::parse`] by the pipeline in [`crate::format`]; both
//! layers share [`escape_markdown`] so substituted user content cannot
//! inject formatting.
//!
//! [`escape_markdown`]: crate::markdown::escape_markdown
//! [`TemplateSyntaxError`]: crate::error::TemplateSyntaxError

mod compile;
mod eval;
mod filters;
mod value;

pub use compile::{
    CompileOptions, FilterCall, Template, TemplateNode, VarPath, compile, compile_with,
};
pub use eval::evaluate;
pub use filters::{FilterFn, FilterRegistry};
pub use value::{Context, Value};
