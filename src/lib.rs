//! # markspan
//!
//! A pure formatting engine for messaging protocols that address text in
//! UTF-16 code units: markdown-flavored markup in, plain text plus
//! offset-addressed entity spans out — and back again.
//!
//! ## Features
//!
//! - Parse markdown to `(text, entities)` with exact UTF-16 code-unit
//!   offsets (non-BMP scalars count as two units)
//! - Render entities back to markdown for editing and round-trip use
//! - Compile-once/render-many templates with variables, filters,
//!   conditionals, and loops whose output feeds the parser directly
//! - Total by design: malformed markup and content degrade to literal
//!   text; only template syntax errors and malformed external entity
//!   sets surface as errors
//!
//! ## Quick Start
//!
//! ```
//! use markspan::{Context, Value, format_message};
//!
//! let mut context = Context::new();
//! context.insert("title".into(), Value::from("Release 0.2"));
//! context.insert("tags".into(), Value::from(vec!["rust", "parsing"]));
//!
//! let message = format_message(
//!     "**{title|upper}**\n\n{#tags}#{.} {/tags}",
//!     &context,
//! ).unwrap();
//!
//! assert_eq!(message.text, "RELEASE 0.2\n\n#rust #parsing");
//! assert_eq!(message.entities[0].length, 11); // Bold over the title
//! ```
//!
//! ## Working with the pieces
//!
//! The pipeline stages are independently useful:
//!
//! ```
//! use markspan::markdown::{parse, render};
//! use markspan::template::{compile, Context, FilterRegistry, Value, evaluate};
//!
//! // Compile once, evaluate many times (the template is Send + Sync)
//! let template = compile("Hi {name}!").unwrap();
//! let filters = FilterRegistry::default();
//! let mut context = Context::new();
//! context.insert("name".into(), Value::from("Ada"));
//! let markdown = evaluate(&template, &context, &filters);
//!
//! // Markdown round-trips through the entity model
//! let message = parse(&markdown);
//! let source = render(&message).unwrap();
//! assert_eq!(parse(&source), message);
//! ```

pub mod entity;
pub mod error;
pub mod format;
pub mod markdown;
pub mod offset;
pub mod template;

pub use entity::{Entity, EntityKind, FormattedText};
pub use error::{Error, MalformedEntitySetError, Result, TemplateSyntaxError};
pub use format::{format_markdown, format_message, format_message_with};
pub use markdown::{ParserConfig, escape_markdown, normalize_markdown};
pub use offset::{CodeUnitOffset, Utf16Index, utf16_len};
pub use template::{Context, FilterRegistry, Template, Value};
