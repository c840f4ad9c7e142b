//! The high-level formatting pipeline.
//!
//! Ties the two engines together the way a publishing caller uses them:
//! template source and data in, plain text plus entities out. Each step
//! is also available on its own ([`template`], [`markdown`]) for callers
//! that need to interpose — e.g. compiling a template once and rendering
//! it against many contexts before parsing.
//!
//! [`template`]: crate::template
//! [`markdown`]: crate::markdown

use crate::entity::FormattedText;
use crate::error::Result;
use crate::markdown::{ParserConfig, normalize_markdown, parse_with};
use crate::template::{Context, FilterRegistry, compile, evaluate};

/// Render a template against a context and parse the result: compile →
/// evaluate → normalize → parse.
///
/// Fails only on template syntax errors; malformed content degrades
/// inside the pipeline.
///
/// # Examples
///
/// ```
/// use markspan::{Context, EntityKind, Value, format_message};
///
/// let mut context = Context::new();
/// context.insert("title".into(), Value::from("launch day"));
///
/// let message = format_message("**{title|upper}**", &context).unwrap();
/// assert_eq!(message.text, "LAUNCH DAY");
/// assert_eq!(message.entities[0].kind, EntityKind::Bold);
/// ```
pub fn format_message(template_source: &str, context: &Context) -> Result<FormattedText> {
    format_message_with(
        template_source,
        context,
        &FilterRegistry::default(),
        &ParserConfig::default(),
    )
}

/// [`format_message`] with an explicit filter registry and parser
/// dialect.
pub fn format_message_with(
    template_source: &str,
    context: &Context,
    filters: &FilterRegistry,
    parser: &ParserConfig,
) -> Result<FormattedText> {
    let template = compile(template_source)?;
    let markdown = evaluate(&template, context, filters);
    Ok(parse_with(&normalize_markdown(&markdown), parser))
}

/// Normalize and parse markdown without templating.
pub fn format_markdown(source: &str) -> FormattedText {
    parse_with(
        &normalize_markdown(source),
        &ParserConfig::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind};
    use crate::template::Value;

    #[test]
    fn test_template_to_entities() {
        let mut context = Context::new();
        context.insert("name".into(), Value::from("World"));
        let message = format_message("Hello **{name}**!", &context).unwrap();
        assert_eq!(message.text, "Hello World!");
        assert_eq!(
            message.entities,
            vec![Entity::new(EntityKind::Bold, 6, 5)]
        );
    }

    #[test]
    fn test_substituted_content_is_not_markup_when_escaped() {
        let mut context = Context::new();
        context.insert("user_input".into(), Value::from("*pwned*"));
        let message = format_message("safe: {user_input|escape_md}", &context).unwrap();
        assert_eq!(message.text, "safe: *pwned*");
        assert!(message.entities.is_empty());
    }

    #[test]
    fn test_substituted_content_is_markup_when_unescaped() {
        let mut context = Context::new();
        context.insert("user_input".into(), Value::from("*pwned*"));
        let message = format_message("{user_input}", &context).unwrap();
        assert_eq!(message.text, "pwned");
        assert_eq!(
            message.entities,
            vec![Entity::new(EntityKind::Italic, 0, 5)]
        );
    }

    #[test]
    fn test_normalization_collapses_model_noise() {
        let mut context = Context::new();
        context.insert("t".into(), Value::from("x"));
        let message = format_message("***{t}***\n\n\n\ntail", &context).unwrap();
        assert_eq!(message.text, "x\n\ntail");
        assert_eq!(message.entities, vec![Entity::new(EntityKind::Bold, 0, 1)]);
    }

    #[test]
    fn test_template_error_propagates() {
        let context = Context::new();
        assert!(format_message("{?open}never closed", &context).is_err());
    }

    #[test]
    fn test_format_markdown_trims() {
        let message = format_markdown("  **b**  ");
        assert_eq!(message.text, "b");
        assert_eq!(message.entities, vec![Entity::new(EntityKind::Bold, 0, 1)]);
    }
}
