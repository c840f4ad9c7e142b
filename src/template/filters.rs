//! The filter registry: named, pure text transforms.
//!
//! Filters are a capability value injected into the evaluator, not a
//! process-wide table: callers extend a registry with [`register`] and
//! pass it to [`evaluate`]. Application is total — an unknown filter name
//! is an identity transform, and a filter that cannot apply to its input
//! (an unparseable date, a non-numeric truncate width) logs a warning and
//! returns the value unchanged rather than failing the render.
//!
//! [`register`]: FilterRegistry::register
//! [`evaluate`]: super::evaluate

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::value::Value;
use crate::markdown::escape_markdown;

/// A pure filter: value in, value out, with an optional textual argument
/// from the template (`{name|filter:arg}`).
pub type FilterFn = Arc<dyn Fn(&Value, Option<&str>) -> Value + Send + Sync>;

/// Mapping from filter name to transform.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl Default for FilterRegistry {
    /// The built-in filter set.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("upper", |v, _| Value::Str(v.to_string().to_uppercase()));
        registry.register("lower", |v, _| Value::Str(v.to_string().to_lowercase()));
        registry.register("title", |v, _| Value::Str(title_case(&v.to_string())));
        registry.register("capitalize", |v, _| Value::Str(capitalize(&v.to_string())));
        registry.register("strip", |v, _| Value::Str(v.to_string().trim().to_string()));
        registry.register("truncate", truncate);
        registry.register("date", date);
        registry.register("default", |v, arg| {
            if v.is_truthy() {
                v.clone()
            } else {
                Value::Str(arg.unwrap_or_default().to_string())
            }
        });
        registry.register("escape_md", |v, _| {
            Value::Str(escape_markdown(&v.to_string()))
        });
        registry
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

impl FilterRegistry {
    /// A registry with no filters at all (every name is identity).
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Add or replace a filter under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(&Value, Option<&str>) -> Value + Send + Sync + 'static,
    ) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    /// Apply the named filter to `value`. Unknown names are identity.
    pub fn apply(&self, name: &str, value: Value, arg: Option<&str>) -> Value {
        match self.filters.get(name) {
            Some(filter) => filter(&value, arg),
            None => {
                debug!(filter = name, "unknown filter, passing value through");
                value
            }
        }
    }
}

/// Python-style title case: uppercase every letter that follows a
/// non-letter, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    result
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Cut to N scalar values, appending `...` only when something was cut.
fn truncate(value: &Value, arg: Option<&str>) -> Value {
    let limit = match arg {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                warn!(arg = raw, "truncate: width is not a number, skipping");
                return value.clone();
            }
        },
        None => 50,
    };
    let text = value.to_string();
    let mut end = text.len();
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == limit {
            end = i;
            break;
        }
        count += 1;
    }
    if count < limit || end == text.len() {
        Value::Str(text)
    } else {
        Value::Str(format!("{}...", &text[..end]))
    }
}

/// Format a date-like value with a strftime-style format string.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM:SS`, and bare `YYYY-MM-DD`. An empty value renders
/// empty; an unparseable one passes through unchanged.
fn date(value: &Value, arg: Option<&str>) -> Value {
    let text = value.to_string();
    if text.is_empty() {
        return Value::Str(String::new());
    }
    let Some(dt) = parse_datetime(&text) else {
        warn!(value = %text, "date: unparseable value, skipping");
        return value.clone();
    };
    let fmt = arg.unwrap_or("%Y-%m-%d");
    let mut formatted = String::new();
    // An invalid format specifier surfaces as a fmt error; degrade
    // rather than panic through Display
    if write!(formatted, "{}", dt.format(fmt)).is_err() {
        warn!(format = fmt, "date: invalid format string, skipping");
        return value.clone();
    }
    Value::Str(formatted)
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, value: impl Into<Value>, arg: Option<&str>) -> String {
        FilterRegistry::default()
            .apply(name, value.into(), arg)
            .to_string()
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(apply("upper", "john doe", None), "JOHN DOE");
        assert_eq!(apply("lower", "JOHN@EXAMPLE.COM", None), "john@example.com");
        assert_eq!(apply("title", "hello wide world", None), "Hello Wide World");
        assert_eq!(apply("capitalize", "hELLO", None), "Hello");
    }

    #[test]
    fn test_title_restarts_after_punctuation() {
        assert_eq!(apply("title", "a-b c", None), "A-B C");
    }

    #[test]
    fn test_strip() {
        assert_eq!(apply("strip", "  padded  ", None), "padded");
    }

    #[test]
    fn test_truncate_cuts_and_marks() {
        assert_eq!(
            apply("truncate", "This is a very long text", Some("10")),
            "This is a ..."
        );
    }

    #[test]
    fn test_truncate_no_mark_when_short() {
        assert_eq!(apply("truncate", "short", Some("10")), "short");
        // Exactly at the limit: nothing was cut
        assert_eq!(apply("truncate", "abcde", Some("5")), "abcde");
    }

    #[test]
    fn test_truncate_counts_scalar_values() {
        assert_eq!(apply("truncate", "😀😀😀", Some("2")), "😀😀...");
    }

    #[test]
    fn test_truncate_bad_width_is_identity() {
        assert_eq!(apply("truncate", "text", Some("wide")), "text");
    }

    #[test]
    fn test_date_default_format() {
        assert_eq!(apply("date", "2026-08-06T16:26:51Z", None), "2026-08-06");
    }

    #[test]
    fn test_date_custom_format() {
        assert_eq!(
            apply("date", "2026-08-06", Some("%d.%m.%Y")),
            "06.08.2026"
        );
    }

    #[test]
    fn test_date_unparseable_is_identity() {
        assert_eq!(apply("date", "not a date", None), "not a date");
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(apply("default", "", Some("N/A")), "N/A");
        assert_eq!(apply("default", "set", Some("N/A")), "set");
    }

    #[test]
    fn test_escape_md_exact_set() {
        assert_eq!(
            apply("escape_md", "Hello *world* with _markdown_", None),
            "Hello \\*world\\* with \\_markdown\\_"
        );
        // Characters outside the delimiter set are untouched
        assert_eq!(apply("escape_md", "(a) #b!", None), "(a) #b!");
    }

    #[test]
    fn test_escape_md_idempotent_visible_text() {
        use crate::markdown::parse;
        let once = apply("escape_md", "*x* [y] \\z", None);
        let twice = FilterRegistry::default()
            .apply("escape_md", Value::Str(once.clone()), None)
            .to_string();
        // Same visible text after parsing, modulo literal backslashes
        let strip = |s: &str| s.replace('\\', "");
        assert_eq!(strip(&parse(&once).text), strip(&parse(&twice).text));
        // And neither produces any formatting
        assert!(parse(&once).entities.is_empty());
        assert!(parse(&twice).entities.is_empty());
    }

    #[test]
    fn test_unknown_filter_is_identity() {
        assert_eq!(apply("frobnicate", "x", None), "x");
    }

    #[test]
    fn test_custom_filter_registration() {
        let mut registry = FilterRegistry::default();
        registry.register("reverse", |v, _| {
            Value::Str(v.to_string().chars().rev().collect())
        });
        assert_eq!(
            registry.apply("reverse", Value::from("abc"), None).to_string(),
            "cba"
        );
    }
}
