//! Template evaluation: compiled nodes + data context → text.
//!
//! Evaluation is a pure, infallible tree walk. Everything that could go
//! wrong degrades instead of failing: a missing path substitutes empty
//! text, an unknown filter is identity, a loop over a non-list produces
//! nothing. The node tree is never mutated, so one compiled [`Template`]
//! can serve concurrent evaluations against different contexts.

use super::compile::{Template, TemplateNode, VarPath};
use super::filters::FilterRegistry;
use super::value::{Context, Value};

/// Evaluate a compiled template against a context with the given filter
/// registry.
///
/// # Examples
///
/// ```
/// use markspan::template::{compile, evaluate, Context, FilterRegistry, Value};
///
/// let template = compile("Hello {name}!").unwrap();
/// let mut context = Context::new();
/// context.insert("name".into(), Value::from("World"));
/// let filters = FilterRegistry::default();
/// assert_eq!(evaluate(&template, &context, &filters), "Hello World!");
/// ```
pub fn evaluate(template: &Template, context: &Context, filters: &FilterRegistry) -> String {
    let mut out = String::new();
    eval_nodes(template.nodes(), context, filters, &mut out);
    out
}

impl Template {
    /// Evaluate with the built-in filter set.
    pub fn render(&self, context: &Context) -> String {
        evaluate(self, context, &FilterRegistry::default())
    }
}

fn eval_nodes(nodes: &[TemplateNode], vars: &Context, filters: &FilterRegistry, out: &mut String) {
    for node in nodes {
        match node {
            TemplateNode::Literal(text) => out.push_str(text),
            TemplateNode::Variable {
                path,
                filters: calls,
            } => {
                // Missing paths flow through the filter chain as empty
                // text, so `default`-style filters still see them
                let value = resolve(vars, path)
                    .cloned()
                    .unwrap_or_else(|| Value::Str(String::new()));
                let value = calls.iter().fold(value, |v, call| {
                    filters.apply(&call.name, v, call.arg.as_deref())
                });
                out.push_str(&value.to_string());
            }
            TemplateNode::Conditional {
                path,
                negated,
                body,
            } => {
                let truthy = resolve(vars, path).is_some_and(Value::is_truthy);
                if truthy != *negated {
                    eval_nodes(body, vars, filters, out);
                }
            }
            TemplateNode::Loop { path, body } => {
                let Some(Value::List(items)) = resolve(vars, path) else {
                    // Looping over anything but a list yields nothing
                    continue;
                };
                let len = items.len();
                for (index, item) in items.iter().enumerate() {
                    let scope = loop_scope(vars, item, index, len);
                    eval_nodes(body, &scope, filters, out);
                }
            }
        }
    }
}

/// Child scope for one loop iteration: the parent context plus `.`,
/// `index`, `first`, `last`, and — when the item is a mapping — the
/// item's own fields, which shadow everything else.
fn loop_scope(parent: &Context, item: &Value, index: usize, len: usize) -> Context {
    let mut scope = parent.clone();
    scope.insert(".".to_string(), item.clone());
    scope.insert("index".to_string(), Value::Int(index as i64));
    scope.insert("first".to_string(), Value::Bool(index == 0));
    scope.insert("last".to_string(), Value::Bool(index + 1 == len));
    if let Value::Map(fields) = item {
        for (key, value) in fields {
            scope.insert(key.clone(), value.clone());
        }
    }
    scope
}

fn resolve<'a>(vars: &'a Context, path: &VarPath) -> Option<&'a Value> {
    match path {
        VarPath::SelfRef => vars.get("."),
        VarPath::Fields(segments) => {
            let mut current = vars.get(segments[0].as_str())?;
            for segment in &segments[1..] {
                current = current.as_map()?.get(segment.as_str())?;
            }
            Some(current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::compile::compile;
    use super::*;
    use std::collections::BTreeMap;

    fn context(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn render(template: &str, ctx: &Context) -> String {
        compile(template).unwrap().render(ctx)
    }

    #[test]
    fn test_simple_substitution() {
        let ctx = context(&[("name", Value::from("World"))]);
        assert_eq!(render("Hello {name}!", &ctx), "Hello World!");
    }

    #[test]
    fn test_nested_path() {
        let ctx = context(&[(
            "user",
            map(&[
                ("name", Value::from("John Doe")),
                ("email", Value::from("john@example.com")),
            ]),
        )]);
        assert_eq!(
            render("User: {user.name}, Email: {user.email}", &ctx),
            "User: John Doe, Email: john@example.com"
        );
    }

    #[test]
    fn test_missing_path_is_empty() {
        let ctx = context(&[("name", Value::from("John"))]);
        assert_eq!(
            render("Hello {name}! Your email: {email}.", &ctx),
            "Hello John! Your email: ."
        );
    }

    #[test]
    fn test_filters_apply_in_order() {
        let ctx = context(&[("name", Value::from("  john  "))]);
        assert_eq!(render("{name|strip|upper}", &ctx), "JOHN");
    }

    #[test]
    fn test_missing_path_reaches_default_filter() {
        let ctx = Context::new();
        assert_eq!(render("{missing|default:N/A}", &ctx), "N/A");
    }

    #[test]
    fn test_conditional_true_and_false() {
        let template = "{?has_image}Image: {image}{/has_image}{?!has_image}No image{/has_image}";
        let with = context(&[
            ("has_image", Value::Bool(true)),
            ("image", Value::from("photo.jpg")),
        ]);
        assert_eq!(render(template, &with), "Image: photo.jpg");

        let without = context(&[("has_image", Value::Bool(false))]);
        assert_eq!(render(template, &without), "No image");
    }

    #[test]
    fn test_numeric_zero_is_truthy() {
        // Presence gates the block, not magnitude
        let ctx = context(&[("count", Value::Int(0))]);
        assert_eq!(render("{?count}yes{/count}", &ctx), "yes");
    }

    #[test]
    fn test_absent_key_is_falsy() {
        let ctx = Context::new();
        assert_eq!(render("{?ghost}yes{/ghost}", &ctx), "");
        assert_eq!(render("{?!ghost}no{/ghost}", &ctx), "no");
    }

    #[test]
    fn test_empty_string_and_list_are_falsy() {
        let ctx = context(&[
            ("s", Value::from("")),
            ("l", Value::List(vec![])),
        ]);
        assert_eq!(render("{?s}S{/s}{?l}L{/l}", &ctx), "");
    }

    #[test]
    fn test_loop_over_scalars() {
        let ctx = context(&[("tags", Value::from(vec!["a", "b"]))]);
        assert_eq!(render("{#tags}#{.} {/tags}", &ctx), "#a #b ");
    }

    #[test]
    fn test_loop_over_mappings_binds_fields() {
        let ctx = context(&[(
            "users",
            Value::List(vec![
                map(&[("name", Value::from("Alice")), ("age", Value::Int(30))]),
                map(&[("name", Value::from("Bob")), ("age", Value::Int(25))]),
            ]),
        )]);
        assert_eq!(
            render("{#users}Name: {name}, Age: {age}\n{/users}", &ctx),
            "Name: Alice, Age: 30\nName: Bob, Age: 25\n"
        );
    }

    #[test]
    fn test_loop_iteration_variables() {
        let ctx = context(&[("xs", Value::from(vec!["a", "b", "c"]))]);
        assert_eq!(
            render("{#xs}{index}:{.}{?!last}, {/last}{/xs}", &ctx),
            "0:a, 1:b, 2:c"
        );
    }

    #[test]
    fn test_loop_over_non_list_is_empty() {
        let ctx = context(&[("thing", Value::from("scalar"))]);
        assert_eq!(render("{#thing}x{/thing}", &ctx), "");
        assert_eq!(render("{#missing}x{/missing}", &ctx), "");
    }

    #[test]
    fn test_nested_loop_shadows_self_reference() {
        let ctx = context(&[(
            "outer",
            Value::List(vec![map(&[(
                "inner",
                Value::from(vec!["x", "y"]),
            )])]),
        )]);
        assert_eq!(render("{#outer}{#inner}{.}{/inner}{/outer}", &ctx), "xy");
    }

    #[test]
    fn test_conditional_inside_loop_sees_item_fields() {
        let ctx = context(&[(
            "posts",
            Value::List(vec![
                map(&[("title", Value::from("A")), ("pinned", Value::Bool(true))]),
                map(&[("title", Value::from("B")), ("pinned", Value::Bool(false))]),
            ]),
        )]);
        assert_eq!(
            render("{#posts}{?pinned}[{title}]{/pinned}{/posts}", &ctx),
            "[A]"
        );
    }

    #[test]
    fn test_non_scalar_leaf_uses_canonical_form() {
        let ctx = context(&[("tags", Value::from(vec!["a", "b"]))]);
        assert_eq!(render("{tags}", &ctx), "a, b");
    }

    #[test]
    fn test_evaluation_does_not_mutate_template() {
        let template = compile("{#xs}{.}{/xs}").unwrap();
        let before = template.clone();
        let ctx = context(&[("xs", Value::from(vec!["1"]))]);
        template.render(&ctx);
        assert_eq!(template, before);
    }
}
