//! Entities → markdown source (the inverse of [`parse`]).
//!
//! Rendering walks the canonical entity list outermost-first: at a shared
//! start offset the widest span opens first, matching the parser's
//! laminar-set assumption, and nested entities are rendered before the
//! outer delimiter closes. Literal text gaps are escaped so the output
//! survives a re-parse; Code and Pre contents are emitted raw because the
//! parser masks them anyway.
//!
//! Unlike parsing, rendering can fail: the entity set arrives from
//! outside (an editor, the wire) and may not fit the buffer. Bounds,
//! surrogate alignment, and the laminar invariant are checked up front
//! and reported as [`MalformedEntitySetError`] — silently dropping a bad
//! span would corrupt visible formatting without warning.
//!
//! [`parse`]: super::parse()

use percent_encoding::{AsciiSet, utf8_percent_encode};

use super::escape::escape_markdown;
use crate::entity::{Entity, EntityKind, FormattedText, canonical_sort, check_laminar};
use crate::error::MalformedEntitySetError;
use crate::offset::Utf16Index;

/// Parentheses would terminate the link target early, so they travel
/// percent-encoded. Exactly this set and nothing more: the parser
/// decodes only `%28`/`%29`, so encoding anything else would not survive
/// a round trip.
const LINK_TARGET: &AsciiSet = &AsciiSet::EMPTY.add(b'(').add(b')');

/// Serialize a [`FormattedText`] back to markdown source.
///
/// Satisfies the round-trip law: `parse(render(ft))` is equivalent to
/// `ft` in canonical form for any value the parser could have produced.
///
/// # Examples
///
/// ```
/// use markspan::markdown::{parse, render};
///
/// let ft = parse("a **b** c");
/// assert_eq!(render(&ft).unwrap(), "a **b** c");
/// ```
pub fn render(ft: &FormattedText) -> Result<String, MalformedEntitySetError> {
    let mut entities: Vec<Entity> = ft
        .entities
        .iter()
        .filter(|e| e.length > 0)
        .cloned()
        .collect();
    canonical_sort(&mut entities);

    let idx = Utf16Index::new(&ft.text);
    let total = idx.code_unit_len();
    for e in &entities {
        if e.end() > total {
            return Err(MalformedEntitySetError::OutOfBounds {
                offset: e.offset,
                length: e.length,
                text_len: total,
            });
        }
        if idx.byte_at(e.offset).is_none() {
            return Err(MalformedEntitySetError::Misaligned { offset: e.offset });
        }
        if idx.byte_at(e.end()).is_none() {
            return Err(MalformedEntitySetError::Misaligned { offset: e.end() });
        }
    }
    check_laminar(&entities)?;

    let mut out = String::new();
    render_range(&mut out, &ft.text, &idx, 0, total, &entities);
    Ok(out)
}

/// Render `[start, end)` of the buffer, wrapping each top-level entity in
/// its delimiter pair and recursing into the entities it contains.
fn render_range(
    out: &mut String,
    text: &str,
    idx: &Utf16Index,
    start: u32,
    end: u32,
    entities: &[Entity],
) {
    let mut pos = start;
    let mut k = 0;
    while k < entities.len() {
        let e = &entities[k];
        if e.offset > pos {
            push_literal(out, text, idx, pos, e.offset);
        }
        // Laminar + canonical order: every following entity starting
        // before e's end is contained in e
        let mut j = k + 1;
        while j < entities.len() && entities[j].offset < e.end() {
            j += 1;
        }
        render_entity(out, text, idx, e, &entities[k + 1..j]);
        pos = e.end();
        k = j;
    }
    if end > pos {
        push_literal(out, text, idx, pos, end);
    }
}

fn render_entity(
    out: &mut String,
    text: &str,
    idx: &Utf16Index,
    e: &Entity,
    children: &[Entity],
) {
    match &e.kind {
        EntityKind::Bold => wrap(out, text, idx, e, children, "**", "**"),
        EntityKind::Italic => wrap(out, text, idx, e, children, "*", "*"),
        EntityKind::Underline => wrap(out, text, idx, e, children, "__", "__"),
        EntityKind::Strikethrough => wrap(out, text, idx, e, children, "~~", "~~"),
        EntityKind::Spoiler => wrap(out, text, idx, e, children, "[", "](spoiler)"),
        EntityKind::Code => {
            out.push('`');
            out.push_str(raw_slice(text, idx, e));
            out.push('`');
        }
        EntityKind::Pre { language } => {
            out.push_str("```");
            out.push_str(language);
            out.push('\n');
            out.push_str(raw_slice(text, idx, e));
            out.push_str("\n```");
        }
        EntityKind::TextLink { url } => {
            let target = utf8_percent_encode(url, LINK_TARGET).to_string();
            wrap(out, text, idx, e, children, "[", &format!("]({target})"));
        }
        EntityKind::Mention { user } => {
            wrap(out, text, idx, e, children, "[", &format!("](tg://user?id={user})"));
        }
        EntityKind::CustomEmoji { document_id } => {
            wrap(out, text, idx, e, children, "[", &format!("](emoji/{document_id})"));
        }
        EntityKind::Blockquote => {
            let mut inner = String::new();
            render_range(&mut inner, text, idx, e.offset, e.end(), children);
            for (n, line) in inner.split('\n').enumerate() {
                if n > 0 {
                    out.push('\n');
                }
                out.push_str("> ");
                out.push_str(line);
            }
        }
    }
}

fn wrap(
    out: &mut String,
    text: &str,
    idx: &Utf16Index,
    e: &Entity,
    children: &[Entity],
    open: &str,
    close: &str,
) {
    out.push_str(open);
    render_range(out, text, idx, e.offset, e.end(), children);
    out.push_str(close);
}

/// Unescaped slice for Code/Pre contents (validated to be aligned).
fn raw_slice<'a>(text: &'a str, idx: &Utf16Index, e: &Entity) -> &'a str {
    let range = idx
        .byte_range(e.offset..e.end())
        .expect("validated alignment");
    &text[range]
}

fn push_literal(out: &mut String, text: &str, idx: &Utf16Index, start: u32, end: u32) {
    // Gaps sit between validated entity boundaries, so alignment holds
    if let Some(range) = idx.byte_range(start..end) {
        out.push_str(&escape_markdown(&text[range]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse;

    fn ft(text: &str, entities: Vec<Entity>) -> FormattedText {
        FormattedText::new(text, entities)
    }

    #[test]
    fn test_render_plain_text() {
        assert_eq!(render(&FormattedText::plain("hello")).unwrap(), "hello");
    }

    #[test]
    fn test_render_escapes_delimiters_in_plain_text() {
        assert_eq!(
            render(&FormattedText::plain("a * b > c")).unwrap(),
            "a \\* b \\> c"
        );
    }

    #[test]
    fn test_render_bold() {
        let v = ft("bold", vec![Entity::new(EntityKind::Bold, 0, 4)]);
        assert_eq!(render(&v).unwrap(), "**bold**");
    }

    #[test]
    fn test_render_nested_same_range_outer_first() {
        // Equal ranges render in canonical (kind-rank) order: Bold outside
        let v = ft(
            "bold underline",
            vec![
                Entity::new(EntityKind::Underline, 0, 14),
                Entity::new(EntityKind::Bold, 0, 14),
            ],
        );
        assert_eq!(render(&v).unwrap(), "**__bold underline__**");
    }

    #[test]
    fn test_render_widest_first_at_shared_start() {
        let v = ft(
            "ab cd",
            vec![
                Entity::new(EntityKind::Italic, 0, 2),
                Entity::new(EntityKind::Bold, 0, 5),
            ],
        );
        assert_eq!(render(&v).unwrap(), "***ab* cd**");
    }

    #[test]
    fn test_render_code_raw() {
        let v = ft("**raw**", vec![Entity::new(EntityKind::Code, 0, 7)]);
        assert_eq!(render(&v).unwrap(), "`**raw**`");
    }

    #[test]
    fn test_render_pre_with_language() {
        let v = ft(
            "fn main() {}",
            vec![Entity::new(
                EntityKind::Pre {
                    language: "rust".into(),
                },
                0,
                12,
            )],
        );
        assert_eq!(render(&v).unwrap(), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_render_link_encodes_parens() {
        let v = ft(
            "w",
            vec![Entity::new(
                EntityKind::TextLink {
                    url: "https://e.com/a(b)".into(),
                },
                0,
                1,
            )],
        );
        assert_eq!(render(&v).unwrap(), "[w](https://e.com/a%28b%29)");
    }

    #[test]
    fn test_render_blockquote_prefixes_lines() {
        let v = ft("a\nb", vec![Entity::new(EntityKind::Blockquote, 0, 3)]);
        assert_eq!(render(&v).unwrap(), "> a\n> b");
    }

    #[test]
    fn test_render_rejects_out_of_bounds() {
        let v = ft("ab", vec![Entity::new(EntityKind::Bold, 0, 5)]);
        assert!(matches!(
            render(&v),
            Err(MalformedEntitySetError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_render_rejects_partial_overlap() {
        let v = ft(
            "abcdef",
            vec![
                Entity::new(EntityKind::Bold, 0, 4),
                Entity::new(EntityKind::Italic, 2, 4),
            ],
        );
        assert!(matches!(
            render(&v),
            Err(MalformedEntitySetError::PartialOverlap { .. })
        ));
    }

    #[test]
    fn test_render_rejects_surrogate_split() {
        // Offset 1 lands inside the emoji's surrogate pair
        let v = ft("😀x", vec![Entity::new(EntityKind::Bold, 1, 2)]);
        assert!(matches!(
            render(&v),
            Err(MalformedEntitySetError::Misaligned { offset: 1 })
        ));
    }

    #[test]
    fn test_round_trip_simple() {
        for src in [
            "plain",
            "**b** *i* __u__ ~~s~~",
            "a `code` b",
            "[t](https://e.com)",
            "[s](spoiler)",
            "> q1\n> q2",
            "**__both__**",
            "😀 **bold**",
        ] {
            let first = parse(src);
            let rendered = render(&first).unwrap();
            assert_eq!(parse(&rendered), first, "round trip failed for {src:?}");
        }
    }
}
