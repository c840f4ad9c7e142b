//! Markdown → plain text + entities.
//!
//! The parser is total: it never fails. Markup that cannot be resolved
//! (an unmatched `**`, a fence with no closing fence, a `[` with no
//! `](url)`) degrades to literal text instead of raising.
//!
//! Parsing runs in three passes over the source:
//!
//! 1. **Lex**: a single left-to-right scan producing a flat token list.
//!    Code and Pre spans are consumed whole here, which is what masks their
//!    contents from all later delimiter matching.
//! 2. **Resolve**: a stack pass pairing opening and closing delimiters.
//!    A closer pairs with the nearest matching opener on the stack; any
//!    opener above it is demoted to literal text (the earliest-opened,
//!    earliest-closed pairing wins). Unmatched delimiters stay literal.
//!    Inline spans never cross a blockquote boundary: when a line's
//!    quoted-ness flips, the open-delimiter stack is flushed, which is
//!    what keeps parser output laminar by construction.
//! 3. **Build**: emit plain text and entities, tracking positions in
//!    UTF-16 code units throughout. Inner entities are emitted before the
//!    spans that contain them; [`FormattedText::new`] canonicalizes.

use memchr::{memchr, memmem};
use tracing::trace;

use crate::entity::{Entity, EntityKind, FormattedText};
use crate::offset::{utf16_len, utf16_width};

/// Parser dialect configuration, passed per call.
///
/// This replaces any notion of process-wide parser state: callers that
/// need a different dialect construct a different config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum delimiter nesting depth; deeper openers become literal
    /// text rather than growing the stack without bound.
    pub max_depth: usize,
    /// Recognize `[text](spoiler)` as a Spoiler entity.
    pub spoiler_links: bool,
    /// Recognize `[text](emoji/<digits>)` as a CustomEmoji entity.
    pub custom_emoji_links: bool,
    /// Recognize `[text](tg://user?id=<ref>)` as a Mention entity.
    pub mention_links: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            spoiler_links: true,
            custom_emoji_links: true,
            mention_links: true,
        }
    }
}

/// Inline delimiter classes. The delimiter character distinguishes
/// Underline (`__`) from Bold (`**`) even though both are doubled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimKind {
    /// `**`
    Star2,
    /// `*`
    Star1,
    /// `__`
    Under2,
    /// `_`
    Under1,
    /// `~~`
    Tilde2,
}

impl DelimKind {
    fn entity_kind(self) -> EntityKind {
        match self {
            DelimKind::Star2 => EntityKind::Bold,
            DelimKind::Star1 | DelimKind::Under1 => EntityKind::Italic,
            DelimKind::Under2 => EntityKind::Underline,
            DelimKind::Tilde2 => EntityKind::Strikethrough,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok<'a> {
    /// Literal text run.
    Text(&'a str),
    /// Backslash-escaped character, emitted without the backslash.
    Esc(char),
    Newline,
    /// Line-initial `>` (plus one optional space), already stripped.
    QuoteMarker,
    /// Inline code span; contents are opaque.
    Code(&'a str),
    /// Fenced code block; contents are opaque.
    Pre { language: &'a str, content: &'a str },
    Delim {
        kind: DelimKind,
        can_open: bool,
        can_close: bool,
        src: &'a str,
    },
    /// `[`
    LinkOpen,
    /// `](url)`, url captured.
    LinkClose { url: &'a str, src: &'a str },
}

/// Resolution of a delimiter or link token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Res {
    Literal,
    Open,
    Close { opener: usize },
}

/// Parse markdown-flavored source with the default dialect.
///
/// # Examples
///
/// ```
/// use markspan::markdown::parse;
/// use markspan::{Entity, EntityKind};
///
/// let ft = parse("a **b** c");
/// assert_eq!(ft.text, "a b c");
/// assert_eq!(ft.entities, vec![Entity::new(EntityKind::Bold, 2, 1)]);
/// ```
pub fn parse(source: &str) -> FormattedText {
    parse_with(source, &ParserConfig::default())
}

/// Parse markdown-flavored source with an explicit dialect configuration.
pub fn parse_with(source: &str, config: &ParserConfig) -> FormattedText {
    if source.is_empty() {
        return FormattedText::default();
    }

    let toks = lex(source);
    let res = resolve(&toks, config.max_depth);
    build(&toks, &res, config)
}

// ============================================================================
// Pass 1: Lexing
// ============================================================================

fn lex(source: &str) -> Vec<Tok<'_>> {
    let bytes = source.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;
    let mut run_start = 0;
    let mut at_line_start = true;

    macro_rules! flush {
        () => {
            if run_start < i {
                toks.push(Tok::Text(&source[run_start..i]));
            }
        };
    }

    while i < bytes.len() {
        let b = bytes[i];

        if at_line_start && b == b'>' {
            flush!();
            i += 1;
            if bytes.get(i) == Some(&b' ') {
                i += 1;
            }
            toks.push(Tok::QuoteMarker);
            run_start = i;
            at_line_start = false;
            continue;
        }
        if b != b'\n' {
            at_line_start = false;
        }

        match b {
            b'\n' => {
                flush!();
                toks.push(Tok::Newline);
                i += 1;
                run_start = i;
                at_line_start = true;
            }
            b'\\' => {
                let next = source[i + 1..].chars().next();
                if let Some(c) = next
                    && c.is_ascii_punctuation()
                {
                    flush!();
                    toks.push(Tok::Esc(c));
                    i += 2;
                    run_start = i;
                } else {
                    // Literal backslash stays in the run
                    i += 1;
                }
            }
            b'`' => {
                if bytes[i..].starts_with(b"```")
                    && let Some(pre) = lex_fence(&source[i + 3..])
                {
                    flush!();
                    let consumed = pre.2;
                    toks.push(Tok::Pre {
                        language: pre.0,
                        content: pre.1,
                    });
                    i += 3 + consumed;
                    run_start = i;
                } else if let Some(j) = memchr(b'`', &bytes[i + 1..])
                    && j > 0
                {
                    flush!();
                    toks.push(Tok::Code(&source[i + 1..i + 1 + j]));
                    i += j + 2;
                    run_start = i;
                } else {
                    // No closing backtick: literal
                    i += 1;
                }
            }
            b'*' | b'_' => {
                flush!();
                let double = bytes.get(i + 1) == Some(&b);
                let len = if double { 2 } else { 1 };
                let kind = match (b, double) {
                    (b'*', true) => DelimKind::Star2,
                    (b'*', false) => DelimKind::Star1,
                    (b'_', true) => DelimKind::Under2,
                    (b'_', false) => DelimKind::Under1,
                    _ => unreachable!(),
                };
                let prev = source[..i].chars().next_back();
                let next = source[i + len..].chars().next();
                // The non-whitespace-adjacency rule disambiguates single
                // emphasis from list bullets; doubled delimiters only need
                // a neighbor to exist.
                let (can_open, can_close) = if double {
                    (next.is_some(), prev.is_some())
                } else {
                    (
                        next.is_some_and(|c| !c.is_whitespace()),
                        prev.is_some_and(|c| !c.is_whitespace()),
                    )
                };
                toks.push(Tok::Delim {
                    kind,
                    can_open,
                    can_close,
                    src: &source[i..i + len],
                });
                i += len;
                run_start = i;
            }
            b'~' => {
                if bytes.get(i + 1) == Some(&b'~') {
                    flush!();
                    let prev = source[..i].chars().next_back();
                    let next = source[i + 2..].chars().next();
                    toks.push(Tok::Delim {
                        kind: DelimKind::Tilde2,
                        can_open: next.is_some(),
                        can_close: prev.is_some(),
                        src: &source[i..i + 2],
                    });
                    i += 2;
                    run_start = i;
                } else {
                    i += 1;
                }
            }
            b'[' => {
                flush!();
                toks.push(Tok::LinkOpen);
                i += 1;
                run_start = i;
            }
            b']' => {
                if bytes.get(i + 1) == Some(&b'(')
                    && let Some(j) = memchr(b')', &bytes[i + 2..])
                {
                    flush!();
                    toks.push(Tok::LinkClose {
                        url: &source[i + 2..i + 2 + j],
                        src: &source[i..i + 3 + j],
                    });
                    i += j + 3;
                    run_start = i;
                } else {
                    i += 1;
                }
            }
            _ => {
                // Advance one scalar value
                let c = source[i..].chars().next().expect("char boundary");
                i += c.len_utf8();
            }
        }
    }
    flush!();

    toks
}

/// Lex the body of a ``` fence starting just past the opening backticks.
///
/// Returns `(language, content, bytes_consumed)` where `bytes_consumed`
/// covers everything including the closing fence, or `None` when the
/// fence is unterminated.
fn lex_fence(rest: &str) -> Option<(&str, &str, usize)> {
    let close = memmem::find(rest.as_bytes(), b"```")?;
    let inner = &rest[..close];

    let (language, content) = match inner.find('\n') {
        Some(nl) => {
            let tag = &inner[..nl];
            if tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '#'))
            {
                // The first line (language word, possibly empty) and its
                // newline belong to the fence, not the content
                (tag, &inner[nl + 1..])
            } else {
                ("", inner)
            }
        }
        None => ("", inner),
    };
    // One trailing newline belongs to the closing fence line
    let content = content.strip_suffix('\n').unwrap_or(content);

    Some((language, content, close + 3))
}

// ============================================================================
// Pass 2: Delimiter resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackKind {
    Delim(DelimKind),
    Link,
}

fn resolve(toks: &[Tok<'_>], max_depth: usize) -> Vec<Res> {
    let mut res = vec![Res::Literal; toks.len()];
    let mut stack: Vec<(usize, StackKind)> = Vec::new();
    let mut line_quoted = matches!(toks.first(), Some(Tok::QuoteMarker));

    for (i, tok) in toks.iter().enumerate() {
        match tok {
            Tok::Newline => {
                let next_quoted = matches!(toks.get(i + 1), Some(Tok::QuoteMarker));
                if next_quoted != line_quoted {
                    // Inline spans may not cross a blockquote boundary
                    if !stack.is_empty() {
                        trace!(open = stack.len(), "quote boundary flushes open delimiters");
                    }
                    stack.clear();
                    line_quoted = next_quoted;
                }
            }
            Tok::Delim {
                kind,
                can_open,
                can_close,
                ..
            } => {
                let matched = if *can_close {
                    stack
                        .iter()
                        .rposition(|(_, sk)| *sk == StackKind::Delim(*kind))
                } else {
                    None
                };
                if let Some(pos) = matched {
                    // Openers above the match lose: they stay literal
                    stack.truncate(pos + 1);
                    let (opener, _) = stack.pop().expect("matched position");
                    res[opener] = Res::Open;
                    res[i] = Res::Close { opener };
                } else if *can_open && stack.len() < max_depth {
                    stack.push((i, StackKind::Delim(*kind)));
                }
            }
            Tok::LinkOpen => {
                if stack.len() < max_depth {
                    stack.push((i, StackKind::Link));
                }
            }
            Tok::LinkClose { .. } => {
                if let Some(pos) = stack.iter().rposition(|(_, sk)| *sk == StackKind::Link) {
                    stack.truncate(pos + 1);
                    let (opener, _) = stack.pop().expect("matched position");
                    res[opener] = Res::Open;
                    res[i] = Res::Close { opener };
                }
            }
            _ => {}
        }
    }

    res
}

// ============================================================================
// Pass 3: Building text and entities
// ============================================================================

fn build(toks: &[Tok<'_>], res: &[Res], config: &ParserConfig) -> FormattedText {
    let mut out = String::new();
    let mut cu: u32 = 0;
    let mut entities: Vec<Entity> = Vec::new();
    // Start positions of currently open delimiter/link spans
    let mut open_spans: Vec<u32> = Vec::new();
    let mut quote_run_start: Option<u32> = None;

    macro_rules! push_str {
        ($s:expr) => {{
            let s: &str = $s;
            out.push_str(s);
            cu += utf16_len(s);
        }};
    }

    for (i, tok) in toks.iter().enumerate() {
        match tok {
            Tok::Text(s) => push_str!(s),
            Tok::Esc(c) => {
                out.push(*c);
                cu += utf16_width(*c);
            }
            Tok::Newline => {
                if let Some(start) = quote_run_start
                    && !matches!(toks.get(i + 1), Some(Tok::QuoteMarker))
                {
                    if cu > start {
                        entities.push(Entity::new(EntityKind::Blockquote, start, cu - start));
                    }
                    quote_run_start = None;
                }
                push_str!("\n");
            }
            Tok::QuoteMarker => {
                if quote_run_start.is_none() {
                    quote_run_start = Some(cu);
                }
            }
            Tok::Code(content) => {
                let length = utf16_len(content);
                if length > 0 {
                    entities.push(Entity::new(EntityKind::Code, cu, length));
                }
                push_str!(content);
            }
            Tok::Pre { language, content } => {
                let length = utf16_len(content);
                if length > 0 {
                    entities.push(Entity::new(
                        EntityKind::Pre {
                            language: (*language).to_string(),
                        },
                        cu,
                        length,
                    ));
                }
                push_str!(content);
            }
            Tok::Delim { kind, src, .. } => match res[i] {
                Res::Literal => push_str!(src),
                Res::Open => open_spans.push(cu),
                Res::Close { .. } => {
                    let start = open_spans.pop().expect("balanced spans");
                    if cu > start {
                        entities.push(Entity::new(kind.entity_kind(), start, cu - start));
                    }
                }
            },
            Tok::LinkOpen => match res[i] {
                Res::Open => open_spans.push(cu),
                _ => push_str!("["),
            },
            Tok::LinkClose { url, src } => match res[i] {
                Res::Close { .. } => {
                    let start = open_spans.pop().expect("balanced spans");
                    if cu > start {
                        entities.push(Entity::new(classify_link(url, config), start, cu - start));
                    }
                }
                _ => push_str!(src),
            },
        }
    }
    if let Some(start) = quote_run_start
        && cu > start
    {
        entities.push(Entity::new(EntityKind::Blockquote, start, cu - start));
    }

    FormattedText::new(out, entities)
}

/// Resolve a link target to an entity kind, applying the configured
/// special forms before falling back to a plain hyperlink.
fn classify_link(url: &str, config: &ParserConfig) -> EntityKind {
    if config.spoiler_links && url == "spoiler" {
        return EntityKind::Spoiler;
    }
    if config.custom_emoji_links
        && let Some(digits) = url.strip_prefix("emoji/")
        && !digits.is_empty()
        && let Ok(document_id) = digits.parse::<u64>()
    {
        return EntityKind::CustomEmoji { document_id };
    }
    if config.mention_links
        && let Some(user) = url.strip_prefix("tg://user?id=")
        && !user.is_empty()
    {
        return EntityKind::Mention {
            user: user.to_string(),
        };
    }
    EntityKind::TextLink {
        url: url.replace("%28", "(").replace("%29", ")"),
    }
}
