//! Template source → compiled node tree.
//!
//! The grammar is LL(1) at the tag level: every construct is introduced
//! by `{` and classified by its first character (`?` conditional, `#`
//! loop, `/` close, anything else a variable), so a single forward scan
//! with an open-block stack compiles without backtracking.
//!
//! Malformed *structure* (unterminated or mismatched blocks, malformed
//! filter lists) is a [`TemplateSyntaxError`] — the template author got
//! it wrong and silently rendering something else would hide the bug.
//! Malformed *content* (`{` with no closing brace, a tag body that is
//! not a valid path) degrades to literal text instead, the same policy
//! the markdown parser applies.
//!
//! The compiled [`Template`] is immutable and freely shareable: compile
//! once per distinct source, evaluate many times, from any thread.

use std::mem;

use memchr::memchr;

use crate::error::TemplateSyntaxError;

/// A dotted field-access chain, or the loop self-reference `{.}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarPath {
    /// `{.}` — the current loop item.
    SelfRef,
    /// `{a.b.c}` — field access, outermost first.
    Fields(Vec<String>),
}

/// One filter application: `name` or `name:arg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<String>,
}

/// One unit of compiled template structure.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Literal(String),
    Variable {
        path: VarPath,
        filters: Vec<FilterCall>,
    },
    Conditional {
        path: VarPath,
        negated: bool,
        body: Vec<TemplateNode>,
    },
    Loop {
        path: VarPath,
        body: Vec<TemplateNode>,
    },
}

/// A compiled template, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<TemplateNode>,
}

impl Template {
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }
}

/// Compiler limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Maximum conditional/loop nesting depth; exceeding it is a compile
    /// error rather than unbounded recursion at evaluation time.
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

/// Compile template source with default limits.
///
/// # Examples
///
/// ```
/// use markspan::template::compile;
///
/// let template = compile("Hello {name|upper}!").unwrap();
/// assert_eq!(template.nodes().len(), 3);
/// ```
pub fn compile(source: &str) -> Result<Template, TemplateSyntaxError> {
    compile_with(source, &CompileOptions::default())
}

/// Compile template source with explicit limits.
pub fn compile_with(
    source: &str,
    options: &CompileOptions,
) -> Result<Template, TemplateSyntaxError> {
    let bytes = source.as_bytes();
    let mut i = 0;
    let mut lit = String::new();
    let mut nodes: Vec<TemplateNode> = Vec::new();
    let mut stack: Vec<(BlockHeader, Vec<TemplateNode>)> = Vec::new();

    while i < bytes.len() {
        let Some(d) = memchr(b'{', &bytes[i..]) else {
            lit.push_str(&source[i..]);
            break;
        };
        lit.push_str(&source[i..i + d]);
        i += d;

        // Tag body may not contain braces; a `{` before the `}` means
        // this brace opens nothing
        let rest = &bytes[i + 1..];
        let close = memchr(b'}', rest);
        let next_open = memchr(b'{', rest);
        let body_len = match (close, next_open) {
            (Some(c), Some(o)) if o < c => None,
            (Some(c), _) => Some(c),
            (None, _) => None,
        };
        let Some(c) = body_len else {
            lit.push('{');
            i += 1;
            continue;
        };
        let raw = &source[i..i + c + 2];
        let body = &source[i + 1..i + 1 + c];
        i += c + 2;

        match classify_tag(body)? {
            None => lit.push_str(raw),
            Some(Tag::Variable { path, filters }) => {
                flush_literal(&mut lit, &mut nodes);
                nodes.push(TemplateNode::Variable { path, filters });
            }
            Some(Tag::Open(header)) => {
                if stack.len() >= options.max_depth {
                    return Err(TemplateSyntaxError::NestingTooDeep(options.max_depth));
                }
                flush_literal(&mut lit, &mut nodes);
                stack.push((header, mem::take(&mut nodes)));
            }
            Some(Tag::Close(name)) => match stack.last() {
                // A close with no open block is content, not structure
                None => lit.push_str(raw),
                Some((header, _)) if header.name != name => {
                    return Err(TemplateSyntaxError::MismatchedCloseTag {
                        expected: header.name.clone(),
                        found: name,
                    });
                }
                Some(_) => {
                    flush_literal(&mut lit, &mut nodes);
                    let (header, parent) = stack.pop().expect("non-empty stack");
                    let body = mem::replace(&mut nodes, parent);
                    nodes.push(header.into_node(body));
                }
            },
        }
    }
    if let Some((header, _)) = stack.last() {
        return Err(TemplateSyntaxError::UnterminatedBlock(header.name.clone()));
    }
    flush_literal(&mut lit, &mut nodes);

    Ok(Template { nodes })
}

fn flush_literal(lit: &mut String, nodes: &mut Vec<TemplateNode>) {
    if !lit.is_empty() {
        nodes.push(TemplateNode::Literal(mem::take(lit)));
    }
}

#[derive(Debug)]
struct BlockHeader {
    is_loop: bool,
    negated: bool,
    path: VarPath,
    /// Raw path text, matched against the close tag's name.
    name: String,
}

impl BlockHeader {
    fn into_node(self, body: Vec<TemplateNode>) -> TemplateNode {
        if self.is_loop {
            TemplateNode::Loop {
                path: self.path,
                body,
            }
        } else {
            TemplateNode::Conditional {
                path: self.path,
                negated: self.negated,
                body,
            }
        }
    }
}

enum Tag {
    Variable {
        path: VarPath,
        filters: Vec<FilterCall>,
    },
    Open(BlockHeader),
    Close(String),
}

/// Classify a brace-free tag body. `Ok(None)` means the body is not a
/// tag at all and the braces stay literal.
fn classify_tag(body: &str) -> Result<Option<Tag>, TemplateSyntaxError> {
    if let Some(rest) = body.strip_prefix('?') {
        let (negated, rest) = match rest.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let name = rest.trim();
        return Ok(parse_path(name).map(|path| {
            Tag::Open(BlockHeader {
                is_loop: false,
                negated,
                path,
                name: name.to_string(),
            })
        }));
    }
    if let Some(rest) = body.strip_prefix('#') {
        let name = rest.trim();
        return Ok(parse_path(name).map(|path| {
            Tag::Open(BlockHeader {
                is_loop: true,
                negated: false,
                path,
                name: name.to_string(),
            })
        }));
    }
    if let Some(rest) = body.strip_prefix('/') {
        let name = rest.trim();
        return Ok(parse_path(name).map(|_| Tag::Close(name.to_string())));
    }

    let mut parts = body.split('|');
    let path_text = parts.next().expect("split yields at least one part");
    let Some(path) = parse_path(path_text) else {
        return Ok(None);
    };
    let mut filters = Vec::new();
    for part in parts {
        filters.push(parse_filter(part, body)?);
    }
    Ok(Some(Tag::Variable { path, filters }))
}

fn parse_filter(part: &str, tag_body: &str) -> Result<FilterCall, TemplateSyntaxError> {
    let malformed = || TemplateSyntaxError::MalformedFilter(tag_body.to_string());

    let part = part.trim();
    let (name, arg) = match part.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(arg.trim())),
        None => (part, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed());
    }
    let arg = match arg {
        None => None,
        Some("") => return Err(malformed()),
        Some(raw) => {
            if let Some(quoted) = raw.strip_prefix('"') {
                let inner = quoted.strip_suffix('"').ok_or_else(malformed)?;
                Some(inner.to_string())
            } else {
                Some(raw.to_string())
            }
        }
    };
    Ok(FilterCall {
        name: name.to_string(),
        arg,
    })
}

/// Parse a dotted path or the self-reference token. `None` when the text
/// is not a path (the surrounding tag then stays literal).
fn parse_path(s: &str) -> Option<VarPath> {
    let s = s.trim();
    if s == "." {
        return Some(VarPath::SelfRef);
    }
    if s.is_empty() {
        return None;
    }
    let segments: Vec<String> = s.split('.').map(str::to_string).collect();
    let valid = segments.iter().all(|seg| {
        !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    valid.then(|| VarPath::Fields(segments))
}
