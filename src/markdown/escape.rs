//! Pure markdown escaping utilities.
//!
//! [`escape_markdown`] is the safety-critical transform behind the
//! `escape_md` template filter and the renderer's literal-text gaps: it
//! escapes exactly the characters the parser assigns meaning to — the
//! delimiter set plus the backslash escape character itself — and nothing
//! else. Escaping the backslash is what makes the transform idempotent:
//! double-escaped text re-parses to the same visible text plus literal
//! backslashes, never to spurious formatting.

/// The delimiter characters recognized by the parser.
const DELIMITERS: &[char] = &['*', '_', '~', '`', '[', ']', '>'];

/// Escape the markdown-significant characters in text.
///
/// Escapes `*`, `_`, `~`, `` ` ``, `[`, `]`, `>` — the characters that
/// can open or close formatting — plus `\` itself, so user-supplied text
/// cannot inject unintended entities. No other character is touched.
///
/// Idempotent modulo literal backslashes: escaping twice renders the
/// same visible text as escaping once, with extra literal backslashes as
/// the only difference.
///
/// # Examples
///
/// ```
/// use markspan::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("a > b"), "a \\> b");
/// assert_eq!(escape_markdown("50% off!"), "50% off!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);

    for c in text.chars() {
        if c == '\\' || DELIMITERS.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}
