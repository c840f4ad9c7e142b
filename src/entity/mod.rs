//! Formatting entities and the canonical `FormattedText` value.
//!
//! An [`Entity`] is a formatting span over a text buffer: a kind, a start
//! offset, a length (both in UTF-16 code units), and an optional payload
//! carried inside the kind. Entity sets are **laminar**: any two spans are
//! either disjoint or one fully contains the other. Nesting is therefore
//! derived from offset/length comparison — there is no owned tree of child
//! entities, just a flat sorted list.
//!
//! ## Canonical form
//!
//! Entities sort by offset ascending, then length descending (wider spans
//! first, so containers precede their contents), then by a fixed kind rank
//! as the final tie-break. Two [`FormattedText`] values holding the same
//! text and the same entity set always canonicalize identically, which is
//! what makes round-trip equality well-defined.

use crate::error::MalformedEntitySetError;
use crate::offset::{CodeUnitOffset, utf16_len};

#[cfg(feature = "serde")]
pub mod wire;

/// The closed set of entity kinds, with payloads where the protocol
/// carries data alongside the span.
///
/// Declaration order doubles as the canonical tie-break rank for entities
/// with identical ranges: lower-ranked kinds list (and render) outside
/// higher-ranked ones. Blockquote leads because its line prefixes only
/// survive a re-parse when it wraps everything else; when `**__x__**`
/// parses, Bold and Underline cover the same span and Bold (the outer
/// delimiter) lists first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Blockquote,
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    /// Inline monospace. Contents are never re-scanned for markup.
    Code,
    /// Fenced code block with an optional language tag.
    Pre { language: String },
    /// Hyperlink over the covered text.
    TextLink { url: String },
    /// Mention of a user; the reference string is protocol-opaque.
    Mention { user: String },
    /// Custom emoji placeholder; the covered text is the fallback glyph.
    CustomEmoji { document_id: u64 },
}

impl EntityKind {
    /// Canonical tie-break rank (declaration order).
    pub(crate) fn rank(&self) -> u8 {
        match self {
            EntityKind::Blockquote => 0,
            EntityKind::Bold => 1,
            EntityKind::Italic => 2,
            EntityKind::Underline => 3,
            EntityKind::Strikethrough => 4,
            EntityKind::Spoiler => 5,
            EntityKind::Code => 6,
            EntityKind::Pre { .. } => 7,
            EntityKind::TextLink { .. } => 8,
            EntityKind::Mention { .. } => 9,
            EntityKind::CustomEmoji { .. } => 10,
        }
    }

    /// Final tie-break between same-kind entities at identical ranges,
    /// so canonical order is a pure function of the entity set.
    fn payload_cmp(&self, other: &EntityKind) -> std::cmp::Ordering {
        use EntityKind::*;
        match (self, other) {
            (Pre { language: a }, Pre { language: b }) => a.cmp(b),
            (TextLink { url: a }, TextLink { url: b }) => a.cmp(b),
            (Mention { user: a }, Mention { user: b }) => a.cmp(b),
            (CustomEmoji { document_id: a }, CustomEmoji { document_id: b }) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

/// One formatting span over a text buffer.
///
/// Immutable once produced; offsets and lengths are UTF-16 code units
/// against the *stripped* plain text, never against markup source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: CodeUnitOffset,
    pub length: CodeUnitOffset,
}

impl Entity {
    /// Create a new entity.
    pub fn new(kind: EntityKind, offset: CodeUnitOffset, length: CodeUnitOffset) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }

    /// One past the last code unit covered by this entity.
    pub fn end(&self) -> CodeUnitOffset {
        self.offset + self.length
    }

    /// Whether `other` lies entirely within this entity's range.
    pub fn contains(&self, other: &Entity) -> bool {
        self.offset <= other.offset && other.end() <= self.end()
    }
}

/// Plain text paired with its formatting entities, in canonical order.
///
/// This is the parser's output and the renderer's input. The constructor
/// canonicalizes, so equality between two values built from the same data
/// holds regardless of input entity order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormattedText {
    /// The plain text buffer (markup delimiters stripped).
    pub text: String,
    /// Entities sorted canonically.
    pub entities: Vec<Entity>,
}

impl FormattedText {
    /// Create a value from text and entities, canonicalizing the entity
    /// order.
    pub fn new(text: impl Into<String>, mut entities: Vec<Entity>) -> Self {
        canonical_sort(&mut entities);
        Self {
            text: text.into(),
            entities,
        }
    }

    /// Text with no formatting.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }

    /// Total text length in UTF-16 code units.
    pub fn code_unit_len(&self) -> CodeUnitOffset {
        utf16_len(&self.text)
    }

    /// Re-establish canonical entity order in place.
    pub fn canonicalize(&mut self) {
        canonical_sort(&mut self.entities);
    }

    /// Check that every entity fits the buffer and that the set is
    /// laminar. Assumes canonical order (sorts a copy otherwise not).
    ///
    /// The parser upholds this by construction; call it on values that
    /// arrive from outside before rendering or transmitting them.
    pub fn validate(&self) -> Result<(), MalformedEntitySetError> {
        let text_len = self.code_unit_len();
        for e in &self.entities {
            if e.end() > text_len {
                return Err(MalformedEntitySetError::OutOfBounds {
                    offset: e.offset,
                    length: e.length,
                    text_len,
                });
            }
        }
        check_laminar(&self.entities)
    }
}

/// Sort entities into canonical order: offset ascending, length descending,
/// kind rank ascending.
pub(crate) fn canonical_sort(entities: &mut [Entity]) {
    entities.sort_by(|a, b| {
        a.offset
            .cmp(&b.offset)
            .then(b.length.cmp(&a.length))
            .then(a.kind.rank().cmp(&b.kind.rank()))
            .then_with(|| a.kind.payload_cmp(&b.kind))
    });
}

/// Verify the laminar-set invariant over a canonically sorted slice:
/// any two entities are disjoint or one contains the other.
pub(crate) fn check_laminar(entities: &[Entity]) -> Result<(), MalformedEntitySetError> {
    // Stack of currently-open containers; canonical order guarantees a
    // container is visited before anything it contains.
    let mut open: Vec<&Entity> = Vec::new();

    for e in entities {
        while let Some(top) = open.last() {
            if top.end() <= e.offset {
                open.pop();
            } else {
                break;
            }
        }
        if let Some(top) = open.last()
            && e.end() > top.end()
        {
            return Err(MalformedEntitySetError::PartialOverlap {
                a_offset: top.offset,
                a_length: top.length,
                b_offset: e.offset,
                b_length: e.length,
            });
        }
        open.push(e);
    }
    Ok(())
}
