//! Wire-format serialization for entity sets (`serde` feature).
//!
//! The core owns no persisted format; this module is the serialization a
//! caller may opt into: `{text, entities: [{type, offset, length, ...}]}`
//! with the kind as a snake_case `type` tag and payload fields flattened
//! alongside. Decoding is lenient about unknown kinds (skipped with a
//! warning, so a newer peer does not break an older consumer) but strict
//! about the laminar invariant — a malformed set is an error, never a
//! silent drop.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Entity, EntityKind, FormattedText};
use crate::error::MalformedEntitySetError;

/// One entity as transmitted on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document_id: Option<u64>,
}

/// A complete formatted message as transmitted on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub text: String,
    pub entities: Vec<WireEntity>,
}

impl From<&Entity> for WireEntity {
    fn from(e: &Entity) -> Self {
        let mut wire = WireEntity {
            kind: String::new(),
            offset: e.offset,
            length: e.length,
            url: None,
            language: None,
            user: None,
            document_id: None,
        };
        wire.kind = match &e.kind {
            EntityKind::Bold => "bold",
            EntityKind::Italic => "italic",
            EntityKind::Underline => "underline",
            EntityKind::Strikethrough => "strikethrough",
            EntityKind::Spoiler => "spoiler",
            EntityKind::Code => "code",
            EntityKind::Pre { language } => {
                if !language.is_empty() {
                    wire.language = Some(language.clone());
                }
                "pre"
            }
            EntityKind::TextLink { url } => {
                wire.url = Some(url.clone());
                "text_link"
            }
            EntityKind::Mention { user } => {
                wire.user = Some(user.clone());
                "mention"
            }
            EntityKind::CustomEmoji { document_id } => {
                wire.document_id = Some(*document_id);
                "custom_emoji"
            }
            EntityKind::Blockquote => "blockquote",
        }
        .to_string();
        wire
    }
}

impl WireEntity {
    /// Decode into an [`Entity`], or `None` for unknown kinds.
    fn decode(&self) -> Option<Entity> {
        let kind = match self.kind.as_str() {
            "bold" => EntityKind::Bold,
            "italic" => EntityKind::Italic,
            "underline" => EntityKind::Underline,
            "strikethrough" => EntityKind::Strikethrough,
            "spoiler" => EntityKind::Spoiler,
            "code" => EntityKind::Code,
            "pre" => EntityKind::Pre {
                language: self.language.clone().unwrap_or_default(),
            },
            "text_link" => EntityKind::TextLink {
                url: self.url.clone().unwrap_or_default(),
            },
            "mention" => EntityKind::Mention {
                user: self.user.clone().unwrap_or_default(),
            },
            "custom_emoji" => EntityKind::CustomEmoji {
                document_id: self.document_id.unwrap_or_default(),
            },
            "blockquote" => EntityKind::Blockquote,
            other => {
                warn!(kind = other, "skipping unknown entity kind");
                return None;
            }
        };
        Some(Entity::new(kind, self.offset, self.length))
    }
}

impl FormattedText {
    /// Serialize into the wire shape, preserving canonical entity order.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            text: self.text.clone(),
            entities: self.entities.iter().map(WireEntity::from).collect(),
        }
    }

    /// Decode a wire message, re-canonicalizing and enforcing the laminar
    /// invariant. Unknown entity kinds are skipped.
    pub fn from_wire(wire: &WireMessage) -> Result<Self, MalformedEntitySetError> {
        let entities = wire.entities.iter().filter_map(WireEntity::decode).collect();
        let ft = FormattedText::new(wire.text.clone(), entities);
        ft.validate()?;
        Ok(ft)
    }
}
