//! Named payloads attached to an outbound command.
//!
//! Text content travels as a plain JSON string. Binary content travels as
//! `{"base64": "..."}` using the standard alphabet with padding.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content of one attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentContent {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(BinaryPayload),
}

impl AttachmentContent {
    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(payload) => payload.base64.len(),
        }
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for AttachmentContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for AttachmentContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for AttachmentContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(BinaryPayload { base64: bytes })
    }
}

/// Binary attachment body, base64-encoded on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPayload {
    /// Decoded bytes.
    #[serde(serialize_with = "encode_base64", deserialize_with = "decode_base64")]
    pub base64: Vec<u8>,
}

fn encode_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn decode_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

/// One named payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment name, unique within a bundle.
    pub name: String,
    /// Payload.
    pub content: AttachmentContent,
}

/// Ordered collection of attachments owned by one invoker.
///
/// Names are unique: adding a name that is already present is refused and
/// the existing entry is kept. The bundle survives across runs until the
/// owner clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachmentBundle {
    items: Vec<Attachment>,
}

impl AttachmentBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attachment. Returns `false` if the name is already taken.
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<AttachmentContent>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.items.push(Attachment {
            name,
            content: content.into(),
        });
        true
    }

    /// Remove one attachment by name.
    pub fn remove(&mut self, name: &str) -> Option<Attachment> {
        let idx = self.items.iter().position(|a| a.name == name)?;
        Some(self.items.remove(idx))
    }

    /// Remove every attachment.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Whether an attachment with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|a| a.name == name)
    }

    /// Number of attachments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attachment names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|a| a.name.as_str())
    }

    /// Iterate attachments in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    /// Copy the bundle into the wire map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, AttachmentContent> {
        self.items
            .iter()
            .map(|a| (a.name.clone(), a.content.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a AttachmentBundle {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
