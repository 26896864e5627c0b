//! Turn and Transcript domain types.
//!
//! A turn is one side of an exchange: what the user sent (text, optionally
//! with an inline image reference) or what the assistant answered (text plus
//! any images and generated files). The transcript is the in-memory,
//! append-only record of turns for one session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The remote assistant
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Reference to an uploaded image by its remote file handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileRef {
    pub file_id: String,
}

/// One part of a structured (multi-part) outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageFile { image_file: ImageFileRef },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_file(file_id: impl Into<String>) -> Self {
        Self::ImageFile {
            image_file: ImageFileRef {
                file_id: file_id.into(),
            },
        }
    }
}

/// The text body of a turn: either plain text or a list of parts.
///
/// Serializes untagged, so a plain turn goes over the wire as a JSON string
/// and a structured turn as an array of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnText {
    Plain(String),
    Parts(Vec<ContentPart>),
}

impl TurnText {
    /// The human-readable text of this body. Image parts are skipped.
    pub fn display_text(&self) -> String {
        match self {
            TurnText::Plain(text) => text.clone(),
            TurnText::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageFile { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Remote file ids of any inline image parts.
    pub fn image_file_ids(&self) -> Vec<&str> {
        match self {
            TurnText::Plain(_) => Vec::new(),
            TurnText::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ImageFile { image_file } => Some(image_file.file_id.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

impl From<&str> for TurnText {
    fn from(text: &str) -> Self {
        TurnText::Plain(text.to_string())
    }
}

impl From<String> for TurnText {
    fn from(text: String) -> Self {
        TurnText::Plain(text)
    }
}

/// A file the assistant generated, resolved to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Display name (trailing path component, sandbox prefix stripped)
    pub name: String,

    /// File contents
    pub data: Vec<u8>,
}

/// A single turn in the transcript.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    /// The text body
    pub text: TurnText,

    /// Images returned by the assistant, in block order
    pub images: Vec<Vec<u8>>,

    /// Generated files returned by the assistant, in annotation order
    pub files: Vec<GeneratedFile>,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn.
    pub fn user(text: impl Into<TurnText>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            images: Vec::new(),
            files: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn with its rendered images and files.
    pub fn assistant(
        text: impl Into<String>,
        images: Vec<Vec<u8>>,
        files: Vec<GeneratedFile>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: TurnText::Plain(text.into()),
            images,
            files,
            timestamp: Utc::now(),
        }
    }
}

/// The append-only record of turns in a session.
///
/// Insertion order is chronological order. Turns can be read but never
/// replaced or removed once pushed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_serializes_as_string() {
        let text = TurnText::from("What's the weather in Seoul?");
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json, serde_json::json!("What's the weather in Seoul?"));
    }

    #[test]
    fn structured_text_serializes_as_typed_parts() {
        let text = TurnText::Parts(vec![
            ContentPart::text("describe this image"),
            ContentPart::image_file("file-abc"),
        ]);
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "text", "text": "describe this image"},
                {"type": "image_file", "image_file": {"file_id": "file-abc"}}
            ])
        );
    }

    #[test]
    fn display_text_skips_image_parts() {
        let text = TurnText::Parts(vec![
            ContentPart::text("describe this image"),
            ContentPart::image_file("file-abc"),
        ]);
        assert_eq!(text.display_text(), "describe this image");
        assert_eq!(text.image_file_ids(), vec!["file-abc"]);
    }

    #[test]
    fn transcript_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("Hello"));
        transcript.push(Turn::assistant("Hi there!", vec![], vec![]));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role, Role::User);
        assert_eq!(transcript.turns()[1].role, Role::Assistant);
        assert_eq!(transcript.last().unwrap().text.display_text(), "Hi there!");
    }

    #[test]
    fn assistant_turn_carries_files() {
        let turn = Turn::assistant(
            "Here is your report",
            vec![vec![0x89, 0x50]],
            vec![GeneratedFile {
                name: "report.xlsx".into(),
                data: b"xlsx".to_vec(),
            }],
        );
        assert_eq!(turn.images.len(), 1);
        assert_eq!(turn.files[0].name, "report.xlsx");
    }
}
