// ABOUTME: Data models for Granola documents, rich-text nodes, and transcripts
// ABOUTME: Tolerant conversion from raw JSON where missing fields fall back to defaults

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const UNTITLED: &str = "Untitled Granola Note";
pub const UNKNOWN_ID: &str = "unknown_id";

/// Reads any JSON value and keeps it only when it is a string. Wrong types
/// and `null` become `None` instead of failing the whole record.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

pub(crate) fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.filter(|s| !s.is_empty()))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

/// One node of a ProseMirror rich-text tree.
///
/// Conversion from JSON never fails: an unrecognized or malformed node
/// becomes `Other` and keeps whatever children could be read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Node {
    Heading { level: usize, content: Vec<Node> },
    Paragraph { content: Vec<Node> },
    BulletList { content: Vec<Node> },
    ListItem { content: Vec<Node> },
    Text { text: String },
    Other { content: Vec<Node> },
}

impl Node {
    pub fn from_value(value: &Value) -> Node {
        let content = || children(value);

        match value.get("type").and_then(Value::as_str) {
            Some("heading") => Node::Heading {
                level: heading_level(value),
                content: content(),
            },
            Some("paragraph") => Node::Paragraph { content: content() },
            Some("bulletList") => Node::BulletList { content: content() },
            Some("listItem") => Node::ListItem { content: content() },
            Some("text") => Node::Text {
                text: value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            _ => Node::Other { content: content() },
        }
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node::Text { text: text.into() }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Heading { content, .. }
            | Node::Paragraph { content }
            | Node::BulletList { content }
            | Node::ListItem { content }
            | Node::Other { content } => content.as_slice(),
            Node::Text { .. } => &[],
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::from_value(&value)
    }
}

fn children(value: &Value) -> Vec<Node> {
    value
        .get("content")
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter().map(Node::from_value).collect())
        .unwrap_or_default()
}

fn heading_level(value: &Value) -> usize {
    let level = value
        .get("attrs")
        .and_then(|attrs| attrs.get("level"))
        .and_then(Value::as_i64);

    match level {
        // A negative level repeats the marker zero times
        Some(level) => usize::try_from(level).unwrap_or(0),
        None => 1,
    }
}

#[cfg(test)]
mod node_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_from_heading() {
        let node = Node::from_value(&json!({
            "type": "heading",
            "attrs": {"level": 3},
            "content": [{"type": "text", "text": "Agenda"}]
        }));
        assert_eq!(
            node,
            Node::Heading {
                level: 3,
                content: vec![Node::text("Agenda")]
            }
        );
    }

    #[test]
    fn test_node_heading_level_defaults() {
        let missing = Node::from_value(&json!({"type": "heading"}));
        assert!(matches!(missing, Node::Heading { level: 1, .. }));

        let garbage = Node::from_value(&json!({"type": "heading", "attrs": {"level": "two"}}));
        assert!(matches!(garbage, Node::Heading { level: 1, .. }));

        let negative = Node::from_value(&json!({"type": "heading", "attrs": {"level": -2}}));
        assert!(matches!(negative, Node::Heading { level: 0, .. }));

        let deep = Node::from_value(&json!({"type": "heading", "attrs": {"level": 9}}));
        assert!(matches!(deep, Node::Heading { level: 9, .. }));
    }

    #[test]
    fn test_node_unknown_type_keeps_children() {
        let node = Node::from_value(&json!({
            "type": "blockquote",
            "content": [{"type": "text", "text": "quoted"}]
        }));
        assert_eq!(node.children(), &[Node::text("quoted")]);
    }

    #[test]
    fn test_node_malformed_input() {
        assert_eq!(Node::from_value(&json!(42)), Node::Other { content: vec![] });
        assert_eq!(
            Node::from_value(&json!({"type": "paragraph", "content": "nope"})),
            Node::Paragraph { content: vec![] }
        );
        assert_eq!(Node::from_value(&json!({"type": "text"})), Node::text(""));
    }

    #[test]
    fn test_node_deserialize() {
        let node: Node = serde_json::from_str(r#"{"type": "text", "text": "hi"}"#).unwrap();
        assert_eq!(node, Node::text("hi"));
    }
}

/// Audio channel an utterance was captured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceSource {
    Microphone,
    System,
    Unknown(String),
}

impl Default for UtteranceSource {
    fn default() -> Self {
        UtteranceSource::parse(None)
    }
}

impl UtteranceSource {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("microphone") => UtteranceSource::Microphone,
            Some("system") => UtteranceSource::System,
            Some(other) => UtteranceSource::Unknown(other.to_string()),
            None => UtteranceSource::Unknown("unknown".into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UtteranceSource::Microphone => "microphone",
            UtteranceSource::System => "system",
            UtteranceSource::Unknown(raw) => raw,
        }
    }

    /// Speaker label used in rendered transcripts. Anything that is not the
    /// microphone is reported as the system channel.
    pub fn speaker_label(&self) -> &'static str {
        match self {
            UtteranceSource::Microphone => "Microphone",
            _ => "System",
        }
    }

    fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(UtteranceSource::parse(string_or_none(deserializer)?.as_deref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Utterance {
    #[serde(default, deserialize_with = "UtteranceSource::deserialize_lenient")]
    pub source: UtteranceSource,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub text: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub start_timestamp: Option<String>,
}

impl Utterance {
    pub fn new(source: &str, text: &str, start_timestamp: Option<&str>) -> Self {
        Utterance {
            source: UtteranceSource::parse(Some(source)),
            text: text.to_string(),
            start_timestamp: start_timestamp.map(str::to_string),
        }
    }

    /// Anything that is not an object reads as an empty utterance.
    pub fn from_value(value: &Value) -> Self {
        Utterance::deserialize(value).unwrap_or_default()
    }

    /// Reads a transcript response. Returns `None` when the payload is not a
    /// JSON array.
    pub fn list_from_value(value: &Value) -> Option<Vec<Utterance>> {
        value
            .as_array()
            .map(|items| items.iter().map(Utterance::from_value).collect())
    }
}


/// A document as returned by the documents endpoint, with the raw JSON kept
/// for the on-disk snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Document {
    #[serde(deserialize_with = "id_or_unknown")]
    pub id: String,
    #[serde(deserialize_with = "title_or_untitled")]
    pub title: String,
    #[serde(deserialize_with = "string_or_none")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "string_or_none")]
    pub updated_at: Option<String>,
    #[serde(skip)]
    pub raw: Value,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            id: UNKNOWN_ID.into(),
            title: UNTITLED.into(),
            created_at: None,
            updated_at: None,
            raw: Value::Null,
        }
    }
}

fn id_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_else(|| UNKNOWN_ID.into()))
}

fn title_or_untitled<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_else(|| UNTITLED.into()))
}

impl Document {
    pub fn from_value(raw: Value) -> Self {
        let doc = Document::deserialize(&raw).unwrap_or_default();
        Document { raw, ..doc }
    }

    /// The ProseMirror tree of the last viewed panel, if it holds a `doc`.
    pub fn panel_content(&self) -> Option<&Value> {
        self.raw
            .get("last_viewed_panel")
            .and_then(|panel| panel.get("content"))
            .filter(|content| content.get("type").and_then(Value::as_str) == Some("doc"))
    }
}


/// Per-document metadata written next to the rendered notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub document_id: String,
    pub title: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub meeting_date: Option<String>,
    pub sources: Vec<String>,
}

impl SyncRecord {
    pub fn derive(doc: &Document, transcript: Option<&[Utterance]>) -> Self {
        let utterances = transcript.unwrap_or_default();

        let sources: BTreeSet<&str> = utterances.iter().map(|u| u.source.as_str()).collect();
        let meeting_date = utterances
            .first()
            .and_then(|first| first.start_timestamp.clone());

        SyncRecord {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            created_at: doc.created_at.clone(),
            updated_at: doc.updated_at.clone(),
            meeting_date,
            sources: sources.into_iter().map(str::to_string).collect(),
        }
    }
}
