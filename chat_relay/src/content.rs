//! Message content as the assistant service returns it.
//!
//! The vendor documents content as a list of typed blocks, but replies have
//! been seen as a bare string, a single block, `{value}` wrappers and
//! `output_text` blocks carrying `parts`. Each shape is a variant here; any
//! other shape lands in [`ContentBlock::Other`] and contributes no text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Block(ContentBlock),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContentBlock {
    Plain(String),
    /// `{"type": "text", "text": {"value": ..}}` or `{"text": ".."}`.
    Text { text: TextValue },
    Value { value: String },
    Parts {
        #[serde(rename = "type")]
        kind: String,
        parts: Vec<String>,
    },
    Other(Value),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum TextValue {
    Wrapped { value: String },
    Plain(String),
}

impl TextValue {
    pub fn as_str(&self) -> &str {
        match self {
            TextValue::Wrapped { value } => value,
            TextValue::Plain(s) => s,
        }
    }
}

impl ContentBlock {
    pub fn text(&self) -> String {
        match self {
            ContentBlock::Plain(s) => s.clone(),
            ContentBlock::Text { text } => text.as_str().to_string(),
            ContentBlock::Value { value } => value.clone(),
            ContentBlock::Parts { kind, parts } if kind == "output_text" => parts.concat(),
            ContentBlock::Parts { .. } | ContentBlock::Other(_) => String::new(),
        }
    }
}

impl MessageContent {
    /// Text of all blocks, one per line, trimmed.
    pub fn text(&self) -> String {
        let pieces: Vec<String> = match self {
            MessageContent::Text(s) => vec![s.clone()],
            MessageContent::Blocks(blocks) => blocks.iter().map(ContentBlock::text).collect(),
            MessageContent::Block(block) => vec![block.text()],
        };
        pieces
            .iter()
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Reply text from raw message content. Never fails: shapes that cannot be
/// read give an empty string.
pub fn extract_reply(raw: &Value) -> String {
    serde_json::from_value::<MessageContent>(raw.clone())
        .map(|content| content.text())
        .unwrap_or_default()
}
