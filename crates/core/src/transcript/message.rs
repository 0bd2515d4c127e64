//! # Messages
//!
//! Addressed, immutable entries of a transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source name used for the task message that seeds every run
pub const TASK_SOURCE: &str = "user";

/// A tool/function invocation record carried inside a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Name of the invoked function
    pub name: String,
    /// Raw arguments as produced by the backend
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One part of a multi-part payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall { call: ToolCall },
}

/// Payload of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// A bare invocation record with no text
    ToolCall(ToolCall),
    /// Mixed text and invocation records
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Shorthand for a text payload
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    /// Borrow the payload as text when it is a plain text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the payload contains `needle` in any of its textual parts
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            MessageContent::Text(text) => text.contains(needle),
            MessageContent::ToolCall(_) => false,
            MessageContent::Parts(parts) => parts.iter().any(|part| match part {
                ContentPart::Text { text } => text.contains(needle),
                ContentPart::ToolCall { .. } => false,
            }),
        }
    }

    /// Flatten into a single line-oriented string for prompts and logs
    pub fn render(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::ToolCall(call) => format!("[tool call: {}]", call.name),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.clone(),
                    ContentPart::ToolCall { call } => format!("[tool call: {}]", call.name),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// An entry in the transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Position in the transcript, gap-free from 0
    pub seq: u64,
    /// Name of the producing actor (or [`TASK_SOURCE`])
    pub source: String,
    /// Payload
    pub content: MessageContent,
    /// Time of append
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message; sequence numbers are normally assigned by the transcript
    pub fn new(seq: u64, source: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            seq,
            source: source.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Render messages as `source: content` lines, one message per entry
pub fn render_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.source, m.content.render()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_history_lines() {
        let messages = vec![
            Message::new(0, TASK_SOURCE, "task"),
            Message::new(
                1,
                "A",
                MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: "looking".to_string(),
                    },
                    ContentPart::ToolCall {
                        call: ToolCall {
                            name: "web_search".to_string(),
                            arguments: serde_json::json!({"q": "suv"}),
                        },
                    },
                ]),
            ),
        ];
        assert_eq!(
            render_history(&messages),
            "user: task\nA: looking\n[tool call: web_search]"
        );
    }

    #[test]
    fn test_mentions_skips_tool_calls() {
        let content = MessageContent::Parts(vec![
            ContentPart::ToolCall {
                call: ToolCall {
                    name: "TERMINATE".to_string(),
                    arguments: serde_json::Value::Null,
                },
            },
            ContentPart::Text {
                text: "still working".to_string(),
            },
        ]);
        assert!(!content.mentions("TERMINATE"));
        assert!(content.mentions("working"));
    }

    #[test]
    fn test_content_serialization_is_tagged() {
        let json = serde_json::to_string(&MessageContent::text("hi")).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        let back: MessageContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_text(), Some("hi"));
    }
}
