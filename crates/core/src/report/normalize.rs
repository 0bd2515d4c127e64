//! Flattening of message payloads into text for synthesis.

use crate::transcript::{ContentPart, MessageContent};

/// Prefix carried by stringified invocation records
const TOOL_RECORD_PREFIX: &str = "FunctionCall";

/// Text carried by `content`.
///
/// Pure invocation records yield `None`. Multi-part payloads keep only their
/// textual parts, joined with newlines; a payload with no text yields `None`.
pub fn normalize_content(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Text(text) => Some(text.clone()),
        MessageContent::ToolCall(_) => None,
        MessageContent::Parts(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ToolCall { .. } => None,
                })
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
    }
}

/// Whether text is a raw invocation record that leaked through as a string
pub fn looks_like_tool_invocation(text: &str) -> bool {
    text.trim_start().starts_with(TOOL_RECORD_PREFIX)
}
