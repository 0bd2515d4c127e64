//! # Transcript Log
//!
//! Single-writer, append-only ordered log of messages.

use serde::{Deserialize, Serialize};

use super::message::{Message, MessageContent, TASK_SOURCE};
use crate::error::OrchestrationError;

/// Append-only message log for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript whose message 0 is the task from [`TASK_SOURCE`]
    pub fn seeded(task: impl Into<MessageContent>) -> Self {
        let mut transcript = Self::new();
        transcript.messages.push(Message::new(0, TASK_SOURCE, task));
        transcript
    }

    /// Sequence number the next appended message will receive
    pub fn next_seq(&self) -> u64 {
        self.messages.len() as u64
    }

    /// Append a payload from `source`, assigning the next sequence number
    pub fn append(
        &mut self,
        source: impl Into<String>,
        content: impl Into<MessageContent>,
    ) -> Result<&Message, OrchestrationError> {
        let message = Message::new(self.next_seq(), source, content);
        self.push(message)
    }

    /// Append a fully built message.
    ///
    /// Rejects any message whose sequence number is not exactly the next one,
    /// so numbering stays strictly increasing with no gaps.
    pub fn push(&mut self, message: Message) -> Result<&Message, OrchestrationError> {
        let expected = self.next_seq();
        if message.seq != expected {
            return Err(OrchestrationError::SequenceViolation {
                expected,
                actual: message.seq,
            });
        }
        self.messages.push(message);
        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Source of the most recent non-task message
    pub fn last_speaker(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.seq > 0 || m.source != TASK_SOURCE)
            .map(|m| m.source.as_str())
    }

    /// Number of messages produced by actors (everything but the seeded task)
    pub fn turns(&self) -> usize {
        match self.messages.first() {
            Some(first) if first.source == TASK_SOURCE => self.messages.len() - 1,
            _ => self.messages.len(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
