//! # Message View Filter
//!
//! Derives the bounded, per-actor view of a transcript: either the whole
//! history (broadcast) or the first/last `count` messages of one source.

use serde::{Deserialize, Serialize};

use crate::transcript::{Message, Transcript};

/// Which end of a source's messages to keep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    First,
    Last,
}

/// Selects up to `count` messages from `source`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSpec {
    pub source: String,
    pub position: Position,
    pub count: usize,
}

impl FilterSpec {
    pub fn first(source: impl Into<String>, count: usize) -> Self {
        Self {
            source: source.into(),
            position: Position::First,
            count,
        }
    }

    pub fn last(source: impl Into<String>, count: usize) -> Self {
        Self {
            source: source.into(),
            position: Position::Last,
            count,
        }
    }

    /// Matching subsequence in transcript order; empty when the source never spoke
    pub fn apply(&self, messages: &[Message]) -> Vec<Message> {
        let matching: Vec<&Message> = messages
            .iter()
            .filter(|m| m.source == self.source)
            .collect();

        let keep = self.count.min(matching.len());
        let selected = match self.position {
            Position::First => &matching[..keep],
            Position::Last => &matching[matching.len() - keep..],
        };
        selected.iter().map(|m| (*m).clone()).collect()
    }
}

/// View for an actor: the filtered subsequence, or the full transcript without a filter
pub fn derive_view(filter: Option<&FilterSpec>, transcript: &Transcript) -> Vec<Message> {
    match filter {
        Some(filter) => filter.apply(transcript.messages()),
        None => transcript.messages().to_vec(),
    }
}
