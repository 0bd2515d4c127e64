//! # Termination Conditions
//!
//! Composable, side-effect-free predicates over a transcript. Conditions are
//! combined with `|`; the composite fires as soon as any branch does.
//!
//! ```rust,ignore
//! let stop = TerminationCondition::text_mention("TERMINATE")
//!     | TerminationCondition::max_messages(30);
//! ```

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// A termination predicate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationCondition {
    /// Transcript holds at least `limit` messages (the task counts)
    MaxMessages { limit: usize },
    /// Latest message contains `text`, optionally only when sent by `source`
    TextMention {
        text: String,
        #[serde(default)]
        source: Option<String>,
    },
    /// Any branch fires
    Any { conditions: Vec<TerminationCondition> },
}

impl TerminationCondition {
    pub fn max_messages(limit: usize) -> Self {
        TerminationCondition::MaxMessages { limit }
    }

    pub fn text_mention(text: impl Into<String>) -> Self {
        TerminationCondition::TextMention {
            text: text.into(),
            source: None,
        }
    }

    pub fn text_mention_from(text: impl Into<String>, source: impl Into<String>) -> Self {
        TerminationCondition::TextMention {
            text: text.into(),
            source: Some(source.into()),
        }
    }

    pub fn any(conditions: Vec<TerminationCondition>) -> Self {
        TerminationCondition::Any { conditions }
    }

    /// OR-combine with another condition, flattening nested `Any`s
    pub fn or(self, other: TerminationCondition) -> Self {
        let mut conditions = match self {
            TerminationCondition::Any { conditions } => conditions,
            single => vec![single],
        };
        match other {
            TerminationCondition::Any { conditions: more } => conditions.extend(more),
            single => conditions.push(single),
        }
        TerminationCondition::Any { conditions }
    }

    pub fn evaluate(&self, transcript: &Transcript) -> bool {
        self.fired(transcript).is_some()
    }

    /// Description of the first atomic condition that holds, if any
    pub fn fired(&self, transcript: &Transcript) -> Option<String> {
        match self {
            TerminationCondition::MaxMessages { limit } => {
                (transcript.len() >= *limit).then(|| self.describe())
            }
            TerminationCondition::TextMention { text, source } => {
                let last = transcript.last()?;
                let source_matches = source.as_deref().map_or(true, |s| s == last.source);
                (source_matches && last.content.mentions(text)).then(|| self.describe())
            }
            TerminationCondition::Any { conditions } => {
                conditions.iter().find_map(|c| c.fired(transcript))
            }
        }
    }

    /// Human-readable form
    pub fn describe(&self) -> String {
        match self {
            TerminationCondition::MaxMessages { limit } => format!("max_messages({})", limit),
            TerminationCondition::TextMention { text, source: None } => {
                format!("text_mention({:?})", text)
            }
            TerminationCondition::TextMention {
                text,
                source: Some(source),
            } => format!("text_mention({:?} from {})", text, source),
            TerminationCondition::Any { conditions } => conditions
                .iter()
                .map(|c| c.describe())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

impl BitOr for TerminationCondition {
    type Output = TerminationCondition;

    fn bitor(self, rhs: TerminationCondition) -> TerminationCondition {
        self.or(rhs)
    }
}
