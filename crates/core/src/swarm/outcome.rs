//! # Run Outcome
//!
//! What a successful run hands back.

use serde::{Deserialize, Serialize};

use super::events::RunEvent;
use crate::transcript::Transcript;

/// Why a run stopped without error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// A termination condition fired; holds its description
    Condition(String),
    /// The maximum-turns bound was reached
    MaxTurns(usize),
    /// The selector returned no further speaker
    NoFurtherTurn,
    /// Every graph node executed once
    GraphComplete,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Final, immutable transcript
    pub transcript: Transcript,
    pub stop_reason: StopReason,
    pub events: Vec<RunEvent>,
}
