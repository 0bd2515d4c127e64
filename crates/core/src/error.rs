//! # Orchestration Errors
//!
//! Typed failures surfaced by both orchestrators. A failed run always hands
//! back the transcript as it stood when the run stopped.

use thiserror::Error;

use crate::swarm::events::RunEvent;
use crate::transcript::Transcript;

/// Errors raised by orchestration, graph construction and transcript appends
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The selection policy named an actor that is not in the roster
    #[error("selector chose '{name}', which is not a participant")]
    SelectionAmbiguous { name: String },

    /// Repeated speakers are disallowed and no other actor could be selected
    #[error("no eligible speaker remains after '{previous}'")]
    SelectionExhausted { previous: String },

    /// The selection policy itself failed
    #[error("selector failed: {reason}")]
    SelectorFailure { reason: String },

    /// An actor errored or exceeded its call timeout
    #[error("actor '{actor}' failed: {reason}")]
    ActorExecutionFailure { actor: String, reason: String },

    /// The graph contains at least one cycle through the listed nodes
    #[error("graph contains a cycle through: {}", nodes.join(", "))]
    GraphCycleDetected { nodes: Vec<String> },

    /// A node cannot be reached from any entry point
    #[error("graph node '{node}' is unreachable from every entry point")]
    GraphUnreachableNode { node: String },

    /// An edge or entry point refers to an actor that was never added
    #[error("graph refers to unknown node '{node}'")]
    GraphUnknownNode { node: String },

    /// Two actors share a name
    #[error("actor name '{name}' is used more than once")]
    DuplicateActor { name: String },

    /// An actor uses the name reserved for the task message
    #[error("actor name '{name}' is reserved for the task message")]
    ReservedActorName { name: String },

    /// No actors were supplied
    #[error("a run needs at least one participant")]
    EmptyRoster,

    /// A transcript append would break the gap-free sequence
    #[error("sequence violation: expected {expected}, got {actual}")]
    SequenceViolation { expected: u64, actual: u64 },

    /// The run configuration cannot be honored
    #[error("invalid run configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The caller cancelled the run at a turn boundary
    #[error("run cancelled by caller")]
    Cancelled,
}

/// A failed run: the error plus everything produced before it
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: OrchestrationError,
    /// Transcript up to the last successful append
    pub transcript: Transcript,
    /// Events recorded before the failure
    pub events: Vec<RunEvent>,
}

impl RunFailure {
    pub fn new(error: OrchestrationError, transcript: Transcript, events: Vec<RunEvent>) -> Self {
        Self {
            error,
            transcript,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = OrchestrationError::GraphCycleDetected {
            nodes: vec!["B".to_string(), "C".to_string()],
        };
        assert_eq!(err.to_string(), "graph contains a cycle through: B, C");

        let err = OrchestrationError::SelectionAmbiguous {
            name: "Ghost".to_string(),
        };
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn test_run_failure_keeps_partial_transcript() {
        let mut transcript = Transcript::seeded("task");
        transcript.append("A", "partial").unwrap();
        let failure = RunFailure::new(OrchestrationError::Cancelled, transcript, Vec::new());
        assert_eq!(failure.transcript.len(), 2);
        assert_eq!(failure.to_string(), "run cancelled by caller");
    }
}
