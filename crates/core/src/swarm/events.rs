//! # Run Events
//!
//! Structured progress events emitted by both orchestrators. Events are
//! recorded on the run outcome and, when a channel is attached, streamed to
//! the caller as they happen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Kind of run event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// Task seeded, run started
    RunStarted,
    /// Selector picked the next speaker
    SpeakerSelected,
    /// Selector declined to pick a speaker
    NoSpeakerSelected,
    /// A graph wave of ready nodes was scheduled
    WaveStarted,
    /// Actor call started
    ActorStarted,
    /// Actor message appended
    ActorCompleted,
    /// Actor call failed or timed out
    ActorFailed,
    /// Run stopped normally
    RunTerminated,
    /// Run aborted with an error
    RunFailed,
}

/// An event in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Run this event belongs to
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: RunEventKind,
    /// Actor concerned, or "orchestrator"
    pub actor: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RunEvent {
    pub fn new(run_id: &str, kind: RunEventKind, actor: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            kind,
            actor: actor.to_string(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Actor name used for events raised by the orchestrator itself
pub const ORCHESTRATOR: &str = "orchestrator";

/// Per-run event recorder with an optional streaming channel
#[derive(Debug, Default)]
pub struct EventLog {
    run_id: String,
    events: Vec<RunEvent>,
    tx: Option<mpsc::Sender<RunEvent>>,
}

impl EventLog {
    pub fn new(tx: Option<mpsc::Sender<RunEvent>>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            events: Vec::new(),
            tx,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record an event and forward it to the channel, if any
    pub async fn emit(&mut self, kind: RunEventKind, actor: &str, data: Option<serde_json::Value>) {
        let mut event = RunEvent::new(&self.run_id, kind, actor);
        event.data = data;
        self.events.push(event.clone());
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(event).await;
        }
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }
}
