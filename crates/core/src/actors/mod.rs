//! # Actors
//!
//! Opaque conversational capabilities. An actor receives a view of the
//! transcript and produces exactly one payload; the orchestrator tags it with
//! the actor's name and appends it. Actors never touch the transcript.
//!
//! - `scripted` - deterministic actors replaying canned replies
//! - `llm_actor` - actors backed by a text-generation model

pub mod llm_actor;
pub mod scripted;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OrchestrationError;
use crate::transcript::{Message, MessageContent, TASK_SOURCE};

pub use llm_actor::{ActorReply, LlmActor};
pub use scripted::{ScriptStep, ScriptedActor};

/// Name and role description of an actor.
///
/// The description is metadata for selection policies only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ActorProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A participant in a run
#[async_trait]
pub trait Actor: Send + Sync {
    /// Name and description
    fn profile(&self) -> &ActorProfile;

    /// Unique name within a run
    fn name(&self) -> &str {
        &self.profile().name
    }

    /// Produce the next payload from the given view of the transcript
    async fn execute(&self, view: &[Message]) -> anyhow::Result<MessageContent>;
}

/// Ordered roster of actors with unique names, fixed for a run
#[derive(Clone)]
pub struct ParticipantSet {
    actors: Vec<Arc<dyn Actor>>,
}

impl std::fmt::Debug for ParticipantSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ParticipantSet {
    /// Build a roster, rejecting empty rosters, duplicate names and the
    /// task source name
    pub fn new(actors: Vec<Arc<dyn Actor>>) -> Result<Self, OrchestrationError> {
        if actors.is_empty() {
            return Err(OrchestrationError::EmptyRoster);
        }
        let mut seen = HashSet::new();
        for actor in &actors {
            if actor.name() == TASK_SOURCE {
                return Err(OrchestrationError::ReservedActorName {
                    name: actor.name().to_string(),
                });
            }
            if !seen.insert(actor.name().to_string()) {
                return Err(OrchestrationError::DuplicateActor {
                    name: actor.name().to_string(),
                });
            }
        }
        Ok(Self { actors })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Actor>> {
        self.actors.iter().find(|a| a.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in roster order
    pub fn names(&self) -> Vec<&str> {
        self.actors.iter().map(|a| a.name()).collect()
    }

    /// Profiles in roster order
    pub fn profiles(&self) -> Vec<ActorProfile> {
        self.actors.iter().map(|a| a.profile().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Actor>> {
        self.actors.iter()
    }
}
