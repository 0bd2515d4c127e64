//! # Conclave Core
//!
//! Multi-actor orchestration engine: a shared, append-only transcript that a
//! team of actors extends turn by turn, driven either by a speaker selector or
//! by a directed execution graph, plus post-run report synthesis.
//!
//! ## Architecture
//!
//! - `transcript/` - Messages and the append-only transcript
//! - `actors/` - Actor trait, participant sets, scripted and model-backed actors
//! - `models` - LLM provider configuration
//! - `swarm/` - Selector and graph-flow orchestrators, filters, termination
//! - `report/` - Artifact synthesis and storage
//! - `config` - Run configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_core::swarm::{SelectorCoordinator, TerminationCondition};
//!
//! let config = RunConfig::default()
//!     .with_termination(TerminationCondition::text_mention("TERMINATE"));
//! let mut coordinator = SelectorCoordinator::new(participants, policy, config);
//! let outcome = coordinator.run("Design a sporty SUV").await?;
//! ```

pub mod actors;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod swarm;
pub mod transcript;

pub use actors::{Actor, ActorProfile, ParticipantSet};
pub use config::RunConfig;
pub use error::{OrchestrationError, RunFailure};
pub use transcript::{Message, MessageContent, Transcript};
