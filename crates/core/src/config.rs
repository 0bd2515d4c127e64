//! # Run Configuration
//!
//! Immutable settings consumed by the orchestrators. Built in code or loaded
//! from a JSON file; never shared process-wide.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::SynthesizerConfig;
use crate::swarm::filter::FilterSpec;
use crate::swarm::termination::TerminationCondition;

/// Configuration for one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Whether the same actor may speak on consecutive turns
    pub allow_repeated_speaker: bool,
    /// Caller-supplied stop condition
    pub termination: Option<TerminationCondition>,
    /// Hard bound on actor turns; always OR-ed with `termination`
    pub max_turns: usize,
    /// Per-actor view filters (full transcript when absent)
    pub actor_filters: HashMap<String, FilterSpec>,
    /// Timeout for a single actor call, in milliseconds
    pub actor_timeout_ms: u64,
    /// How often the selector is re-prompted after naming an excluded speaker
    pub max_selection_attempts: u32,
    /// Maximum concurrent actor calls within a graph wave
    pub max_concurrency: usize,
    /// Final artifact extraction
    pub report: SynthesizerConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            allow_repeated_speaker: true,
            termination: None,
            max_turns: 35,
            actor_filters: HashMap::new(),
            actor_timeout_ms: 300_000,
            max_selection_attempts: 3,
            max_concurrency: 4,
            report: SynthesizerConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config: {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("Invalid run config: {:?}", path))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could honor
    pub fn validate(&self) -> Result<()> {
        if self.max_selection_attempts == 0 {
            anyhow::bail!("max_selection_attempts must be at least 1");
        }
        if self.max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be at least 1");
        }
        if self.actor_timeout_ms == 0 {
            anyhow::bail!("actor_timeout_ms must be at least 1");
        }
        Ok(())
    }

    pub fn actor_timeout(&self) -> Duration {
        Duration::from_millis(self.actor_timeout_ms)
    }

    pub fn with_termination(mut self, termination: TerminationCondition) -> Self {
        self.termination = Some(termination);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_repeated_speaker(mut self, allowed: bool) -> Self {
        self.allow_repeated_speaker = allowed;
        self
    }

    pub fn with_actor_filter(mut self, actor: impl Into<String>, filter: FilterSpec) -> Self {
        self.actor_filters.insert(actor.into(), filter);
        self
    }

    /// Set the per-call timeout; anything below a millisecond becomes one
    pub fn with_actor_timeout(mut self, timeout: Duration) -> Self {
        self.actor_timeout_ms = u64::try_from(timeout.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }
}
