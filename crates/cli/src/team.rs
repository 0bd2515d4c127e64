//! Team files: the actors, selector, graph shape and run settings for a run.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use conclave_core::actors::{Actor, ActorProfile, LlmActor, ParticipantSet, ScriptedActor};
use conclave_core::models::ModelConfig;
use conclave_core::swarm::{
    Edge, Graph, GraphBuilder, LlmSelector, RoundRobinSelector, ScriptedSelector, SelectorPolicy,
};
use conclave_core::RunConfig;

/// One team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Canned replies; makes this a scripted actor
    #[serde(default)]
    pub replies: Option<Vec<String>>,
    /// System instructions for a model-backed actor
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub model: ModelConfig,
}

impl ActorSpec {
    fn build(&self) -> Result<Arc<dyn Actor>> {
        if let Some(replies) = &self.replies {
            return Ok(Arc::new(
                ScriptedActor::new(&self.name, &self.description).replies(replies.clone()),
            ));
        }
        let instructions = self
            .instructions
            .as_ref()
            .with_context(|| format!("Actor '{}' needs either replies or instructions", self.name))?;
        Ok(Arc::new(LlmActor::new(
            ActorProfile::new(&self.name, &self.description),
            instructions,
            self.model.clone(),
        )))
    }
}

/// How the next speaker is chosen in selector mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorSpec {
    /// Fixed picks; `null` ends the run
    Scripted { picks: Vec<Option<String>> },
    /// Cycle through the actors in team order
    RoundRobin,
    /// Ask a model
    Llm {
        #[serde(default)]
        model: ModelConfig,
        #[serde(default)]
        template: Option<String>,
    },
}

impl Default for SelectorSpec {
    fn default() -> Self {
        SelectorSpec::RoundRobin
    }
}

/// Report framing for stored artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSpec {
    pub title: String,
    pub prefix: String,
}

impl Default for ReportSpec {
    fn default() -> Self {
        Self {
            title: "Analysis Report".to_string(),
            prefix: "analysis_report".to_string(),
        }
    }
}

/// A team file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFile {
    pub actors: Vec<ActorSpec>,
    #[serde(default)]
    pub selector: SelectorSpec,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub entry_points: Vec<String>,
    #[serde(default)]
    pub config: RunConfig,
    #[serde(default)]
    pub report: ReportSpec,
}

impl TeamFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read team file: {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("Invalid team file: {:?}", path))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let team: TeamFile = serde_json::from_str(raw)?;
        team.config.validate()?;
        Ok(team)
    }

    fn actors(&self) -> Result<Vec<Arc<dyn Actor>>> {
        self.actors.iter().map(ActorSpec::build).collect()
    }

    pub fn participants(&self) -> Result<ParticipantSet> {
        Ok(ParticipantSet::new(self.actors()?)?)
    }

    pub fn selector(&self) -> Arc<dyn SelectorPolicy> {
        match &self.selector {
            SelectorSpec::Scripted { picks } => Arc::new(ScriptedSelector::new(picks.clone())),
            SelectorSpec::RoundRobin => Arc::new(RoundRobinSelector::new(
                self.actors.iter().map(|a| a.name.clone()),
            )),
            SelectorSpec::Llm { model, template } => {
                let selector = LlmSelector::new(model.clone());
                match template {
                    Some(template) => Arc::new(selector.with_template(template.clone())),
                    None => Arc::new(selector),
                }
            }
        }
    }

    pub fn graph(&self) -> Result<Graph> {
        let mut builder = GraphBuilder::new();
        for actor in self.actors()? {
            builder = builder.node(actor);
        }
        for edge in &self.edges {
            builder = match &edge.filter {
                Some(filter) => builder.filtered_edge(&edge.from, &edge.to, filter.clone()),
                None => builder.edge(&edge.from, &edge.to),
            };
        }
        for entry in &self.entry_points {
            builder = builder.entry_point(entry);
        }
        Ok(builder.build()?)
    }
}
