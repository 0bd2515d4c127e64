//! # Model-Driven Actor
//!
//! Wraps a text-generation backend as an [`Actor`]: the view is rendered as a
//! conversation and the model's reply becomes the next message.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Actor, ActorProfile};
use crate::models::ModelConfig;
use crate::transcript::{render_history, Message, MessageContent};

/// Structured reply requested from the backend
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ActorReply {
    /// The message to add to the conversation
    pub content: String,
}

/// Actor whose turns are produced by a model
pub struct LlmActor {
    profile: ActorProfile,
    instructions: String,
    config: ModelConfig,
}

impl LlmActor {
    pub fn new(profile: ActorProfile, instructions: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            profile,
            instructions: instructions.into(),
            config: config.resolved(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Prompt sent for a given view
    pub fn build_prompt(&self, view: &[Message]) -> String {
        format!(
            "You are {}.\n\nConversation so far:\n{}\n\nWrite your next message.",
            self.profile.name,
            render_history(view)
        )
    }
}

#[async_trait]
impl Actor for LlmActor {
    fn profile(&self) -> &ActorProfile {
        &self.profile
    }

    async fn execute(&self, view: &[Message]) -> anyhow::Result<MessageContent> {
        let prompt = self.build_prompt(view);
        tracing::debug!(actor = %self.profile.name, model = %self.config.model, "calling model");
        let reply: ActorReply = self
            .config
            .call_structured(&self.instructions, prompt)
            .await?;
        Ok(MessageContent::Text(reply.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LlmProvider;

    #[test]
    fn test_prompt_includes_history() {
        let actor = LlmActor::new(
            ActorProfile::new("verifier", "checks research"),
            "Verify things.",
            ModelConfig::with_provider(LlmProvider::OpenAI, ""),
        );
        let view = vec![
            Message::new(0, "user", "design a sporty SUV"),
            Message::new(1, "researcher", "Cd around 0.30"),
        ];
        let prompt = actor.build_prompt(&view);
        assert!(prompt.starts_with("You are verifier."));
        assert!(prompt.contains("user: design a sporty SUV"));
        assert!(prompt.contains("researcher: Cd around 0.30"));
        assert_eq!(actor.config().model, "gpt-4o");
    }
}
