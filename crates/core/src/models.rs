//! # Model Configuration
//!
//! Backend selection for model-driven actors and selectors. The orchestration
//! core never talks to a backend itself; these types only parameterize
//! [`crate::actors::LlmActor`] and [`crate::swarm::selector::LlmSelector`].

use anyhow::Context;
use radkit::agent::LlmFunction;
use radkit::models::providers::{
    AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
};
use radkit::models::{BaseLlm, LLMOutputTrait};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported text-generation providers.
///
/// Each reads its API key from the environment:
/// - Anthropic - `ANTHROPIC_API_KEY`
/// - OpenAI (and compatible endpoints) - `OPENAI_API_KEY`
/// - Gemini - `GEMINI_API_KEY`
/// - OpenRouter - `OPENROUTER_API_KEY`
/// - Grok - `XAI_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    OpenRouter,
    Grok,
    DeepSeek,
}

impl LlmProvider {
    /// Model used when a config names none
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-sonnet-4-20250514",
            LlmProvider::OpenAI => "gpt-4o",
            LlmProvider::Gemini => "gemini-2.0-flash-exp",
            LlmProvider::OpenRouter => "anthropic/claude-3.5-sonnet",
            LlmProvider::Grok => "grok-2",
            LlmProvider::DeepSeek => "deepseek-chat",
        }
    }

    /// Whether a custom base URL is honored (OpenAI-compatible endpoints)
    pub fn supports_base_url(&self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}

/// Which provider and model a model-driven component uses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name; empty means the provider default
    #[serde(default)]
    pub model: String,
    /// Base URL override, only used by providers that support it
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::with_provider(LlmProvider::default(), "")
    }
}

impl ModelConfig {
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Fill in the provider default model and drop unsupported base URLs
    pub fn resolved(mut self) -> Self {
        if self.model.trim().is_empty() {
            self.model = self.provider.default_model().to_string();
        }
        if !self.provider.supports_base_url() {
            self.base_url = None;
        }
        self
    }

    /// Run one structured call: `instructions` as the system prompt, `prompt`
    /// as the user turn, reply parsed into `T`.
    ///
    /// Credentials come from the provider's environment variable. Failures
    /// carry the provider and model in their context.
    pub async fn call_structured<T>(&self, instructions: &str, prompt: String) -> anyhow::Result<T>
    where
        T: LLMOutputTrait + JsonSchema + Send + Sync + 'static,
    {
        let config = self.clone().resolved();
        tracing::debug!(provider = ?config.provider, model = %config.model, "structured model call");

        let result: anyhow::Result<T> = async {
            match config.provider {
                LlmProvider::OpenAI => {
                    let mut llm = OpenAILlm::from_env(config.model.as_str())?;
                    if let Some(base_url) = &config.base_url {
                        llm = llm.with_base_url(base_url.as_str());
                    }
                    run_function::<T, _>(llm, instructions, prompt).await
                }
                LlmProvider::Anthropic => {
                    let llm = AnthropicLlm::from_env(config.model.as_str())?;
                    run_function::<T, _>(llm, instructions, prompt).await
                }
                LlmProvider::Gemini => {
                    let llm = GeminiLlm::from_env(config.model.as_str())?;
                    run_function::<T, _>(llm, instructions, prompt).await
                }
                LlmProvider::OpenRouter => {
                    let llm = OpenRouterLlm::from_env(config.model.as_str())?;
                    run_function::<T, _>(llm, instructions, prompt).await
                }
                LlmProvider::Grok => {
                    let llm = GrokLlm::from_env(config.model.as_str())?;
                    run_function::<T, _>(llm, instructions, prompt).await
                }
                LlmProvider::DeepSeek => {
                    let llm = DeepSeekLlm::from_env(config.model.as_str())?;
                    run_function::<T, _>(llm, instructions, prompt).await
                }
            }
        }
        .await;
        result.with_context(|| format!("{:?} call with model '{}' failed", config.provider, config.model))
    }
}

async fn run_function<T, L>(llm: L, instructions: &str, prompt: String) -> anyhow::Result<T>
where
    T: LLMOutputTrait + JsonSchema + Send + Sync + 'static,
    L: BaseLlm + 'static,
{
    let function = LlmFunction::<T>::new_with_system_instructions(llm, instructions);
    Ok(function.run(prompt).await?)
}
