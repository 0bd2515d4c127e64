//! # Selector Policies
//!
//! Decide which participant speaks next. The orchestrator only relies on the
//! contract: given the eligible roster and the conversation so far, return a
//! participant name or [`Selection::NoFurtherTurn`]. Names outside the roster
//! are rejected by the orchestrator.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::actors::ActorProfile;
use crate::models::ModelConfig;
use crate::transcript::{render_history, Message, TASK_SOURCE};

/// Outcome of a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Run this participant next
    Speaker(String),
    /// Stop: nobody should take another turn
    NoFurtherTurn,
}

/// Pluggable decision function for the next speaker
#[async_trait]
pub trait SelectorPolicy: Send + Sync {
    async fn select(&self, roster: &[ActorProfile], history: &[Message])
        -> anyhow::Result<Selection>;
}

/// Turn free-form decision text into a [`Selection`].
///
/// Exact names win; otherwise a reply mentioning exactly one participant
/// selects it. Empty or "none" replies mean no further turn. Anything else
/// is returned verbatim so the orchestrator can flag it.
pub fn parse_selection(reply: &str, roster: &[ActorProfile]) -> Selection {
    let trimmed = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.');

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Selection::NoFurtherTurn;
    }

    if let Some(profile) = roster.iter().find(|p| p.name == trimmed) {
        return Selection::Speaker(profile.name.clone());
    }

    let mentioned: Vec<&ActorProfile> = roster
        .iter()
        .filter(|p| trimmed.contains(p.name.as_str()))
        .collect();
    match mentioned.as_slice() {
        [only] => Selection::Speaker(only.name.clone()),
        _ => Selection::Speaker(trimmed.to_string()),
    }
}

/// Default instructions for model-driven selection.
///
/// Placeholders: `{roles}`, `{participants}`, `{history}`.
pub const DEFAULT_SELECTOR_PROMPT: &str = "You are coordinating a team working on a shared task. \
Select the team member who should act next.

Team roles:
{roles}

Read the following conversation, then pick the next speaker from {participants}.
Base your choice on the current stage of the work and the last speaker's findings.
Reply with NONE if the task is complete and nobody should speak.

{history}

Read the conversation above. Return only one name from {participants}, or NONE.";

/// Fill the selector template for a roster and history
pub fn render_selector_prompt(template: &str, roster: &[ActorProfile], history: &[Message]) -> String {
    let roles = roster
        .iter()
        .map(|p| format!("{}: {}", p.name, p.description))
        .collect::<Vec<_>>()
        .join("\n");
    let participants = format!(
        "[{}]",
        roster
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    template
        .replace("{roles}", &roles)
        .replace("{participants}", &participants)
        .replace("{history}", &render_history(history))
}

/// Structured answer requested from the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct SpeakerChoice {
    /// Name of the next speaker, or NONE
    pub speaker: String,
}

/// Selector that asks a model to choose
pub struct LlmSelector {
    config: ModelConfig,
    template: String,
}

impl LlmSelector {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config: config.resolved(),
            template: DEFAULT_SELECTOR_PROMPT.to_string(),
        }
    }

    /// Replace the selection template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }
}

#[async_trait]
impl SelectorPolicy for LlmSelector {
    async fn select(
        &self,
        roster: &[ActorProfile],
        history: &[Message],
    ) -> anyhow::Result<Selection> {
        let prompt = render_selector_prompt(&self.template, roster, history);
        let choice: SpeakerChoice = self
            .config
            .call_structured(
                "You pick the next speaker in a multi-agent conversation.",
                prompt,
            )
            .await?;
        tracing::debug!(reply = %choice.speaker, "model selected speaker");
        Ok(parse_selection(&choice.speaker, roster))
    }
}

/// Cycles through a fixed order, continuing after the last speaker
pub struct RoundRobinSelector {
    order: Vec<String>,
}

impl RoundRobinSelector {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SelectorPolicy for RoundRobinSelector {
    async fn select(
        &self,
        roster: &[ActorProfile],
        history: &[Message],
    ) -> anyhow::Result<Selection> {
        if self.order.is_empty() {
            return Ok(Selection::NoFurtherTurn);
        }
        let start = history
            .iter()
            .rev()
            .find(|m| m.source != TASK_SOURCE)
            .and_then(|last| self.order.iter().position(|n| *n == last.source))
            .map_or(0, |i| i + 1);

        let next = (0..self.order.len())
            .map(|offset| &self.order[(start + offset) % self.order.len()])
            .find(|name| roster.iter().any(|p| &p.name == *name));

        Ok(match next {
            Some(name) => Selection::Speaker(name.clone()),
            None => Selection::NoFurtherTurn,
        })
    }
}

/// Replays a fixed list of decisions; records the rosters it was offered
pub struct ScriptedSelector {
    picks: Mutex<VecDeque<Selection>>,
    offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSelector {
    /// `None` entries mean "no further turn"
    pub fn new<I, S>(picks: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let picks = picks
            .into_iter()
            .map(|pick| match pick {
                Some(name) => Selection::Speaker(name.into()),
                None => Selection::NoFurtherTurn,
            })
            .collect();
        Self {
            picks: Mutex::new(picks),
            offered: Mutex::new(Vec::new()),
        }
    }

    /// Roster names offered on each call
    pub fn offered(&self) -> Vec<Vec<String>> {
        self.offered
            .lock()
            .map(|offered| offered.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SelectorPolicy for ScriptedSelector {
    async fn select(
        &self,
        roster: &[ActorProfile],
        _history: &[Message],
    ) -> anyhow::Result<Selection> {
        self.offered
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .push(roster.iter().map(|p| p.name.clone()).collect());

        self.picks
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("selector script is exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<ActorProfile> {
        vec![
            ActorProfile::new("DesignAnalyst", "turns requirements into queries"),
            ActorProfile::new("MarketResearcher", "runs searches"),
            ActorProfile::new("ReportGenerator", "writes the final report"),
        ]
    }

    #[test]
    fn test_parse_exact_and_mentioned_names() {
        let roster = roster();
        assert_eq!(
            parse_selection("  MarketResearcher\n", &roster),
            Selection::Speaker("MarketResearcher".to_string())
        );
        assert_eq!(
            parse_selection("The next speaker should be ReportGenerator.", &roster),
            Selection::Speaker("ReportGenerator".to_string())
        );
        assert_eq!(parse_selection("NONE", &roster), Selection::NoFurtherTurn);
        assert_eq!(parse_selection("", &roster), Selection::NoFurtherTurn);
    }

    #[test]
    fn test_parse_unknown_name_is_passed_through() {
        let roster = roster();
        assert_eq!(
            parse_selection("Critic", &roster),
            Selection::Speaker("Critic".to_string())
        );
        // Two participants mentioned: not resolvable
        assert!(matches!(
            parse_selection("DesignAnalyst or MarketResearcher", &roster),
            Selection::Speaker(name) if name == "DesignAnalyst or MarketResearcher"
        ));
    }

    #[test]
    fn test_render_selector_prompt_fills_placeholders() {
        let history = vec![Message::new(0, "user", "design a sporty SUV")];
        let prompt = render_selector_prompt(DEFAULT_SELECTOR_PROMPT, &roster(), &history);
        assert!(prompt.contains("DesignAnalyst: turns requirements into queries"));
        assert!(prompt.contains("[DesignAnalyst, MarketResearcher, ReportGenerator]"));
        assert!(prompt.contains("user: design a sporty SUV"));
        assert!(!prompt.contains("{history}"));
    }

    #[tokio::test]
    async fn test_round_robin_skips_excluded() {
        let selector = RoundRobinSelector::new(["A", "B", "C"]);
        let all = vec![
            ActorProfile::new("A", ""),
            ActorProfile::new("B", ""),
            ActorProfile::new("C", ""),
        ];
        let history = vec![Message::new(0, "user", "task")];
        assert_eq!(
            selector.select(&all, &history).await.unwrap(),
            Selection::Speaker("A".to_string())
        );

        let history = vec![Message::new(0, "user", "task"), Message::new(1, "B", "hi")];
        let without_b: Vec<ActorProfile> = all.iter().filter(|p| p.name != "B").cloned().collect();
        assert_eq!(
            selector.select(&without_b, &history).await.unwrap(),
            Selection::Speaker("C".to_string())
        );

        let history = vec![Message::new(0, "user", "task"), Message::new(1, "C", "hi")];
        assert_eq!(
            selector.select(&all, &history).await.unwrap(),
            Selection::Speaker("A".to_string())
        );
    }

    #[tokio::test]
    async fn test_scripted_selector_records_rosters() {
        let selector = ScriptedSelector::new([Some("A"), None]);
        let roster = vec![ActorProfile::new("A", "")];
        assert_eq!(
            selector.select(&roster, &[]).await.unwrap(),
            Selection::Speaker("A".to_string())
        );
        assert_eq!(selector.select(&roster, &[]).await.unwrap(), Selection::NoFurtherTurn);
        assert!(selector.select(&roster, &[]).await.is_err());
        assert_eq!(selector.offered().len(), 3);
    }
}
