//! # Scripted Actors
//!
//! Deterministic actors that replay a fixed script. Used for dry runs from
//! the CLI and to drive the orchestrators in tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Actor, ActorProfile};
use crate::transcript::{Message, MessageContent};

/// One step of a script
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Reply with this payload
    Reply(MessageContent),
    /// Fail the call with this reason
    Fail(String),
}

/// Actor that answers each call with the next step of its script
pub struct ScriptedActor {
    profile: ActorProfile,
    script: Mutex<VecDeque<ScriptStep>>,
    delay: Option<Duration>,
    views: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedActor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            profile: ActorProfile::new(name, description),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            views: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text reply
    pub fn reply(self, content: impl Into<MessageContent>) -> Self {
        self.step(ScriptStep::Reply(content.into()))
    }

    /// Queue several text replies
    pub fn replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MessageContent>,
    {
        replies.into_iter().fold(self, |actor, r| actor.reply(r))
    }

    /// Queue a failure
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.step(ScriptStep::Fail(reason.into()))
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn step(self, step: ScriptStep) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(step);
        }
        self
    }

    /// Views received so far, one entry per call
    pub fn views(&self) -> Vec<Vec<Message>> {
        self.views
            .lock()
            .map(|views| views.clone())
            .unwrap_or_default()
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.views.lock().map(|views| views.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Actor for ScriptedActor {
    fn profile(&self) -> &ActorProfile {
        &self.profile
    }

    async fn execute(&self, view: &[Message]) -> anyhow::Result<MessageContent> {
        self.views
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .push(view.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self
            .script
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .pop_front();

        match step {
            Some(ScriptStep::Reply(content)) => Ok(content),
            Some(ScriptStep::Fail(reason)) => anyhow::bail!(reason),
            None => anyhow::bail!("script for '{}' is exhausted", self.profile.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_in_order() {
        let actor = ScriptedActor::new("A", "").replies(["first", "second"]);
        let view = vec![Message::new(0, "user", "task")];

        let one = actor.execute(&view).await.unwrap();
        let two = actor.execute(&view).await.unwrap();
        assert_eq!(one.as_text(), Some("first"));
        assert_eq!(two.as_text(), Some("second"));
        assert_eq!(actor.calls(), 2);
        assert_eq!(actor.views()[0][0].source, "user");
    }

    #[tokio::test]
    async fn test_exhausted_script_errors() {
        let actor = ScriptedActor::new("A", "").reply("only");
        actor.execute(&[]).await.unwrap();
        let err = actor.execute(&[]).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let actor = ScriptedActor::new("A", "").fail("backend unavailable");
        let err = actor.execute(&[]).await.unwrap_err();
        assert_eq!(err.to_string(), "backend unavailable");
    }
}
