//! # Actor Execution
//!
//! Turn-boundary cancellation and the timed actor call shared by both
//! orchestrators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::actors::Actor;
use crate::error::OrchestrationError;
use crate::transcript::{Message, MessageContent};

/// Commands a caller can send to a running orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    /// Stop before the next turn or wave starts
    Cancel,
}

/// Whether a cancel is pending. Never blocks.
pub(crate) fn cancel_requested(rx: &mut Option<mpsc::Receiver<RunCommand>>) -> bool {
    match rx {
        Some(rx) => matches!(rx.try_recv(), Ok(RunCommand::Cancel)),
        None => false,
    }
}

/// Run one actor call under a timeout.
///
/// Errors and timeouts both surface as `ActorExecutionFailure`; nothing is
/// retried here.
pub(crate) async fn call_actor(
    actor: Arc<dyn Actor>,
    view: Vec<Message>,
    timeout: Duration,
) -> Result<MessageContent, OrchestrationError> {
    let name = actor.name().to_string();
    match tokio::time::timeout(timeout, actor.execute(&view)).await {
        Ok(Ok(content)) => Ok(content),
        Ok(Err(e)) => Err(OrchestrationError::ActorExecutionFailure {
            actor: name,
            reason: format!("{:#}", e),
        }),
        Err(_) => Err(OrchestrationError::ActorExecutionFailure {
            actor: name,
            reason: format!("timed out after {:?}", timeout),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::ScriptedActor;

    #[tokio::test]
    async fn test_call_actor_maps_failure() {
        let actor: Arc<dyn Actor> = Arc::new(ScriptedActor::new("A", "").fail("boom"));
        let err = call_actor(actor, Vec::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::ActorExecutionFailure { actor, reason } if actor == "A" && reason == "boom"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_actor_times_out() {
        let actor: Arc<dyn Actor> = Arc::new(
            ScriptedActor::new("slow", "")
                .reply("late")
                .with_delay(Duration::from_secs(60)),
        );
        let err = call_actor(actor, Vec::new(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancel_requested() {
        let mut none = None;
        assert!(!cancel_requested(&mut none));

        let (tx, rx) = mpsc::channel(1);
        let mut rx = Some(rx);
        assert!(!cancel_requested(&mut rx));
        tx.send(RunCommand::Cancel).await.unwrap();
        assert!(cancel_requested(&mut rx));
    }
}
