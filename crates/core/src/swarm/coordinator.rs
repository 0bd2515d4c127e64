//! # Selector Coordinator
//!
//! Drives a dynamic, selector-chosen round: one actor per turn, chosen afresh
//! each turn, until a termination condition fires, the selector declines,
//! or the turn bound is hit. Turns are strictly sequential.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::events::{EventLog, RunEvent, RunEventKind, ORCHESTRATOR};
use super::execution::{call_actor, cancel_requested, RunCommand};
use super::filter::derive_view;
use super::outcome::{RunOutcome, StopReason};
use super::selector::{Selection, SelectorPolicy};
use super::turn::TurnState;
use crate::actors::{ActorProfile, ParticipantSet};
use crate::config::RunConfig;
use crate::error::{OrchestrationError, RunFailure};
use crate::transcript::{MessageContent, Transcript};

/// Selector-driven orchestrator
pub struct SelectorCoordinator {
    participants: ParticipantSet,
    policy: Arc<dyn SelectorPolicy>,
    config: RunConfig,
    state: TurnState,
    event_tx: Option<mpsc::Sender<RunEvent>>,
    command_rx: Option<mpsc::Receiver<RunCommand>>,
}

impl SelectorCoordinator {
    pub fn new(
        participants: ParticipantSet,
        policy: Arc<dyn SelectorPolicy>,
        config: RunConfig,
    ) -> Self {
        Self {
            participants,
            policy,
            config,
            state: TurnState::new(),
            event_tx: None,
            command_rx: None,
        }
    }

    /// Stream run events to `tx` as they happen
    pub fn with_event_channel(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Accept cancel commands, checked before every turn
    pub fn with_command_channel(mut self, rx: mpsc::Receiver<RunCommand>) -> Self {
        self.command_rx = Some(rx);
        self
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// State of the current (or last) run
    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Run the team on a task. The task becomes message 0 from `user`.
    #[tracing::instrument(skip_all, fields(participants = self.participants.len()))]
    pub async fn run(
        &mut self,
        task: impl Into<MessageContent>,
    ) -> Result<RunOutcome, RunFailure> {
        self.state = TurnState::new();
        let mut events = EventLog::new(self.event_tx.clone());
        let mut transcript = Transcript::seeded(task);

        events
            .emit(
                RunEventKind::RunStarted,
                ORCHESTRATOR,
                Some(serde_json::json!({ "participants": self.participants.names() })),
            )
            .await;
        self.state.advance();

        match self.drive(&mut transcript, &mut events).await {
            Ok(stop_reason) => {
                self.state.terminate();
                tracing::info!(?stop_reason, messages = transcript.len(), "selector run finished");
                events
                    .emit(
                        RunEventKind::RunTerminated,
                        ORCHESTRATOR,
                        Some(serde_json::json!({
                            "stop_reason": stop_reason,
                            "messages": transcript.len()
                        })),
                    )
                    .await;
                Ok(RunOutcome {
                    run_id: events.run_id().to_string(),
                    transcript,
                    stop_reason,
                    events: events.take_events(),
                })
            }
            Err(error) => {
                self.state.fail();
                tracing::warn!(%error, "selector run failed");
                events
                    .emit(
                        RunEventKind::RunFailed,
                        ORCHESTRATOR,
                        Some(serde_json::json!({ "error": error.to_string() })),
                    )
                    .await;
                Err(RunFailure::new(error, transcript, events.take_events()))
            }
        }
    }

    async fn drive(
        &mut self,
        transcript: &mut Transcript,
        events: &mut EventLog,
    ) -> Result<StopReason, OrchestrationError> {
        self.config
            .validate()
            .map_err(|e| OrchestrationError::InvalidConfig {
                reason: format!("{:#}", e),
            })?;
        let termination = self.config.termination.clone();
        let max_turns = self.config.max_turns;
        let timeout = self.config.actor_timeout();

        if let Some(reason) = termination.as_ref().and_then(|t| t.fired(transcript)) {
            tracing::debug!(%reason, "termination fired on the task message");
            return Ok(StopReason::Condition(reason));
        }

        loop {
            if transcript.turns() >= max_turns {
                return Ok(StopReason::MaxTurns(max_turns));
            }
            if cancel_requested(&mut self.command_rx) {
                return Err(OrchestrationError::Cancelled);
            }

            let speaker = match self.select_speaker(transcript).await? {
                Some(speaker) => speaker,
                None => {
                    events
                        .emit(RunEventKind::NoSpeakerSelected, ORCHESTRATOR, None)
                        .await;
                    return Ok(StopReason::NoFurtherTurn);
                }
            };
            events
                .emit(
                    RunEventKind::SpeakerSelected,
                    &speaker,
                    Some(serde_json::json!({ "turn": transcript.turns() + 1 })),
                )
                .await;
            self.state.advance();

            let actor = self.participants.get(&speaker).cloned().ok_or_else(|| {
                OrchestrationError::SelectionAmbiguous {
                    name: speaker.clone(),
                }
            })?;
            let view = derive_view(self.config.actor_filters.get(&speaker), transcript);
            events
                .emit(
                    RunEventKind::ActorStarted,
                    &speaker,
                    Some(serde_json::json!({ "view_len": view.len() })),
                )
                .await;

            let content = match call_actor(actor, view, timeout).await {
                Ok(content) => content,
                Err(error) => {
                    events
                        .emit(
                            RunEventKind::ActorFailed,
                            &speaker,
                            Some(serde_json::json!({ "error": error.to_string() })),
                        )
                        .await;
                    return Err(error);
                }
            };

            let seq = transcript.append(speaker.clone(), content)?.seq;
            tracing::debug!(speaker = %speaker, seq, "turn appended");
            events
                .emit(
                    RunEventKind::ActorCompleted,
                    &speaker,
                    Some(serde_json::json!({ "seq": seq })),
                )
                .await;

            if let Some(reason) = termination.as_ref().and_then(|t| t.fired(transcript)) {
                return Ok(StopReason::Condition(reason));
            }
            self.state.advance();
        }
    }

    /// Ask the policy for the next speaker.
    ///
    /// With repeated speakers disallowed, the previous speaker is left out of
    /// the roster offered to the policy; if the policy names it anyway it is
    /// re-prompted, up to `max_selection_attempts` times.
    async fn select_speaker(
        &self,
        transcript: &Transcript,
    ) -> Result<Option<String>, OrchestrationError> {
        let previous = if self.config.allow_repeated_speaker {
            None
        } else {
            transcript
                .last_speaker()
                .filter(|name| self.participants.contains(name))
                .map(str::to_string)
        };

        let roster: Vec<ActorProfile> = self
            .participants
            .profiles()
            .into_iter()
            .filter(|p| previous.as_deref() != Some(p.name.as_str()))
            .collect();
        if roster.is_empty() {
            return Err(OrchestrationError::SelectionExhausted {
                previous: previous.unwrap_or_default(),
            });
        }

        for attempt in 1..=self.config.max_selection_attempts {
            let selection = self
                .policy
                .select(&roster, transcript.messages())
                .await
                .map_err(|e| OrchestrationError::SelectorFailure {
                    reason: format!("{:#}", e),
                })?;

            match selection {
                Selection::NoFurtherTurn => return Ok(None),
                Selection::Speaker(name) if roster.iter().any(|p| p.name == name) => {
                    return Ok(Some(name))
                }
                Selection::Speaker(name) if previous.as_deref() == Some(name.as_str()) => {
                    tracing::warn!(attempt, speaker = %name, "selector repeated the previous speaker");
                }
                Selection::Speaker(name) => {
                    return Err(OrchestrationError::SelectionAmbiguous { name })
                }
            }
        }

        Err(OrchestrationError::SelectionExhausted {
            previous: previous.unwrap_or_default(),
        })
    }
}
