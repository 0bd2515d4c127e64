//! # Graph Flow
//!
//! Executes a validated [`Graph`] in waves. A node is ready once every
//! predecessor has produced its message; all ready nodes of a wave run
//! concurrently (bounded by `max_concurrency`). Results are appended by the
//! orchestrator in completion order, one at a time, so sequence numbers stay
//! gap-free. Fan-in nodes only run after the whole wave holding their last
//! predecessor has been joined.
//!
//! ```text
//!        ┌──▶ B ──┐
//!   A ───┤        ├──▶ D
//!        └──▶ C ──┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use super::events::{EventLog, RunEvent, RunEventKind, ORCHESTRATOR};
use super::execution::{call_actor, cancel_requested, RunCommand};
use super::filter::derive_view;
use super::graph::Graph;
use super::outcome::{RunOutcome, StopReason};
use super::termination::TerminationCondition;
use crate::config::RunConfig;
use crate::error::{OrchestrationError, RunFailure};
use crate::transcript::{Message, MessageContent, Transcript};

/// Execution state of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Waiting on predecessors
    Pending,
    /// Scheduled in the current wave
    Running,
    /// Message appended
    Completed,
}

/// Graph-driven orchestrator
pub struct GraphFlow {
    graph: Arc<Graph>,
    config: RunConfig,
    states: HashMap<String, NodeState>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
    command_rx: Option<mpsc::Receiver<RunCommand>>,
}

impl GraphFlow {
    pub fn new(graph: Graph, config: RunConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            config,
            states: HashMap::new(),
            event_tx: None,
            command_rx: None,
        }
    }

    pub fn with_event_channel(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Accept cancel commands, checked before every wave
    pub fn with_command_channel(mut self, rx: mpsc::Receiver<RunCommand>) -> Self {
        self.command_rx = Some(rx);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// State of `node` in the current (or last) run
    pub fn node_state(&self, node: &str) -> Option<NodeState> {
        self.states.get(node).copied()
    }

    /// Run every reachable node once, starting from the task message
    #[tracing::instrument(skip_all, fields(nodes = self.graph.participants().len()))]
    pub async fn run(&mut self, task: impl Into<MessageContent>) -> Result<RunOutcome, RunFailure> {
        self.states = self
            .graph
            .topological_order()
            .iter()
            .map(|n| (n.clone(), NodeState::Pending))
            .collect();
        let mut events = EventLog::new(self.event_tx.clone());
        let mut transcript = Transcript::seeded(task);

        events
            .emit(
                RunEventKind::RunStarted,
                ORCHESTRATOR,
                Some(serde_json::json!({ "entry_points": self.graph.entry_points() })),
            )
            .await;

        match self.drive(&mut transcript, &mut events).await {
            Ok(stop_reason) => {
                tracing::info!(?stop_reason, messages = transcript.len(), "graph flow finished");
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
                tracing::warn!(%error, "graph flow failed");
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

    /// Pending nodes whose predecessors have all completed, in topological order
    fn ready_nodes(&self) -> Vec<String> {
        self.graph
            .topological_order()
            .iter()
            .filter(|n| self.states.get(n.as_str()) == Some(&NodeState::Pending))
            .filter(|n| {
                self.graph
                    .incoming(n)
                    .iter()
                    .all(|e| self.states.get(e.from.as_str()) == Some(&NodeState::Completed))
            })
            .cloned()
            .collect()
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
        let termination: Option<TerminationCondition> = self.config.termination.clone();
        let timeout = self.config.actor_timeout();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));

        if let Some(reason) = termination.as_ref().and_then(|t| t.fired(transcript)) {
            tracing::debug!(%reason, "termination fired on the task message");
            return Ok(StopReason::Condition(reason));
        }

        loop {
            let ready = self.ready_nodes();
            if ready.is_empty() {
                return Ok(StopReason::GraphComplete);
            }
            if cancel_requested(&mut self.command_rx) {
                return Err(OrchestrationError::Cancelled);
            }

            events
                .emit(
                    RunEventKind::WaveStarted,
                    ORCHESTRATOR,
                    Some(serde_json::json!({ "nodes": ready })),
                )
                .await;

            let mut wave = JoinSet::new();
            let mut task_names = HashMap::new();
            let (started_tx, mut started_rx) = mpsc::unbounded_channel::<(String, usize)>();
            for name in &ready {
                let actor = self.graph.actor(name).cloned().ok_or_else(|| {
                    OrchestrationError::GraphUnknownNode { node: name.clone() }
                })?;
                let view = assemble_view(&self.graph, &self.config, name, transcript);
                let semaphore = Arc::clone(&semaphore);
                let started_tx = started_tx.clone();
                let node = name.clone();

                self.states.insert(name.clone(), NodeState::Running);
                let handle = wave.spawn(async move {
                    // Held until the call returns
                    let _permit = semaphore.acquire_owned().await;
                    let _ = started_tx.send((node.clone(), view.len()));
                    let result = call_actor(actor, view, timeout).await;
                    (node, result)
                });
                task_names.insert(handle.id(), name.clone());
            }
            drop(started_tx);

            loop {
                // A branch reports its start before it can complete, so draining
                // starts first keeps each start ahead of its completion
                let joined = tokio::select! {
                    biased;
                    Some((name, view_len)) = started_rx.recv() => {
                        events
                            .emit(
                                RunEventKind::ActorStarted,
                                &name,
                                Some(serde_json::json!({ "view_len": view_len })),
                            )
                            .await;
                        continue;
                    }
                    joined = wave.join_next() => joined,
                };
                let Some(joined) = joined else { break };
                let (name, result) = match joined {
                    Ok(done) => done,
                    Err(join_error) => {
                        let actor = task_names
                            .get(&join_error.id())
                            .cloned()
                            .unwrap_or_default();
                        return Err(OrchestrationError::ActorExecutionFailure {
                            actor,
                            reason: format!("task failed: {}", join_error),
                        });
                    }
                };

                let content = match result {
                    Ok(content) => content,
                    Err(error) => {
                        events
                            .emit(
                                RunEventKind::ActorFailed,
                                &name,
                                Some(serde_json::json!({ "error": error.to_string() })),
                            )
                            .await;
                        wave.abort_all();
                        return Err(error);
                    }
                };

                let seq = transcript.append(name.clone(), content)?.seq;
                self.states.insert(name.clone(), NodeState::Completed);
                tracing::debug!(node = %name, seq, "graph node appended");
                events
                    .emit(
                        RunEventKind::ActorCompleted,
                        &name,
                        Some(serde_json::json!({ "seq": seq })),
                    )
                    .await;

                if let Some(reason) = termination.as_ref().and_then(|t| t.fired(transcript)) {
                    wave.abort_all();
                    return Ok(StopReason::Condition(reason));
                }
            }
        }
    }
}

/// View for `node`.
///
/// Without filtered incoming edges the node sees the whole transcript (or its
/// configured per-actor filter). Otherwise the view is the concatenation, in
/// edge-declaration order, of each edge's contribution: the filtered messages
/// for a filtered edge, the full transcript for an unfiltered one. A message
/// appears at most once.
pub fn assemble_view(
    graph: &Graph,
    config: &RunConfig,
    node: &str,
    transcript: &Transcript,
) -> Vec<Message> {
    let incoming = graph.incoming(node);
    if incoming.iter().all(|e| e.filter.is_none()) {
        return derive_view(config.actor_filters.get(node), transcript);
    }

    let mut seen = HashSet::new();
    let mut view = Vec::new();
    for edge in incoming {
        let part: Vec<Message> = match &edge.filter {
            Some(filter) => filter.apply(transcript.messages()),
            None => transcript.messages().to_vec(),
        };
        for message in part {
            if seen.insert(message.seq) {
                view.push(message);
            }
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::actors::{Actor, ScriptedActor};
    use crate::swarm::filter::FilterSpec;
    use crate::swarm::graph::GraphBuilder;

    fn diamond(
        a: Arc<ScriptedActor>,
        b: Arc<ScriptedActor>,
        c: Arc<ScriptedActor>,
        d: Arc<ScriptedActor>,
    ) -> Graph {
        GraphBuilder::new()
            .node(a as Arc<dyn Actor>)
            .node(b as Arc<dyn Actor>)
            .node(c as Arc<dyn Actor>)
            .node(d as Arc<dyn Actor>)
            .edge("A", "B")
            .edge("A", "C")
            .edge("B", "D")
            .edge("C", "D")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_diamond_fan_in_sees_both_branches() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let b = Arc::new(
            ScriptedActor::new("B", "")
                .reply("aero findings")
                .with_delay(Duration::from_millis(30)),
        );
        let c = Arc::new(ScriptedActor::new("C", "").reply("market findings"));
        let d = Arc::new(ScriptedActor::new("D", "").reply("summary"));
        let mut flow = GraphFlow::new(
            diamond(a.clone(), b.clone(), c.clone(), d.clone()),
            RunConfig::default(),
        );

        let outcome = flow.run("design a sporty SUV").await.unwrap();
        assert_eq!(outcome.stop_reason, StopReason::GraphComplete);
        assert_eq!(outcome.transcript.len(), 5);
        assert_eq!(outcome.transcript.last().unwrap().source, "D");

        let d_views = d.views();
        let d_view = &d_views[0];
        let d_sources: Vec<&str> = d_view.iter().map(|m| m.source.as_str()).collect();
        assert!(d_sources.contains(&"B"));
        assert!(d_sources.contains(&"C"));

        // B and C ran in the same wave, both after A
        assert_eq!(b.views()[0].len(), 2);
        assert_eq!(c.views()[0].len(), 2);
        for node in ["A", "B", "C", "D"] {
            assert_eq!(flow.node_state(node), Some(NodeState::Completed));
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_gap_free() {
        let root = Arc::new(ScriptedActor::new("root", "").reply("go"));
        let mut builder = GraphBuilder::new().node(root as Arc<dyn Actor>);
        let mut workers = Vec::new();
        for i in 0..6 {
            let name = format!("w{}", i);
            let worker = Arc::new(
                ScriptedActor::new(name.clone(), "")
                    .reply(format!("result {}", i))
                    .with_delay(Duration::from_millis(5 * (6 - i as u64))),
            );
            workers.push(worker.clone());
            builder = builder.node(worker as Arc<dyn Actor>).edge("root", name);
        }
        let mut flow = GraphFlow::new(builder.build().unwrap(), RunConfig::default());

        let outcome = flow.run("task").await.unwrap();
        let seqs: Vec<u64> = outcome.transcript.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, (0..8).collect::<Vec<u64>>());
        assert!(workers.iter().all(|w| w.calls() == 1));
    }

    #[tokio::test]
    async fn test_filtered_edges_build_fan_in_view() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let b = Arc::new(ScriptedActor::new("B", "").reply("from b"));
        let c = Arc::new(ScriptedActor::new("C", "").reply("from c"));
        let d = Arc::new(ScriptedActor::new("D", "").reply("done"));
        let graph = GraphBuilder::new()
            .node(a as Arc<dyn Actor>)
            .node(b as Arc<dyn Actor>)
            .node(c as Arc<dyn Actor>)
            .node(d.clone() as Arc<dyn Actor>)
            .edge("A", "B")
            .edge("A", "C")
            .filtered_edge("C", "D", FilterSpec::last("C", 1))
            .filtered_edge("B", "D", FilterSpec::last("B", 1))
            .build()
            .unwrap();
        let mut flow = GraphFlow::new(graph, RunConfig::default());

        flow.run("task").await.unwrap();
        let views = d.views();
        let view = &views[0];
        let contents: Vec<&str> = view.iter().filter_map(|m| m.content.as_text()).collect();
        // Edge declaration order, not transcript order
        assert_eq!(contents, vec!["from c", "from b"]);
    }

    #[tokio::test]
    async fn test_unfiltered_edge_in_mixed_fan_in_broadcasts() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("requirements"));
        let b = Arc::new(ScriptedActor::new("B", "").replies(["competitors"]));
        let d = Arc::new(ScriptedActor::new("D", "").reply("report"));
        let graph = GraphBuilder::new()
            .node(a as Arc<dyn Actor>)
            .node(b as Arc<dyn Actor>)
            .node(d.clone() as Arc<dyn Actor>)
            .edge("A", "B")
            .edge("A", "D")
            .filtered_edge("B", "D", FilterSpec::last("B", 1))
            .build()
            .unwrap();
        let mut flow = GraphFlow::new(graph, RunConfig::default());

        flow.run("design a sporty SUV").await.unwrap();
        let views = d.views();
        let sources: Vec<&str> = views[0].iter().map(|m| m.source.as_str()).collect();
        assert_eq!(sources, vec!["user", "A", "B"]);
        assert_eq!(views[0][0].content.as_text(), Some("design a sporty SUV"));
    }

    #[tokio::test]
    async fn test_termination_can_fire_on_task_message() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let graph = GraphBuilder::new()
            .node(a.clone() as Arc<dyn Actor>)
            .build()
            .unwrap();
        let config =
            RunConfig::default().with_termination(TerminationCondition::max_messages(1));
        let mut flow = GraphFlow::new(graph, config);

        let outcome = flow.run("task").await.unwrap();
        assert_eq!(
            outcome.stop_reason,
            StopReason::Condition("max_messages(1)".to_string())
        );
        assert_eq!(outcome.transcript.len(), 1);
        assert_eq!(a.calls(), 0);
        assert_eq!(flow.node_state("A"), Some(NodeState::Pending));
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let graph = GraphBuilder::new()
            .node(a.clone() as Arc<dyn Actor>)
            .build()
            .unwrap();
        let mut config = RunConfig::default();
        config.max_concurrency = 0;
        let mut flow = GraphFlow::new(graph, config);

        let failure = flow.run("task").await.unwrap_err();
        assert!(matches!(failure.error, OrchestrationError::InvalidConfig { .. }));
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_start_events_follow_permits() {
        let root = Arc::new(ScriptedActor::new("root", "").reply("go"));
        let mut builder = GraphBuilder::new().node(root as Arc<dyn Actor>);
        for i in 0..3 {
            let name = format!("w{}", i);
            let worker = ScriptedActor::new(name.clone(), "")
                .reply("done")
                .with_delay(Duration::from_millis(5));
            builder = builder.node(Arc::new(worker) as Arc<dyn Actor>).edge("root", name);
        }
        let mut config = RunConfig::default();
        config.max_concurrency = 1;
        let mut flow = GraphFlow::new(builder.build().unwrap(), config);

        let outcome = flow.run("task").await.unwrap();
        for node in ["root", "w0", "w1", "w2"] {
            let started = outcome
                .events
                .iter()
                .position(|e| e.kind == RunEventKind::ActorStarted && e.actor == node)
                .unwrap();
            let completed = outcome
                .events
                .iter()
                .position(|e| e.kind == RunEventKind::ActorCompleted && e.actor == node)
                .unwrap();
            assert!(started < completed, "{} completed before it started", node);
        }
        let starts = outcome
            .events
            .iter()
            .filter(|e| e.kind == RunEventKind::ActorStarted)
            .count();
        assert_eq!(starts, 4);
    }

    #[tokio::test]
    async fn test_termination_stops_flow_early() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("all settled. TERMINATE"));
        let b = Arc::new(ScriptedActor::new("B", "").reply("never"));
        let graph = GraphBuilder::new()
            .node(a as Arc<dyn Actor>)
            .node(b.clone() as Arc<dyn Actor>)
            .edge("A", "B")
            .build()
            .unwrap();
        let config =
            RunConfig::default().with_termination(TerminationCondition::text_mention("TERMINATE"));
        let mut flow = GraphFlow::new(graph, config);

        let outcome = flow.run("task").await.unwrap();
        assert!(matches!(outcome.stop_reason, StopReason::Condition(_)));
        assert_eq!(outcome.transcript.len(), 2);
        assert_eq!(b.calls(), 0);
        assert_eq!(flow.node_state("B"), Some(NodeState::Pending));
    }

    #[tokio::test]
    async fn test_branch_failure_halts_flow() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let b = Arc::new(ScriptedActor::new("B", "").fail("search quota exceeded"));
        let c = Arc::new(ScriptedActor::new("C", "").reply("fine"));
        let d = Arc::new(ScriptedActor::new("D", "").reply("unreached"));
        let mut flow = GraphFlow::new(diamond(a, b, c, d.clone()), RunConfig::default());

        let failure = flow.run("task").await.unwrap_err();
        assert!(matches!(
            failure.error,
            OrchestrationError::ActorExecutionFailure { ref actor, .. } if actor == "B"
        ));
        assert_eq!(d.calls(), 0);
        assert!(failure.transcript.len() >= 2);
        assert_eq!(failure.transcript.messages()[1].source, "A");
    }

    #[tokio::test]
    async fn test_cancel_before_wave() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let graph = GraphBuilder::new()
            .node(a.clone() as Arc<dyn Actor>)
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel(1);
        let mut flow = GraphFlow::new(graph, RunConfig::default()).with_command_channel(rx);
        tx.send(RunCommand::Cancel).await.unwrap();

        let failure = flow.run("task").await.unwrap_err();
        assert!(matches!(failure.error, OrchestrationError::Cancelled));
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_root_view_uses_actor_filter() {
        let a = Arc::new(ScriptedActor::new("A", "").reply("brief"));
        let graph = GraphBuilder::new()
            .node(a.clone() as Arc<dyn Actor>)
            .build()
            .unwrap();
        let config = RunConfig::default().with_actor_filter("A", FilterSpec::last("nobody", 1));
        let mut flow = GraphFlow::new(graph, config);

        flow.run("task").await.unwrap();
        assert!(a.views()[0].is_empty());
    }
}
