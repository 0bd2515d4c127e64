//! # Swarm Orchestration
//!
//! Coordinates multi-actor runs over a shared transcript.
//!
//! ## Run Modes
//!
//! ```text
//! Selector:   Task → select speaker → execute → append → check termination → …
//! Graph Flow: Task → roots ⇉ ready wave ⇉ … → fan-in → complete
//! ```

pub mod coordinator;
pub mod events;
pub mod execution;
pub mod filter;
pub mod graph;
pub mod graph_flow;
pub mod outcome;
pub mod selector;
pub mod termination;
pub mod turn;

pub use coordinator::SelectorCoordinator;
pub use events::{EventLog, RunEvent, RunEventKind, ORCHESTRATOR};
pub use execution::RunCommand;
pub use filter::{derive_view, FilterSpec, Position};
pub use graph::{Edge, Graph, GraphBuilder};
pub use graph_flow::{assemble_view, GraphFlow, NodeState};
pub use outcome::{RunOutcome, StopReason};
pub use selector::{
    parse_selection, render_selector_prompt, LlmSelector, RoundRobinSelector, ScriptedSelector,
    Selection, SelectorPolicy, DEFAULT_SELECTOR_PROMPT,
};
pub use termination::TerminationCondition;
pub use turn::{TurnStage, TurnState};
