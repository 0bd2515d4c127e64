//! # Actor Graph
//!
//! Static directed acyclic graph of actor dependencies. Graphs are validated
//! when built: unknown nodes, cycles and nodes unreachable from every entry
//! point are rejected before any run can start.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::filter::FilterSpec;
use crate::actors::{Actor, ParticipantSet};
use crate::error::OrchestrationError;

/// Directed dependency `from → to`, with an optional view filter for `to`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub filter: Option<FilterSpec>,
}

/// Incrementally describes a graph
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Arc<dyn Actor>>,
    edges: Vec<Edge>,
    entry_points: Vec<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, actor: Arc<dyn Actor>) -> Self {
        self.nodes.push(actor);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            filter: None,
        });
        self
    }

    /// Edge whose target only sees the filtered messages through it
    pub fn filtered_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        filter: FilterSpec,
    ) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            filter: Some(filter),
        });
        self
    }

    /// Declare an entry point. Without any, nodes with no incoming edge are used.
    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points.push(name.into());
        self
    }

    /// Validate and freeze the graph
    pub fn build(self) -> Result<Graph, OrchestrationError> {
        let participants = ParticipantSet::new(self.nodes)?;

        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !participants.contains(end) {
                    return Err(OrchestrationError::GraphUnknownNode { node: end.clone() });
                }
            }
        }
        for entry in &self.entry_points {
            if !participants.contains(entry) {
                return Err(OrchestrationError::GraphUnknownNode {
                    node: entry.clone(),
                });
            }
        }

        let names: Vec<String> = participants.names().iter().map(|n| n.to_string()).collect();
        let order = topological_order(&names, &self.edges)?;

        let entry_points = if self.entry_points.is_empty() {
            names
                .iter()
                .filter(|n| !self.edges.iter().any(|e| &e.to == *n))
                .cloned()
                .collect()
        } else {
            self.entry_points
        };

        let reachable = reachable_from(&entry_points, &self.edges);
        if let Some(node) = names.iter().find(|n| !reachable.contains(n.as_str())) {
            return Err(OrchestrationError::GraphUnreachableNode { node: node.clone() });
        }

        Ok(Graph {
            participants,
            edges: self.edges,
            entry_points,
            order,
        })
    }
}

/// Kahn's algorithm; ties broken by roster order so the order is stable
fn topological_order(names: &[String], edges: &[Edge]) -> Result<Vec<String>, OrchestrationError> {
    let mut in_degree: HashMap<&str, usize> = names.iter().map(|n| (n.as_str(), 0)).collect();
    for edge in edges {
        if let Some(degree) = in_degree.get_mut(edge.to.as_str()) {
            *degree += 1;
        }
    }

    let mut order = Vec::with_capacity(names.len());
    let mut queue: VecDeque<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| in_degree[n] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        for edge in edges.iter().filter(|e| e.from == node) {
            if let Some(degree) = in_degree.get_mut(edge.to.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(edge.to.as_str());
                }
            }
        }
    }

    if order.len() < names.len() {
        let nodes = names
            .iter()
            .filter(|n| in_degree[n.as_str()] > 0)
            .cloned()
            .collect();
        return Err(OrchestrationError::GraphCycleDetected { nodes });
    }
    Ok(order)
}

fn reachable_from<'a>(entry_points: &'a [String], edges: &'a [Edge]) -> HashSet<&'a str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = entry_points.iter().map(String::as_str).collect();
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        for edge in edges.iter().filter(|e| e.from == node) {
            queue.push_back(edge.to.as_str());
        }
    }
    seen
}

/// A validated actor graph
#[derive(Debug, Clone)]
pub struct Graph {
    participants: ParticipantSet,
    edges: Vec<Edge>,
    entry_points: Vec<String>,
    order: Vec<String>,
}

impl Graph {
    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Nodes in a dependency-respecting order
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Incoming edges of `node`, in declaration order
    pub fn incoming(&self, node: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.to == node).collect()
    }

    pub fn actor(&self, node: &str) -> Option<&Arc<dyn Actor>> {
        self.participants.get(node)
    }
}
