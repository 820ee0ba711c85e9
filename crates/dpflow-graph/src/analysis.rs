//! Read-only analyses over a built flow graph
//!
//! - Cycle detection: every simple cycle (Johnson's algorithm)
//! - Conflict detection: artifacts with more than one writer
//!
//! Neither analysis fails or mutates the graph. An empty graph has no findings.

use dpflow_core::{Diagnostic, DiagnosticCode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::graph::{FlowGraph, FlowNode, NodeIndex};

/// A simple cycle, as the ordered node list of the loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<FlowNode>,
}

impl Cycle {
    /// Node names in loop order
    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self, graph: &str) -> Diagnostic {
        let mut path = self.names();
        if let Some(first) = path.first().cloned() {
            path.push(first);
        }

        Diagnostic::new(
            DiagnosticCode::FlowCycle,
            Severity::Warn,
            format!(
                "Circular data dependency in {} flow graph: {}",
                graph,
                path.join(" -> ")
            ),
        )
        .with_graph(graph)
        .with_related(self.names())
    }
}

/// An artifact claimed by more than one writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteConflict {
    pub artifact: String,

    /// Writer file names, sorted
    pub writers: Vec<String>,
}

impl WriteConflict {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self, graph: &str) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::WriteConflict,
            Severity::Warn,
            format!(
                "Artifact '{}' is written by {} {} files: {}",
                self.artifact,
                self.writers.len(),
                graph,
                self.writers.join(", ")
            ),
        )
        .with_graph(graph)
        .with_related(self.writers.clone())
    }
}

/// Findings for one graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub cycles: Vec<Cycle>,
    pub conflicts: Vec<WriteConflict>,
}

impl Analysis {
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.conflicts.is_empty()
    }

    /// All findings as diagnostics, cycles first
    pub fn diagnostics(&self, graph: &str) -> Vec<Diagnostic> {
        self.cycles
            .iter()
            .map(|c| c.to_diagnostic(graph))
            .chain(self.conflicts.iter().map(|c| c.to_diagnostic(graph)))
            .collect()
    }
}

/// Run both analyses
pub fn analyze(graph: &FlowGraph) -> Analysis {
    Analysis {
        cycles: find_cycles(graph),
        conflicts: find_write_conflicts(graph),
    }
}

/// Every artifact with more than one distinct direct predecessor
pub fn find_write_conflicts(graph: &FlowGraph) -> Vec<WriteConflict> {
    (0..graph.node_count())
        .filter(|&idx| graph.node(idx).is_artifact())
        .filter(|&idx| graph.predecessors(idx).len() > 1)
        .map(|idx| {
            let mut writers: Vec<String> = graph
                .predecessors(idx)
                .iter()
                .map(|&w| graph.node(w).name.clone())
                .collect();
            writers.sort();

            WriteConflict {
                artifact: graph.node(idx).name.clone(),
                writers,
            }
        })
        .collect()
}

/// Every simple directed cycle, self-loops included
///
/// Each start node is searched only within the strongly connected part of
/// the nodes at or after it, so every cycle is reported once, rooted at its
/// lowest-index node.
pub fn find_cycles(graph: &FlowGraph) -> Vec<Cycle> {
    let mut found: Vec<Vec<NodeIndex>> = Vec::new();

    for start in 0..graph.node_count() {
        let component = component_of(graph, start);

        let mut search = CircuitSearch {
            graph,
            start,
            component,
            blocked: vec![false; graph.node_count()],
            blocked_by: vec![Vec::new(); graph.node_count()],
            stack: Vec::new(),
            found: &mut found,
        };
        search.run();
    }

    found
        .into_iter()
        .map(|path| Cycle {
            nodes: path.into_iter().map(|idx| graph.node(idx).clone()).collect(),
        })
        .collect()
}

/// Nodes `>= start` that lie on a cycle through `start` within that range
fn component_of(graph: &FlowGraph, start: NodeIndex) -> Vec<bool> {
    let forward = reachable(graph, start, move |idx| graph.successors(idx));
    let backward = reachable(graph, start, move |idx| graph.predecessors(idx));

    forward
        .iter()
        .zip(&backward)
        .map(|(&f, &b)| f && b)
        .collect()
}

/// BFS from `start`, never entering nodes below it
fn reachable<'g>(
    graph: &'g FlowGraph,
    start: NodeIndex,
    next: impl Fn(NodeIndex) -> &'g [NodeIndex],
) -> Vec<bool> {
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();

    visited[start] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for &neighbor in next(current) {
            if neighbor >= start && !visited[neighbor] {
                visited[neighbor] = true;
                queue.push_back(neighbor);
            }
        }
    }

    visited
}

/// Johnson's circuit search rooted at one start node
///
/// Runs on an explicit frame stack, so path length is bounded by memory and
/// not by the thread stack.
struct CircuitSearch<'g, 'f> {
    graph: &'g FlowGraph,
    start: NodeIndex,
    component: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<NodeIndex>>,
    stack: Vec<NodeIndex>,
    found: &'f mut Vec<Vec<NodeIndex>>,
}

/// One node on the current path
struct Frame {
    node: NodeIndex,

    /// Position in the node's successor list
    next: usize,

    /// Some cycle through `start` was closed below this node
    closed: bool,
}

impl CircuitSearch<'_, '_> {
    fn run(&mut self) {
        let graph = self.graph;
        let mut frames = vec![self.enter(self.start)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            let successors = graph.successors(v);

            if let Some(&w) = successors.get(frame.next) {
                frame.next += 1;

                if !self.component[w] {
                    continue;
                }

                if w == self.start {
                    self.found.push(self.stack.clone());
                    frame.closed = true;
                } else if !self.blocked[w] {
                    let child = self.enter(w);
                    frames.push(child);
                }
                continue;
            }

            let closed = frame.closed;
            frames.pop();

            if closed {
                self.unblock(v);
            } else {
                for &w in successors {
                    if self.component[w] && !self.blocked_by[w].contains(&v) {
                        self.blocked_by[w].push(v);
                    }
                }
            }

            self.stack.pop();

            if closed {
                if let Some(parent) = frames.last_mut() {
                    parent.closed = true;
                }
            }
        }
    }

    fn enter(&mut self, v: NodeIndex) -> Frame {
        self.stack.push(v);
        self.blocked[v] = true;

        Frame {
            node: v,
            next: 0,
            closed: false,
        }
    }

    fn unblock(&mut self, v: NodeIndex) {
        let mut pending = vec![v];

        while let Some(u) = pending.pop() {
            self.blocked[u] = false;

            for w in std::mem::take(&mut self.blocked_by[u]) {
                if self.blocked[w] {
                    pending.push(w);
                }
            }
        }
    }
}
