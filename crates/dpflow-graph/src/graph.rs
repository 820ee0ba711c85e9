//! Flow graph: file and artifact nodes joined by read/write edges
//!
//! `Artifact -> File` means the file reads the artifact,
//! `File -> Artifact` means the file writes it. Node and edge insertion are
//! idempotent, so the final content does not depend on insertion order.

use dpflow_core::{DialectGroup, GraphStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Node role, also the visual role marker for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A scanned source file
    File,

    /// A data artifact (file name or table name)
    Artifact,
}

/// A node identity. File and artifact nodes never collide, even with equal names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowNode {
    pub kind: NodeKind,
    pub name: String,
}

impl FlowNode {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::File,
            name: name.into(),
        }
    }

    pub fn artifact(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Artifact,
            name: name.into(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_artifact(&self) -> bool {
        self.kind == NodeKind::Artifact
    }
}

impl std::fmt::Display for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Position of a node in its graph
pub type NodeIndex = usize;

/// Directed flow graph for one dialect group
#[derive(Debug, Clone)]
pub struct FlowGraph {
    group: DialectGroup,

    /// Nodes in insertion order
    nodes: Vec<FlowNode>,

    /// Node identity -> index
    index: HashMap<FlowNode, NodeIndex>,

    /// Outgoing edges per node
    successors: Vec<Vec<NodeIndex>>,

    /// Incoming edges per node
    predecessors: Vec<Vec<NodeIndex>>,

    /// Edges in insertion order
    edges: Vec<(NodeIndex, NodeIndex)>,

    edge_lookup: HashSet<(NodeIndex, NodeIndex)>,
}

impl FlowGraph {
    /// Create an empty graph
    pub fn new(group: DialectGroup) -> Self {
        Self {
            group,
            nodes: Vec::new(),
            index: HashMap::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            edges: Vec::new(),
            edge_lookup: HashSet::new(),
        }
    }

    /// Dialect group this graph was built for
    pub fn group(&self) -> DialectGroup {
        self.group
    }

    /// Insert a node, or return the existing one with the same identity
    pub fn add_node(&mut self, node: FlowNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }

        let idx = self.nodes.len();
        self.index.insert(node.clone(), idx);
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        idx
    }

    /// Insert a file node
    pub fn add_file(&mut self, name: impl Into<String>) -> NodeIndex {
        self.add_node(FlowNode::file(name))
    }

    /// Insert an artifact node
    pub fn add_artifact(&mut self, name: impl Into<String>) -> NodeIndex {
        self.add_node(FlowNode::artifact(name))
    }

    /// Record that `file` reads `artifact`. Returns false if already present.
    pub fn add_read(&mut self, file: &str, artifact: &str) -> bool {
        let file = self.add_file(file);
        let artifact = self.add_artifact(artifact);
        self.add_edge(artifact, file)
    }

    /// Record that `file` writes `artifact`. Returns false if already present.
    pub fn add_write(&mut self, file: &str, artifact: &str) -> bool {
        let file = self.add_file(file);
        let artifact = self.add_artifact(artifact);
        self.add_edge(file, artifact)
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if !self.edge_lookup.insert((from, to)) {
            return false;
        }

        self.edges.push((from, to));
        self.successors[from].push(to);
        self.predecessors[to].push(from);
        true
    }

    /// Node at an index
    pub fn node(&self, idx: NodeIndex) -> &FlowNode {
        &self.nodes[idx]
    }

    /// Look up a node by identity
    pub fn find(&self, kind: NodeKind, name: &str) -> Option<NodeIndex> {
        self.index
            .get(&FlowNode {
                kind,
                name: name.to_string(),
            })
            .copied()
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    /// All edges as node pairs, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&FlowNode, &FlowNode)> + '_ {
        self.edges
            .iter()
            .map(|&(from, to)| (&self.nodes[from], &self.nodes[to]))
    }

    /// Direct successors of a node
    pub fn successors(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.successors[idx]
    }

    /// Direct predecessors of a node
    pub fn predecessors(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.predecessors[idx]
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edge_lookup.contains(&(from, to))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_file()).count()
    }

    pub fn artifact_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_artifact()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Order-independent view of the node set
    pub fn node_set(&self) -> BTreeSet<FlowNode> {
        self.nodes.iter().cloned().collect()
    }

    /// Order-independent view of the edge set
    pub fn edge_set(&self) -> BTreeSet<(FlowNode, FlowNode)> {
        self.edges()
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect()
    }

    /// Size summary for reports
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            graph: self.group.to_string(),
            files: self.file_count(),
            artifacts: self.artifact_count(),
            edges: self.edge_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_is_idempotent() {
        let mut graph = FlowGraph::new(DialectGroup::Python);

        assert!(graph.add_read("job.py", "in.csv"));
        assert!(!graph.add_read("job.py", "in.csv"));
        assert!(!graph.add_read("job.py", "in.csv"));
        assert!(graph.add_write("job.py", "out.csv"));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.file_count(), 1);
        assert_eq!(graph.artifact_count(), 2);
    }

    #[test]
    fn edge_direction_encodes_role() {
        let mut graph = FlowGraph::new(DialectGroup::Sql);
        graph.add_read("q.sql", "src");
        graph.add_write("q.sql", "dst");

        let file = graph.find(NodeKind::File, "q.sql").unwrap();
        let src = graph.find(NodeKind::Artifact, "src").unwrap();
        let dst = graph.find(NodeKind::Artifact, "dst").unwrap();

        assert!(graph.has_edge(src, file));
        assert!(graph.has_edge(file, dst));
        assert_eq!(graph.predecessors(file), &[src]);
        assert_eq!(graph.successors(file), &[dst]);
    }

    #[test]
    fn kinds_are_disjoint() {
        let mut graph = FlowGraph::new(DialectGroup::Python);
        graph.add_file("gen.py");
        graph.add_write("make.py", "gen.py");

        assert!(graph.find(NodeKind::File, "gen.py").is_some());
        assert!(graph.find(NodeKind::Artifact, "gen.py").is_some());
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn read_and_write_of_same_artifact_are_both_kept() {
        let mut graph = FlowGraph::new(DialectGroup::Python);
        graph.add_read("append.py", "log.csv");
        graph.add_write("append.py", "log.csv");
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn stats_reflect_content() {
        let mut graph = FlowGraph::new(DialectGroup::Python);
        graph.add_read("a.py", "x.csv");
        graph.add_write("a.py", "y.csv");

        let stats = graph.stats();
        assert_eq!(stats.graph, "python");
        assert_eq!((stats.files, stats.artifacts, stats.edges), (1, 2, 2));
    }
}
