//! Graphviz DOT rendering of flow graphs

use dpflow_graph::{FlowGraph, FlowNode, NodeKind};
use std::fmt::Write;

const FILE_COLOR: &str = "#ffc0cb";
const ARTIFACT_COLOR: &str = "#87cefa";

/// Render a flow graph as a DOT digraph.
///
/// Files are pink boxes, artifacts light-blue ellipses. Output order follows
/// the graph's node and edge sets, so equal graphs render identically.
pub fn to_dot(graph: &FlowGraph) -> String {
    let mut dot = String::new();

    let _ = writeln!(dot, "digraph \"{}\" {{", graph.group());
    dot.push_str("    rankdir=LR;\n");

    for node in graph.node_set() {
        let _ = writeln!(dot, "    {} [{}];", node_id(&node), node_attrs(&node));
    }

    for (from, to) in graph.edge_set() {
        let _ = writeln!(dot, "    {} -> {};", node_id(&from), node_id(&to));
    }

    dot.push_str("}\n");
    dot
}

// Kind-prefixed so a file and an artifact with equal names stay distinct
fn node_id(node: &FlowNode) -> String {
    let prefix = match node.kind {
        NodeKind::File => "file",
        NodeKind::Artifact => "artifact",
    };
    format!("\"{}:{}\"", prefix, escape(&node.name))
}

fn node_attrs(node: &FlowNode) -> String {
    let label = escape(&node.name);
    match node.kind {
        NodeKind::File => format!(
            "label=\"{}\", shape=box, style=filled, fillcolor=\"{}\"",
            label, FILE_COLOR
        ),
        NodeKind::Artifact => format!(
            "label=\"{}\", style=filled, fillcolor=\"{}\"",
            label, ARTIFACT_COLOR
        ),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpflow_core::DialectGroup;

    #[test]
    fn renders_nodes_and_edges() {
        let mut graph = FlowGraph::new(DialectGroup::Python);
        graph.add_read("process1.py", "a.csv");
        graph.add_write("process1.py", "c.csv");

        let dot = to_dot(&graph);

        assert!(dot.starts_with("digraph \"python\" {"));
        assert!(dot.contains("\"file:process1.py\" [label=\"process1.py\", shape=box"));
        assert!(dot.contains("\"artifact:a.csv\" [label=\"a.csv\", style=filled"));
        assert!(dot.contains("\"artifact:a.csv\" -> \"file:process1.py\";"));
        assert!(dot.contains("\"file:process1.py\" -> \"artifact:c.csv\";"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn same_name_file_and_artifact_are_separate() {
        let mut graph = FlowGraph::new(DialectGroup::Sql);
        graph.add_write("daily", "daily");

        let dot = to_dot(&graph);
        assert!(dot.contains("\"file:daily\" -> \"artifact:daily\";"));
    }

    #[test]
    fn quotes_are_escaped() {
        let mut graph = FlowGraph::new(DialectGroup::Sql);
        graph.add_write("odd.sql", "weird\"name");

        let dot = to_dot(&graph);
        assert!(dot.contains("weird\\\"name"));
    }

    #[test]
    fn empty_graph_is_valid() {
        let graph = FlowGraph::new(DialectGroup::Sql);
        assert_eq!(to_dot(&graph), "digraph \"sql\" {\n    rankdir=LR;\n}\n");
    }
}
