//! Graphviz DOT serialization of flow graphs.

use std::fmt::Write;

use super::graph::FlowGraph;

/// Quote a DOT identifier.
fn quote(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for c in id.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Serialize a flow graph as a DOT digraph.
///
/// Nodes are identified by caption and emitted in row order, followed by
/// edges in insertion order.
pub fn to_dot(graph: &FlowGraph) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "digraph {} {{", quote(&format!("{} c{}", graph.unit(), graph.threshold())));
    for node in graph.nodes() {
        let _ = writeln!(
            out,
            "    {} [color={}, fillcolor={}, style={}];",
            quote(&node.caption),
            quote(&node.style.color),
            quote(&node.style.fillcolor),
            quote(&node.style.style),
        );
    }
    for (from, to) in graph.edges() {
        let _ = writeln!(out, "    {} -> {};", quote(from), quote(to));
    }
    out.push_str("}\n");
    out
}
