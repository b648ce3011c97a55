//! Textual flow graph construction.
//!
//! One [`FlowGraph`] is built per (variant unit, threshold) from the witness
//! rows of the unit and the parent maps the dispatcher aggregated for them.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{Combination, ParentMap, Threshold, VariantUnit, WitnessId, WitnessRow};
use super::palette::NodeStyle;

/// Error type for graph construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    /// A witness other than the initial text has no ancestor while strict
    /// mode is on.
    #[error("Nodes with no parents - forest detected: {witness} at {unit} (connectivity {threshold})")]
    ForestDetected {
        /// Variant unit.
        unit: VariantUnit,
        /// Threshold being built.
        threshold: Threshold,
        /// The orphan witness.
        witness: WitnessId,
    },
}

/// A witness node in a flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Witness id.
    pub witness: WitnessId,
    /// Reading label attested by the witness.
    pub reading: String,
    /// Display caption; also the node identifier in rendered output.
    pub caption: String,
    /// Node styling.
    pub style: NodeStyle,
}

/// Build the caption of a witness node from its selection.
///
/// Candidates are shown by rank, e.g. `C/2 (a)` or `D/[A.1, B.3] (c)`.
pub fn caption(witness: &WitnessId, reading: &str, selection: &Combination) -> String {
    match selection.candidates() {
        [] => format!("{} ({})", witness, reading),
        [only] if only.rank == 1 => format!("{} ({})", witness, reading),
        [only] => format!("{}/{} ({})", witness, only.rank, reading),
        many => {
            let parts: Vec<String> = many
                .iter()
                .map(|c| format!("{}.{}", c.ancestor, c.rank))
                .collect();
            format!("{}/[{}] ({})", witness, parts.join(", "), reading)
        }
    }
}

/// Directed ancestor → descendant graph for one (unit, threshold).
#[derive(Debug, Clone)]
pub struct FlowGraph {
    unit: VariantUnit,
    threshold: Threshold,
    graph: DiGraph<FlowNode, ()>,
}

/// Order-independent view used for fingerprinting.
#[derive(Serialize)]
struct GraphSnapshot<'a> {
    unit: &'a VariantUnit,
    threshold: Threshold,
    nodes: Vec<&'a FlowNode>,
    edges: Vec<(&'a str, &'a str)>,
}

impl FlowGraph {
    /// Variant unit the graph belongs to.
    pub fn unit(&self) -> &VariantUnit {
        &self.unit
    }

    /// Threshold the graph was built at.
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion (row) order.
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.graph.node_weights()
    }

    /// Node identifiers (captions) in row order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes().map(|n| n.caption.as_str()).collect()
    }

    /// Edges as `(ancestor caption, descendant caption)` pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].caption.as_str(),
                    self.graph[e.target()].caption.as_str(),
                )
            })
            .collect()
    }

    /// Whether `ancestor` → `descendant` is an edge, by witness id.
    pub fn has_edge(&self, ancestor: &str, descendant: &str) -> bool {
        match (self.index_of(ancestor), self.index_of(descendant)) {
            (Some(a), Some(d)) => self.graph.contains_edge(a, d),
            _ => false,
        }
    }

    /// Caption of a witness node.
    pub fn caption_of(&self, witness: &str) -> Option<&str> {
        self.index_of(witness).map(|i| self.graph[i].caption.as_str())
    }

    /// Node of a witness.
    pub fn node(&self, witness: &str) -> Option<&FlowNode> {
        self.index_of(witness).map(|i| &self.graph[i])
    }

    /// Content fingerprint, independent of row and edge insertion order.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let mut nodes: Vec<&FlowNode> = self.nodes().collect();
        nodes.sort_by(|a, b| a.caption.cmp(&b.caption));
        let mut edges = self.edges();
        edges.sort_unstable();

        canonical_hash_hex(&GraphSnapshot {
            unit: &self.unit,
            threshold: self.threshold,
            nodes,
            edges,
        })
    }

    /// The underlying graph.
    pub fn inner(&self) -> &DiGraph<FlowNode, ()> {
        &self.graph
    }

    fn index_of(&self, witness: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&i| self.graph[i].witness.as_str() == witness)
    }
}

/// Builds flow graphs from resolved parent maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowGraphBuilder {
    perfect_only: bool,
}

impl FlowGraphBuilder {
    /// Create a builder. In strict (`perfect_only`) mode any orphan other than
    /// the initial text fails the build.
    pub fn new(perfect_only: bool) -> Self {
        Self { perfect_only }
    }

    /// Whether strict mode is on.
    pub fn perfect_only(&self) -> bool {
        self.perfect_only
    }

    /// Build the graph of `unit` at `threshold`.
    ///
    /// Witnesses with no parent map (failed resolution) are treated as having
    /// an empty selection.
    pub fn build(
        &self,
        unit: &VariantUnit,
        threshold: Threshold,
        rows: &[WitnessRow],
        parent_maps: &BTreeMap<WitnessId, ParentMap>,
    ) -> Result<FlowGraph, ForestError> {
        let empty = Combination::empty();
        let mut graph: DiGraph<FlowNode, ()> = DiGraph::with_capacity(rows.len(), rows.len());
        let mut index: BTreeMap<&WitnessId, NodeIndex> = BTreeMap::new();
        let mut selections: Vec<(NodeIndex, &Combination)> = Vec::with_capacity(rows.len());

        for row in rows {
            let selection = parent_maps
                .get(&row.witness)
                .and_then(|m| m.get(threshold))
                .unwrap_or(&empty);

            if selection.is_root() && !row.witness.is_initial_text() {
                if self.perfect_only {
                    return Err(ForestError::ForestDetected {
                        unit: unit.clone(),
                        threshold,
                        witness: row.witness.clone(),
                    });
                }
                tracing::warn!(
                    unit = %unit,
                    threshold = threshold.get(),
                    witness = %row.witness,
                    "{} has no parents",
                    row.witness
                );
            }

            // Captions stay as the witness id until every edge is in place
            let node = graph.add_node(FlowNode {
                witness: row.witness.clone(),
                reading: row.reading.clone(),
                caption: row.witness.to_string(),
                style: NodeStyle::for_reading(&row.reading),
            });
            index.insert(&row.witness, node);
            selections.push((node, selection));
        }

        for &(node, selection) in &selections {
            for ancestor in selection.ancestor_witnesses() {
                match index.get(ancestor) {
                    Some(&from) => {
                        graph.update_edge(from, node, ());
                    }
                    None => tracing::warn!(
                        unit = %unit,
                        threshold = threshold.get(),
                        witness = %graph[node].witness,
                        ancestor = %ancestor,
                        "Ancestor is not a witness of this unit, edge dropped"
                    ),
                }
            }
        }

        for (node, selection) in selections {
            let weight = &mut graph[node];
            weight.caption = caption(&weight.witness, &weight.reading, selection);
        }

        tracing::debug!(
            unit = %unit,
            threshold = threshold.get(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built textual flow graph"
        );

        Ok(FlowGraph {
            unit: unit.clone(),
            threshold,
            graph,
        })
    }
}
