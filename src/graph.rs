// src/graph.rs
use eyre::Result;
use petgraph::dot::Dot;
use petgraph::graph::NodeIndex;
use petgraph::Graph;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::models::Edge;

/// Node weight in the rendered graph. The origin flag marks the address the
/// crawl started from so the renderer can color it apart.
pub struct AddressNode {
    pub addr: String,
    pub origin: bool,
}

impl fmt::Debug for AddressNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.origin {
            write!(f, "{} (origin)", self.addr)
        } else {
            write!(f, "{}", self.addr)
        }
    }
}

pub struct EdgeWeight {
    pub btc: Decimal,
}

impl fmt::Debug for EdgeWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BTC", self.btc)
    }
}

/// Build a directed multigraph from an edge list. Nodes are deduplicated by
/// address; parallel edges and self-loops are kept.
pub fn build_graph(edges: &[Edge], origin: Option<&str>) -> Graph<AddressNode, EdgeWeight> {
    let mut g = Graph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    for edge in edges {
        let from = *indices.entry(edge.sender.clone()).or_insert_with(|| {
            g.add_node(AddressNode {
                addr: edge.sender.clone(),
                origin: origin == Some(edge.sender.as_str()),
            })
        });
        let to = *indices.entry(edge.receiver.clone()).or_insert_with(|| {
            g.add_node(AddressNode {
                addr: edge.receiver.clone(),
                origin: origin == Some(edge.receiver.as_str()),
            })
        });
        g.add_edge(
            from,
            to,
            EdgeWeight {
                btc: edge.received_btc(),
            },
        );
    }
    g
}

/// Graphviz DOT text, the hand-off format to the rendering side.
pub fn to_dot(edges: &[Edge], origin: Option<&str>) -> String {
    let g = build_graph(edges, origin);
    format!("{:?}", Dot::new(&g))
}

pub fn write_dot(path: &Path, edges: &[Edge], origin: Option<&str>) -> Result<()> {
    fs::write(path, to_dot(edges, origin))?;
    Ok(())
}

/// The address involved in the most edges, with its edge count. Used for the
/// block summary line.
pub fn most_active(edges: &[Edge]) -> Option<(String, usize)> {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for edge in edges {
        *degree.entry(&edge.sender).or_default() += 1;
        *degree.entry(&edge.receiver).or_default() += 1;
    }
    degree
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(addr, n)| (addr.to_string(), n))
}
