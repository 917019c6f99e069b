//! Provenance of crawled documents: which document led to which.

use petgraph::graph::{Graph as DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// How a document was reached from another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    /// Object of a followed predicate.
    Link,
    /// Target of an eager `owl:imports`.
    Import,
}

/// Directed graph over document IRIs; an edge `a -> b` means distributing `a` discovered `b`.
#[derive(Debug, Default)]
pub struct DiscoveryGraph {
    graph: DiGraph<String, DiscoveryKind, petgraph::Directed>,
    nodes: HashMap<String, NodeIndex>,
}

impl DiscoveryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, iri: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(iri) {
            return *idx;
        }
        let idx = self.graph.add_node(iri.to_string());
        self.nodes.insert(iri.to_string(), idx);
        idx
    }

    /// Records that `from` led to `to`. Repeated edges are stored once.
    pub fn record(&mut self, from: &str, to: &str, kind: DiscoveryKind) {
        let a = self.node(from);
        let b = self.node(to);
        if !self
            .graph
            .edges_connecting(a, b)
            .any(|e| *e.weight() == kind)
        {
            self.graph.add_edge(a, b, kind);
        }
    }

    /// Documents discovered while distributing `iri`.
    pub fn discovered_from(&self, iri: &str) -> Vec<String> {
        self.neighbors(iri, Direction::Outgoing)
    }

    /// Documents whose distribution discovered `iri`.
    pub fn discovered_by(&self, iri: &str) -> Vec<String> {
        self.neighbors(iri, Direction::Incoming)
    }

    fn neighbors(&self, iri: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.nodes.get(iri) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|e| match direction {
                Direction::Outgoing => self.graph[e.target()].clone(),
                Direction::Incoming => self.graph[e.source()].clone(),
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Chain of documents from a crawl root down to `iri`, following the first recorded
    /// discoverer at every step.
    pub fn path_to(&self, iri: &str) -> Vec<String> {
        let mut path = vec![iri.to_string()];
        let mut seen = HashSet::new();
        seen.insert(iri.to_string());
        let mut current = self.nodes.get(iri).copied();
        while let Some(idx) = current {
            current = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .map(|e| e.source())
                .min()
                .filter(|src| seen.insert(self.graph[*src].clone()));
            if let Some(src) = current {
                path.push(self.graph[src].clone());
            }
        }
        path.reverse();
        path
    }

    pub fn graph(&self) -> &DiGraph<String, DiscoveryKind, petgraph::Directed> {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }
}
