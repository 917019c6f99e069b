//! Graph codec: turns bytes into a triple set plus prefix table and back, and
//! decides whether two triple sets are the same graph up to blank node labels.

use crate::consts::DEFAULT_PREFIXES;
use crate::errors::{Error, Result};
use log::debug;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::graph::CanonicalizationAlgorithm;
use oxigraph::model::{Graph, Triple, TripleRef};
use std::collections::BTreeMap;

/// Prefix table of a document: short prefix -> namespace IRI. The empty prefix is the default
/// namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTable {
    prefixes: BTreeMap<String, String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the prefixes every parsed document is bound to.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (prefix, namespace) in DEFAULT_PREFIXES {
            table.bind(prefix, namespace);
        }
        table
    }

    pub fn bind(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Reverse lookup: the prefix bound to `namespace`. When several prefixes share a namespace
    /// the alphabetically first one wins.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl<P: Into<String>, N: Into<String>> FromIterator<(P, N)> for PrefixTable {
    fn from_iter<T: IntoIterator<Item = (P, N)>>(iter: T) -> Self {
        let mut table = PrefixTable::new();
        for (p, n) in iter {
            table.bind(p, n);
        }
        table
    }
}

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedGraph {
    pub graph: Graph,
    pub prefixes: PrefixTable,
}

pub trait GraphCodec {
    /// Parses `bytes`, resolving relative IRIs (`<#me>`) against `base_iri`.
    fn parse(&self, bytes: &[u8], base_iri: &str, format: RdfFormat) -> Result<ParsedGraph>;

    fn serialize(&self, graph: &Graph, prefixes: &PrefixTable, format: RdfFormat)
        -> Result<Vec<u8>>;

    /// Equality up to a consistent renaming of blank nodes.
    fn isomorphic(&self, a: &Graph, b: &Graph) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OxigraphCodec;

impl GraphCodec for OxigraphCodec {
    fn parse(&self, bytes: &[u8], base_iri: &str, format: RdfFormat) -> Result<ParsedGraph> {
        let parse_error = |message: String| Error::Parse {
            iri: base_iri.to_string(),
            message,
        };
        let mut parser = RdfParser::from_format(format)
            .with_base_iri(base_iri)
            .map_err(|e| parse_error(e.to_string()))?
            .for_reader(bytes);
        let mut graph = Graph::new();
        for quad in parser.by_ref() {
            let quad = quad.map_err(|e| parse_error(e.to_string()))?;
            let triple = Triple::new(quad.subject, quad.predicate, quad.object);
            graph.insert(&triple);
        }
        let mut prefixes = PrefixTable::with_defaults();
        for (prefix, namespace) in parser.prefixes() {
            prefixes.bind(prefix, namespace);
        }
        debug!(
            "Parsed {} triples and {} prefixes from {}",
            graph.len(),
            prefixes.len(),
            base_iri
        );
        Ok(ParsedGraph { graph, prefixes })
    }

    fn serialize(
        &self,
        graph: &Graph,
        prefixes: &PrefixTable,
        format: RdfFormat,
    ) -> Result<Vec<u8>> {
        let serialize_error = |message: String| Error::Serialize {
            iri: String::new(),
            message,
        };
        let mut serializer = RdfSerializer::from_format(format);
        for (prefix, namespace) in prefixes.iter() {
            // xml is implicit in every serialization and may not be redeclared
            if prefix == "xml" {
                continue;
            }
            serializer = serializer
                .with_prefix(prefix, namespace)
                .map_err(|e| serialize_error(e.to_string()))?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in graph.iter() {
            writer.serialize_triple(triple)?;
        }
        Ok(writer.finish()?)
    }

    fn isomorphic(&self, a: &Graph, b: &Graph) -> bool {
        if a.len() != b.len() {
            return false;
        }
        canonical(a) == canonical(b)
    }
}

/// Copy of `graph` with canonical blank node labels.
pub fn canonical(graph: &Graph) -> Graph {
    let mut graph = graph.clone();
    graph.canonicalize(CanonicalizationAlgorithm::Unstable);
    graph
}

/// Sorted N-Triples lines of the canonical form of `graph`.
pub fn ntriples_lines(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = canonical(graph)
        .iter()
        .map(|t: TripleRef<'_>| format!("{} .", t))
        .collect();
    lines.sort();
    lines
}
