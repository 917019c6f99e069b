//! Rebuilds a document's triple set from its resources, and logs what changed between two
//! versions of a graph.

use crate::attr::attr_to_predicate;
use crate::codec::{ntriples_lines, PrefixTable};
use crate::errors::Result;
use crate::registry::ResourceRegistry;
use log::{info, log_enabled, Level};
use oxigraph::model::{Graph, Triple};
use std::collections::BTreeSet;

/// Triple set described by every resource owned by `document`. Attribute names are turned back
/// into predicates through `prefixes`.
pub fn document_graph(
    resources: &ResourceRegistry,
    document: &str,
    prefixes: &PrefixTable,
) -> Result<Graph> {
    let mut graph = Graph::new();
    for resource in resources.for_document(document) {
        let subject = resource.subject().to_node();
        for (name, value) in resource.attributes() {
            let predicate = attr_to_predicate(name, prefixes)?;
            for v in value.values() {
                graph.insert(&Triple::new(subject.clone(), predicate.clone(), v.to_term()));
            }
        }
    }
    Ok(graph)
}

/// Logs the canonical N-Triples lines that were removed (`-`) and added (`+`).
pub fn log_changes(iri: &str, old: &Graph, new: &Graph) {
    if !log_enabled!(Level::Info) {
        return;
    }
    let old: BTreeSet<String> = ntriples_lines(old).into_iter().collect();
    let new: BTreeSet<String> = ntriples_lines(new).into_iter().collect();
    info!("Changes in {}:", iri);
    for line in old.difference(&new) {
        info!("- {}", line);
    }
    for line in new.difference(&old) {
        info!("+ {}", line);
    }
}
