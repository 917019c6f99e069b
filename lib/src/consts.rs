//! Constant NamedNodeRefs for the RDF terms the engine treats specially, and the
//! namespace bindings every parsed document starts with.

use oxigraph::model::NamedNodeRef;

pub const IMPORTS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#imports");

/// Prefixes bound in every document unless the document rebinds them.
pub const DEFAULT_PREFIXES: [(&str, &str); 4] = [
    ("xml", "http://www.w3.org/XML/1998/namespace"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

pub const USER_AGENT: &str = concat!("ldsync-", env!("CARGO_PKG_VERSION"));
