//! Attribute codec: maps predicate IRIs to flat attribute names (`foaf_name`) using a
//! document's prefix table, and back.
//!
//! Two distinct predicates can decode to the same attribute name (for example when a
//! prefix itself contains `_`). Their values then share one attribute; this is a known
//! gap and is kept as is.

use crate::codec::PrefixTable;
use crate::errors::{Error, Result};
use log::{error, warn};
use oxigraph::model::NamedNode;

/// Splits an IRI into namespace and local name. The local name is the longest suffix
/// that starts with a letter or `_` and continues with name characters.
pub fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let is_name_char = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.';
    let boundary = iri
        .char_indices()
        .rev()
        .find(|(_, c)| !is_name_char(*c))
        .map(|(i, c)| i + c.len_utf8())?;
    let tail = &iri[boundary..];
    let start = tail
        .char_indices()
        .find(|(_, c)| c.is_alphabetic() || *c == '_')
        .map(|(i, _)| boundary + i)?;
    let (namespace, local) = iri.split_at(start);
    if namespace.is_empty() || local.is_empty() {
        return None;
    }
    Some((namespace, local))
}

/// Attribute name for `predicate`. Falls back to the full predicate IRI when its namespace
/// has no prefix in `prefixes`.
pub fn predicate_to_attr(predicate: &NamedNode, prefixes: &PrefixTable) -> String {
    let iri = predicate.as_str();
    let Some((namespace, local)) = split_iri(iri) else {
        warn!("{} cannot be split into namespace and name", iri);
        return iri.to_string();
    };
    match prefixes.prefix_for(namespace) {
        None => {
            warn!("{} cannot be shortened", iri);
            iri.to_string()
        }
        Some("") => local.to_string(),
        Some(prefix) => format!("{}_{}", prefix, local),
    }
}

/// Predicate IRI for an attribute name produced by [`predicate_to_attr`].
pub fn attr_to_predicate(attr: &str, prefixes: &PrefixTable) -> Result<NamedNode> {
    // unshortened predicates are stored as full IRIs
    if attr.contains(':') {
        return NamedNode::new(attr).map_err(|_| Error::InvalidIri(attr.to_string()));
    }

    let parts: Vec<&str> = attr.split('_').collect();
    // longest bound prefix first: wgs84_pos_lat is wgs84_pos + lat, not wgs84 + pos_lat
    let bound = (1..parts.len())
        .rev()
        .map(|n| (parts[..n].join("_"), n))
        .find(|(prefix, _)| prefixes.contains_prefix(prefix));
    let (prefix, local) = match bound {
        Some((prefix, n)) => (prefix, parts[n..].join("_")),
        // "homepage" belongs to the default namespace
        None if parts.len() == 1 => (String::new(), parts[0].to_string()),
        None => (parts[0].to_string(), parts[1..].join("_")),
    };

    if local.is_empty() {
        return Err(Error::InvalidIri(attr.to_string()));
    }

    let iri = match prefixes.namespace(&prefix) {
        Some(namespace) => format!("{}{}", namespace, local),
        None => match prefixes.namespace("") {
            // the default namespace may itself hold names with underscores (mbox_sha1sum)
            Some(default) => {
                error!("prefix {:?} of {} is not bound; using the default namespace", prefix, attr);
                format!("{}{}", default, attr)
            }
            None => {
                return Err(Error::UnknownPrefix {
                    attr: attr.to_string(),
                    prefix,
                })
            }
        },
    };
    NamedNode::new(iri.as_str()).map_err(|_| Error::InvalidIri(iri))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PrefixTable {
        [
            ("foaf", "http://xmlns.com/foaf/0.1/"),
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("wgs84_pos", "http://www.w3.org/2003/01/geo/wgs84_pos#"),
            ("wgs84", "http://example.org/wgs84/"),
        ]
        .into_iter()
        .collect()
    }

    fn nn(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    #[test]
    fn split_on_hash_and_slash() {
        assert_eq!(
            split_iri("http://xmlns.com/foaf/0.1/name"),
            Some(("http://xmlns.com/foaf/0.1/", "name"))
        );
        assert_eq!(
            split_iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            Some(("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "type"))
        );
        assert_eq!(
            split_iri("http://example.org/voc/_2nd"),
            Some(("http://example.org/voc/", "_2nd"))
        );
        assert_eq!(split_iri("http://example.org/"), None);
    }

    #[test]
    fn predicate_to_attr_uses_prefixes() {
        let t = table();
        assert_eq!(
            predicate_to_attr(&nn("http://xmlns.com/foaf/0.1/name"), &t),
            "foaf_name"
        );
        assert_eq!(
            predicate_to_attr(&nn("http://www.w3.org/2003/01/geo/wgs84_pos#lat"), &t),
            "wgs84_pos_lat"
        );
        assert_eq!(
            predicate_to_attr(&nn("http://unbound.org/ns#thing"), &t),
            "http://unbound.org/ns#thing"
        );
    }

    #[test]
    fn default_prefix_is_bare_name() {
        let mut t = table();
        t.bind("", "http://example.org/voc#");
        assert_eq!(
            predicate_to_attr(&nn("http://example.org/voc#homepage"), &t),
            "homepage"
        );
        assert_eq!(
            attr_to_predicate("homepage", &t).unwrap(),
            nn("http://example.org/voc#homepage")
        );
    }

    #[test]
    fn attr_to_predicate_prefers_longest_prefix() {
        let t = table();
        assert_eq!(
            attr_to_predicate("wgs84_pos_lat", &t).unwrap(),
            nn("http://www.w3.org/2003/01/geo/wgs84_pos#lat")
        );
        assert_eq!(
            attr_to_predicate("wgs84_alt", &t).unwrap(),
            nn("http://example.org/wgs84/alt")
        );
        assert_eq!(
            attr_to_predicate("foaf_mbox_sha1sum", &t).unwrap(),
            nn("http://xmlns.com/foaf/0.1/mbox_sha1sum")
        );
        assert_eq!(
            attr_to_predicate("http://unbound.org/ns#thing", &t).unwrap(),
            nn("http://unbound.org/ns#thing")
        );
    }

    #[test]
    fn unbound_prefix_falls_back_to_default_namespace() {
        let mut t = table();
        t.bind("", "http://xmlns.com/foaf/0.1/");
        assert_eq!(
            attr_to_predicate("mbox_sha1sum", &t).unwrap(),
            nn("http://xmlns.com/foaf/0.1/mbox_sha1sum")
        );
    }

    #[test]
    fn prefix_with_several_underscores() {
        let mut t = table();
        t.bind("geo_pos_ns", "http://ex.org/g#");
        let lat = nn("http://ex.org/g#lat");
        let attr = predicate_to_attr(&lat, &t);
        assert_eq!(attr, "geo_pos_ns_lat");
        assert_eq!(attr_to_predicate(&attr, &t).unwrap(), lat);
        assert_eq!(
            attr_to_predicate("geo_pos_ns_lat_long", &t).unwrap(),
            nn("http://ex.org/g#lat_long")
        );
    }

    #[test]
    fn unbound_prefix_without_default_fails() {
        let t = table();
        assert!(matches!(
            attr_to_predicate("dc_title", &t),
            Err(Error::UnknownPrefix { .. })
        ));
        assert!(attr_to_predicate("homepage", &t).is_err());
    }
}
