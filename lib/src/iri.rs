//! IRI helpers: validation, hash-to-slash canonicalization, and the identity
//! types used as registry keys.

use crate::errors::{Error, Result};
use oxigraph::model::{BlankNode, NamedNode, NamedOrBlankNode, NamedOrBlankNodeRef};
use std::fmt;
use url::Url;

/// Returns `true` for absolute `http`/`https` IRIs.
pub fn is_valid_url(iri: &str) -> bool {
    match Url::parse(iri) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Converts a hash IRI into its slash form (http://www.w3.org/wiki/HashURI):
/// everything from the first `#` on is dropped. Only http(s) IRIs have a slash form.
pub fn slash_iri(iri: &str) -> Result<String> {
    if iri.is_empty() {
        return Err(Error::InvalidIri("an empty IRI is not valid".to_string()));
    }
    if !is_valid_url(iri) {
        return Err(Error::InvalidIri(iri.to_string()));
    }
    let stripped = match iri.find('#') {
        Some(idx) => &iri[..idx],
        None => iri,
    };
    Ok(stripped.to_string())
}

pub fn has_fragment(iri: &str) -> bool {
    iri.contains('#')
}

/// Subject half of a resource's identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubjectId {
    Blank(String),
    Iri(String),
}

impl SubjectId {
    /// Parses a caller-supplied subject. `_:x` is a blank node, `#x` is resolved against `base`,
    /// anything else must be an absolute IRI.
    pub fn parse(uri: &str, base: &str) -> Result<Self> {
        if uri.is_empty() {
            return Err(Error::InvalidIri("an empty IRI is not valid".to_string()));
        }
        if let Some(id) = uri.strip_prefix("_:") {
            return BlankNode::new(id)
                .map(|b| SubjectId::Blank(b.as_str().to_string()))
                .map_err(|_| Error::InvalidIri(uri.to_string()));
        }
        let absolute = if uri.starts_with('#') {
            format!("{}{}", base, uri)
        } else {
            uri.to_string()
        };
        NamedNode::new(absolute.as_str())
            .map(|n| SubjectId::Iri(n.into_string()))
            .map_err(|_| Error::InvalidIri(uri.to_string()))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, SubjectId::Blank(_))
    }

    pub fn iri(&self) -> Option<&str> {
        match self {
            SubjectId::Iri(iri) => Some(iri),
            SubjectId::Blank(_) => None,
        }
    }

    pub fn to_node(&self) -> NamedOrBlankNode {
        match self {
            SubjectId::Iri(iri) => NamedNode::new_unchecked(iri.clone()).into(),
            SubjectId::Blank(id) => BlankNode::new_unchecked(id.clone()).into(),
        }
    }
}

impl From<NamedOrBlankNodeRef<'_>> for SubjectId {
    fn from(node: NamedOrBlankNodeRef<'_>) -> Self {
        match node {
            NamedOrBlankNodeRef::NamedNode(n) => SubjectId::Iri(n.as_str().to_string()),
            NamedOrBlankNodeRef::BlankNode(b) => SubjectId::Blank(b.as_str().to_string()),
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Iri(iri) => write!(f, "<{}>", iri),
            SubjectId::Blank(id) => write!(f, "_:{}", id),
        }
    }
}

/// Composite identity of a resource: owning document plus subject.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub document: String,
    pub subject: SubjectId,
}

impl ResourceKey {
    pub fn new(document: impl Into<String>, subject: SubjectId) -> Self {
        ResourceKey {
            document: document.into(),
            subject,
        }
    }

    /// Smallest key owned by `document`; used as the lower bound of range scans.
    pub(crate) fn first_of(document: &str) -> Self {
        ResourceKey {
            document: document.to_string(),
            subject: SubjectId::Blank(String::new()),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.subject, self.document)
    }
}
