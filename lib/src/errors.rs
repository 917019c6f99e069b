//! Error types shared by the engine, its transports and its codec.

use std::fmt;

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a valid IRI: {0}")]
    InvalidIri(String),
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{iri} is provided by several documents ({}); pass the exact document", .documents.join(", "))]
    Ambiguous { iri: String, documents: Vec<String> },
    #[error("failed to fetch {iri}: {source}")]
    Transport {
        iri: String,
        #[source]
        source: TransportError,
    },
    #[error("no parser available for {iri} (content type {content_type:?})")]
    Negotiation {
        iri: String,
        content_type: Option<String>,
    },
    #[error("failed to parse {iri}: {message}")]
    Parse { iri: String, message: String },
    #[error("graph of {iri} has {size} triples, limit is {limit}")]
    GraphTooLarge {
        iri: String,
        size: usize,
        limit: usize,
    },
    #[error("{0} has unsaved changes; save them before querying again (merging is not supported)")]
    UnsavedChanges(String),
    #[error("{0} has not been fetched yet")]
    NotProcessed(String),
    #[error("{iri} has recorded errors ({}); PUT not possible", .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))]
    DocumentHasErrors {
        iri: String,
        errors: Vec<DocumentError>,
    },
    #[error("attribute {attr} uses prefix {prefix:?} which is not bound in the document")]
    UnknownPrefix { attr: String, prefix: String },
    #[error("failed to serialize {iri}: {message}")]
    Serialize { iri: String, message: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`crate::transport::Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("timeout")]
    Timeout,
    #[error("content negotiation failed: {0}")]
    Negotiation(String),
    #[error("offline mode, refusing to contact {0}")]
    Offline(String),
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// A failure recorded on a [`crate::document::Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    Skipped,
    Status(u16),
    Timeout,
    Negotiation,
    Parse(String),
    Io(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DocumentError::Skipped => write!(f, "Skipped"),
            DocumentError::Status(code) => write!(f, "{}", code),
            DocumentError::Timeout => write!(f, "timeout"),
            DocumentError::Negotiation => write!(f, "ContentNegotiationError"),
            DocumentError::Parse(_) => write!(f, "ParserError"),
            DocumentError::Io(_) => write!(f, "IOError"),
        }
    }
}

impl From<&TransportError> for DocumentError {
    fn from(e: &TransportError) -> Self {
        match e {
            TransportError::Status(code) => DocumentError::Status(*code),
            TransportError::Timeout => DocumentError::Timeout,
            TransportError::Negotiation(_) => DocumentError::Negotiation,
            TransportError::Offline(iri) => DocumentError::Io(format!("offline: {iri}")),
            TransportError::Io(msg) => DocumentError::Io(msg.clone()),
        }
    }
}
