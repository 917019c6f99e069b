//! Pluggable GET/PUT capability behind every document.

mod file;
mod http;
mod memory;

pub use file::FileTransport;
pub use http::{HttpOptions, HttpTransport};
pub use memory::{MemorySite, MemoryTransport, SiteTransport};

use crate::errors::TransportError;
use oxigraph::io::RdfFormat;

/// Bytes moved by a transport plus the format they are in.
#[derive(Debug, Clone)]
pub struct Payload {
    pub bytes: Vec<u8>,
    /// `None` when no RDF format could be negotiated.
    pub format: Option<RdfFormat>,
    pub content_type: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>, format: RdfFormat) -> Self {
        Payload {
            bytes: bytes.into(),
            format: Some(format),
            content_type: Some(format.media_type().to_string()),
        }
    }

    /// Content whose media type maps to no RDF format.
    pub fn unnegotiated(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Payload {
            bytes: bytes.into(),
            format: None,
            content_type: Some(content_type.into()),
        }
    }
}

pub trait Transport {
    fn fetch(&mut self, iri: &str) -> Result<Payload, TransportError>;
    fn store(&mut self, iri: &str, payload: &Payload) -> Result<(), TransportError>;
    /// Short name for display ("HttpTransport", ...).
    fn name(&self) -> &'static str;
    /// Restores the content replaced by the last `store`. Returns false when the transport
    /// keeps no previous version.
    fn revert(&mut self) -> Result<bool, TransportError> {
        Ok(false)
    }
}

/// Creates the transport for a document that was created without one.
pub type TransportFactory = Box<dyn Fn(&str) -> Box<dyn Transport>>;
