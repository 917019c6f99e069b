use super::{Payload, Transport, TransportFactory};
use crate::errors::TransportError;
use oxigraph::io::RdfFormat;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Holds one document in memory; PUT replaces it.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    data: Vec<u8>,
    format: RdfFormat,
}

impl MemoryTransport {
    pub fn new(data: impl Into<Vec<u8>>, format: RdfFormat) -> Self {
        MemoryTransport {
            data: data.into(),
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Transport for MemoryTransport {
    fn fetch(&mut self, _iri: &str) -> Result<Payload, TransportError> {
        Ok(Payload::new(self.data.clone(), self.format))
    }

    fn store(&mut self, _iri: &str, payload: &Payload) -> Result<(), TransportError> {
        self.data = payload.bytes.clone();
        if let Some(format) = payload.format {
            self.format = format;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemoryTransport"
    }
}

/// Outcome the site gives for one IRI.
#[derive(Debug, Clone)]
enum Entry {
    Content(Payload),
    Status(u16),
}

/// A shared in-memory web: IRI -> content. Every transport created from the same site sees
/// the same contents, so remote changes can be simulated between fetches.
#[derive(Debug, Clone, Default)]
pub struct MemorySite {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    fetches: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, iri: &str, content: impl Into<Vec<u8>>, format: RdfFormat) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(iri.to_string(), Entry::Content(Payload::new(content, format)));
        }
    }

    /// Serves `content` under a media type no parser is registered for.
    pub fn publish_unnegotiated(&self, iri: &str, content: impl Into<Vec<u8>>, content_type: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                iri.to_string(),
                Entry::Content(Payload::unnegotiated(content, content_type)),
            );
        }
    }

    /// Makes `iri` answer with an HTTP error status.
    pub fn fail_with(&self, iri: &str, status: u16) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(iri.to_string(), Entry::Status(status));
        }
    }

    /// Current content of `iri`, if any.
    pub fn content(&self, iri: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().ok()?;
        match entries.get(iri) {
            Some(Entry::Content(p)) => Some(p.bytes.clone()),
            _ => None,
        }
    }

    /// Number of fetches `iri` has received.
    pub fn fetch_count(&self, iri: &str) -> usize {
        self.fetches
            .lock()
            .map(|f| f.get(iri).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn transport(&self) -> SiteTransport {
        SiteTransport { site: self.clone() }
    }

    /// Factory handing every new document a transport onto this site.
    pub fn factory(&self) -> TransportFactory {
        let site = self.clone();
        Box::new(move |_iri: &str| Box::new(site.transport()) as Box<dyn Transport>)
    }
}

pub struct SiteTransport {
    site: MemorySite,
}

impl Transport for SiteTransport {
    fn fetch(&mut self, iri: &str) -> Result<Payload, TransportError> {
        if let Ok(mut fetches) = self.site.fetches.lock() {
            *fetches.entry(iri.to_string()).or_default() += 1;
        }
        let entries = self
            .site
            .entries
            .lock()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        match entries.get(iri) {
            Some(Entry::Content(payload)) => Ok(payload.clone()),
            Some(Entry::Status(code)) => Err(TransportError::Status(*code)),
            None => Err(TransportError::Status(404)),
        }
    }

    fn store(&mut self, iri: &str, payload: &Payload) -> Result<(), TransportError> {
        let mut entries = self
            .site
            .entries
            .lock()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        entries.insert(iri.to_string(), Entry::Content(payload.clone()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemorySite"
    }
}
