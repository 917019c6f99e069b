//! The `Document` entity: a fetchable graph at one canonical IRI, its fetch state, its
//! error list and the snapshot of the last parsed graph.

use crate::codec::{GraphCodec, ParsedGraph, PrefixTable};
use crate::errors::{DocumentError, Error, Result};
use crate::transport::{Payload, Transport};
use chrono::prelude::*;
use log::error;
use oxigraph::io::RdfFormat;
use oxigraph::model::Graph;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Unfetched,
    Processed,
}

/// Timings and size of the last fetch.
#[derive(Debug, Clone, Default)]
pub struct DocumentStats {
    pub fetch_time: Option<Duration>,
    pub parse_time: Option<Duration>,
    pub distribution_time: Option<Duration>,
    pub triple_count: usize,
}

impl DocumentStats {
    pub fn triples_per_second(&self) -> Option<f64> {
        let secs = self.parse_time?.as_secs_f64();
        if secs > 0.0 {
            Some(self.triple_count as f64 / secs)
        } else {
            None
        }
    }
}

pub struct Document {
    iri: String,
    transport: Box<dyn Transport>,
    processed: bool,
    errors: Vec<DocumentError>,
    snapshot: Option<Graph>,
    prefixes: PrefixTable,
    format: Option<RdfFormat>,
    handled: bool,
    refetch_interval: Option<chrono::Duration>,
    last_fetched: Option<DateTime<Utc>>,
    caused_by: Option<String>,
    stats: DocumentStats,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("iri", &self.iri)
            .field("transport", &self.transport.name())
            .field("processed", &self.processed)
            .field("errors", &self.errors)
            .field("handled", &self.handled)
            .finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.iri, self.transport.name())?;
        for error in &self.errors {
            write!(f, " {}", error)?;
        }
        if self.processed {
            write!(f, " Processed")?;
        }
        Ok(())
    }
}

impl Document {
    /// `iri` must already be canonical; the registry takes care of that.
    pub(crate) fn new(iri: String, transport: Box<dyn Transport>) -> Self {
        Document {
            iri,
            transport,
            processed: false,
            errors: Vec::new(),
            snapshot: None,
            prefixes: PrefixTable::new(),
            format: None,
            handled: false,
            refetch_interval: None,
            last_fetched: None,
            caused_by: None,
            stats: DocumentStats::default(),
        }
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn state(&self) -> DocumentState {
        if self.processed {
            DocumentState::Processed
        } else {
            DocumentState::Unfetched
        }
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }

    pub fn errors(&self) -> &[DocumentError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn add_error(&mut self, error: DocumentError) {
        self.errors.push(error);
    }

    /// Last parsed graph; `None` until the first successful parse.
    pub fn snapshot(&self) -> Option<&Graph> {
        self.snapshot.as_ref()
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// Format negotiated on the last fetch.
    pub fn format(&self) -> Option<RdfFormat> {
        self.format
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub(crate) fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }

    /// Stores a fresh parse as the current snapshot and prefix table.
    pub(crate) fn install_snapshot(&mut self, parsed: ParsedGraph) {
        self.snapshot = Some(parsed.graph);
        self.prefixes = parsed.prefixes;
    }

    pub(crate) fn replace_snapshot(&mut self, graph: Graph) {
        self.snapshot = Some(graph);
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn refetch_interval(&self) -> Option<chrono::Duration> {
        self.refetch_interval
    }

    pub fn set_refetch_interval(&mut self, interval: Option<chrono::Duration>) {
        self.refetch_interval = interval;
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.last_fetched
    }

    /// Time since the last fetch when it is shorter than the refetch interval.
    pub fn throttled_for(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let interval = self.refetch_interval?;
        let last = self.last_fetched?;
        let elapsed = now - last;
        (elapsed < interval).then_some(elapsed)
    }

    /// Document whose distribution discovered this one.
    pub fn caused_by(&self) -> Option<&str> {
        self.caused_by.as_deref()
    }

    pub(crate) fn set_caused_by(&mut self, iri: &str) {
        if self.caused_by.is_none() {
            self.caused_by = Some(iri.to_string());
        }
    }

    pub fn stats(&self) -> &DocumentStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut DocumentStats {
        &mut self.stats
    }

    /// Fetches and parses the document. Every failure is recorded on the document before it
    /// is returned; a success clears earlier errors.
    pub(crate) fn fetch_and_parse(&mut self, codec: &dyn GraphCodec) -> Result<ParsedGraph> {
        self.last_fetched = Some(Utc::now());
        let started = Instant::now();
        let payload = match self.transport.fetch(&self.iri) {
            Ok(payload) => payload,
            Err(e) => {
                self.add_error(DocumentError::from(&e));
                return Err(Error::Transport {
                    iri: self.iri.clone(),
                    source: e,
                });
            }
        };
        self.stats.fetch_time = Some(started.elapsed());

        let Some(format) = payload.format else {
            error!("No parser for {:?} returned by {}", payload.content_type, self.iri);
            self.add_error(DocumentError::Negotiation);
            return Err(Error::Negotiation {
                iri: self.iri.clone(),
                content_type: payload.content_type,
            });
        };

        let started = Instant::now();
        let parsed = match codec.parse(&payload.bytes, &self.iri, format) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("{}: {}", self.iri, e);
                let message = match &e {
                    Error::Parse { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.add_error(DocumentError::Parse(message));
                return Err(e);
            }
        };
        self.stats.parse_time = Some(started.elapsed());
        self.stats.triple_count = parsed.graph.len();
        self.format = Some(format);
        self.errors.clear();
        Ok(parsed)
    }

    /// Raw transport response. Nothing is parsed or recorded.
    pub(crate) fn fetch_payload(&mut self) -> Result<Payload> {
        self.transport.fetch(&self.iri).map_err(|e| Error::Transport {
            iri: self.iri.clone(),
            source: e,
        })
    }

    /// Restores the transport's content from before the last PUT.
    pub(crate) fn revert(&mut self) -> Result<bool> {
        self.transport.revert().map_err(|e| Error::Transport {
            iri: self.iri.clone(),
            source: e,
        })
    }

    /// Writes serialized content through the transport.
    pub(crate) fn store(&mut self, bytes: Vec<u8>, format: RdfFormat) -> Result<()> {
        let payload = Payload::new(bytes, format);
        self.transport
            .store(&self.iri, &payload)
            .map_err(|e| Error::Transport {
                iri: self.iri.clone(),
                source: e,
            })
    }
}
