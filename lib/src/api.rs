//! Defines `LdEnv`, the engine that owns the document and resource registries and drives
//! GET, PUT, crawling and authoritative lookups over them.

use crate::codec::{GraphCodec, OxigraphCodec};
use crate::config::Config;
use crate::discovery::DiscoveryGraph;
use crate::document::Document;
use crate::errors::{DocumentError, Error, Result};
use crate::graph::{document_graph, log_changes};
use crate::iri::{slash_iri, ResourceKey};
use crate::options::{ErrorPolicy, Follow, GetOptions};
use crate::registry::{DocumentRegistry, ResourceRegistry};
use crate::resource::Resource;
use crate::transport::{HttpOptions, HttpTransport, Payload, Transport, TransportFactory};
use chrono::prelude::*;
use log::{debug, error, info, warn};
use oxigraph::io::RdfFormat;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Initializes logging for the ldsync library.
///
/// `LDSYNC_LOG`, when set, overrides `RUST_LOG`. The logger itself (e.g. `env_logger::init()`)
/// must be initialized after this call.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("LDSYNC_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}

/// Shareable cancellation token. Raising it stops a running GET before it touches any
/// resource, and stops crawls between documents.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What a GET call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// The IRI is on the skip list; the document was marked processed without fetching.
    Skipped,
    /// Fetched too recently; nothing happened.
    Throttled,
    /// Fetch or parse failed and the error policy swallowed the error.
    Failed(DocumentError),
    /// Parsed, but over the size limit; no resources were created.
    TooLarge { size: usize, limit: usize },
    /// Remote graph is isomorphic to the last snapshot.
    Unchanged,
    /// Resources for the current snapshot already exist.
    AlreadyHandled,
    /// Resources were (re)built from the fetched graph.
    Distributed { resources: usize, changed: bool },
}

impl GetOutcome {
    /// Turns an oversized graph into [`Error::GraphTooLarge`] for callers that treat the
    /// size limit as a failure.
    pub fn into_result(self, iri: &str) -> Result<GetOutcome> {
        match self {
            GetOutcome::TooLarge { size, limit } => Err(Error::GraphTooLarge {
                iri: iri.to_string(),
                size,
                limit,
            }),
            other => Ok(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// No resource of the document had unsaved changes.
    NothingToPut,
    Written { resources: usize, triples: usize },
}

/// Summary of a crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub rounds: usize,
    pub fetched: Vec<String>,
    pub failed: Vec<String>,
    pub cancelled: bool,
}

pub struct Stats {
    pub num_documents: usize,
    pub num_processed: usize,
    pub num_resources: usize,
    pub num_triples: usize,
}

pub struct LdEnv {
    config: Config,
    pub(crate) codec: Box<dyn GraphCodec>,
    pub(crate) documents: DocumentRegistry,
    pub(crate) resources: ResourceRegistry,
    pub(crate) discovery: DiscoveryGraph,
    /// Documents whose GET is on the stack; guards eager imports against cycles.
    pub(crate) in_flight: HashSet<String>,
    cancel: CancelFlag,
}

impl LdEnv {
    /// An environment whose documents are fetched over HTTP.
    pub fn new(config: Config) -> Self {
        let options = HttpOptions::from(&config);
        let factory: TransportFactory = Box::new(move |_iri: &str| {
            Box::new(HttpTransport::new(options.clone())) as Box<dyn Transport>
        });
        Self::with_transport_factory(config, factory)
    }

    /// An environment whose implicitly created documents get their transport from `factory`.
    pub fn with_transport_factory(config: Config, factory: TransportFactory) -> Self {
        let mut documents = DocumentRegistry::new(factory);
        documents.set_default_refetch_interval(config.refetch_interval());
        LdEnv {
            config,
            codec: Box::new(OxigraphCodec),
            documents,
            resources: ResourceRegistry::new(),
            discovery: DiscoveryGraph::new(),
            in_flight: HashSet::new(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_codec(mut self, codec: Box<dyn GraphCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default per-call options for this environment.
    pub fn get_options(&self) -> GetOptions {
        GetOptions::from_config(&self.config)
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.documents
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    pub fn discovery(&self) -> &DiscoveryGraph {
        &self.discovery
    }

    pub fn document(&self, iri: &str) -> Result<&Document> {
        self.documents.get(iri)
    }

    /// Creates a document, optionally bound to an explicit transport.
    pub fn create_document(
        &mut self,
        iri: &str,
        transport: Option<Box<dyn Transport>>,
    ) -> Result<&mut Document> {
        self.documents.create(iri, transport)
    }

    /// Creates a resource in a fetched document. `uri` may be relative (`#me`).
    pub fn create_resource(&mut self, uri: &str, document: &str) -> Result<&mut Resource> {
        let document = self.documents.get(document)?;
        self.resources.create(uri, document)
    }

    /// Exact lookup when `document` is given, otherwise a search across documents.
    pub fn resource(&self, uri: &str, document: Option<&str>) -> Result<&Resource> {
        match document {
            Some(document) => {
                let document = slash_iri(document)?;
                self.resources.get(uri, Some(document.as_str()))
            }
            None => self.resources.get(uri, None),
        }
    }

    pub fn resource_mut(&mut self, key: &ResourceKey) -> Result<&mut Resource> {
        self.resources
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn has_unsaved_changes(&self, document: &str) -> Result<bool> {
        let document = self.documents.get(document)?;
        Ok(self.resources.has_unsaved_changes(document.iri()))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            num_documents: self.documents.len(),
            num_processed: self.documents.iter().filter(|d| d.is_processed()).count(),
            num_resources: self.resources.len(),
            num_triples: self
                .documents
                .iter()
                .filter_map(|d| d.snapshot())
                .map(|g| g.len())
                .sum(),
        }
    }

    /// Drops every document, resource and discovery edge.
    pub fn reset(&mut self) {
        self.documents.clear();
        self.resources.clear();
        self.discovery.clear();
        self.in_flight.clear();
        self.cancel.reset();
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Fetches `iri` (creating its document if needed) and brings the document's resources
    /// in line with the remote graph.
    pub fn get(&mut self, iri: &str, options: &GetOptions) -> Result<GetOutcome> {
        if iri.is_empty() {
            return Err(Error::InvalidIri("please provide an IRI first".to_string()));
        }
        let iri = slash_iri(iri)?;
        self.check_cancelled()?;
        let (_, created) = self.documents.get_or_create(&iri)?;
        if created {
            debug!("Created document {} for GET", iri);
        }

        self.in_flight.insert(iri.clone());
        let outcome = self.get_document(&iri, options);
        self.in_flight.remove(&iri);
        outcome
    }

    fn get_document(&mut self, iri: &str, options: &GetOptions) -> Result<GetOutcome> {
        if options.skip.matches(iri) {
            info!("Skipping {}", iri);
            let document = self.documents.get_mut(iri)?;
            document.add_error(DocumentError::Skipped);
            document.mark_processed();
            return Ok(GetOutcome::Skipped);
        }

        let dirty = self.resources.has_unsaved_changes(iri);
        let document = self.documents.get_mut(iri)?;
        if dirty {
            if document.is_processed() {
                return Err(Error::UnsavedChanges(iri.to_string()));
            }
            warn!(
                "There were resources created in {} before it was fetched",
                iri
            );
        }

        if let Some(elapsed) = document.throttled_for(Utc::now()) {
            info!(
                "Not fetching {} again, it was fetched only {}s ago",
                iri,
                elapsed.num_seconds()
            );
            return Ok(GetOutcome::Throttled);
        }

        info!("GET {}...", iri);
        let parsed = match document.fetch_and_parse(self.codec.as_ref()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return match options.errors {
                    ErrorPolicy::Propagate => Err(e),
                    ErrorPolicy::Swallow => {
                        debug!("Ignoring failure of {}: {}", iri, e);
                        let recorded = document
                            .errors()
                            .last()
                            .cloned()
                            .unwrap_or(DocumentError::Io(e.to_string()));
                        Ok(GetOutcome::Failed(recorded))
                    }
                };
            }
        };
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        document.mark_processed();

        let size = parsed.graph.len();
        if size > options.graph_size_limit {
            error!(
                "Graph of {} has {} triples, the limit is {}; not distributing it",
                iri, size, options.graph_size_limit
            );
            return Ok(GetOutcome::TooLarge {
                size,
                limit: options.graph_size_limit,
            });
        }

        let mut changed = false;
        if let Some(snapshot) = document.snapshot() {
            info!("Already crawled {}, comparing graphs...", iri);
            if self.codec.isomorphic(snapshot, &parsed.graph) {
                return Ok(GetOutcome::Unchanged);
            }
            warn!("GET retrieved updates for {}", iri);
            log_changes(iri, snapshot, &parsed.graph);
            document.set_handled(false);
            changed = true;
            let removed = self.resources.delete_document(iri);
            debug!("Deleted {} outdated resources of {}", removed, iri);
        }

        let document = self.documents.get_mut(iri)?;
        if document.is_handled() {
            return Ok(GetOutcome::AlreadyHandled);
        }
        let graph = parsed.graph.clone();
        let prefixes = parsed.prefixes.clone();
        document.install_snapshot(parsed);

        let resources = self.distribute(iri, &graph, &prefixes, options)?;
        self.documents.get_mut(iri)?.set_handled(true);
        Ok(GetOutcome::Distributed { resources, changed })
    }

    /// Writes the resources of `document` back through its transport.
    pub fn put(&mut self, document: &str) -> Result<PutOutcome> {
        let iri = slash_iri(document)?;
        let document = self.documents.get(&iri)?;
        if !document.is_processed() {
            return Err(Error::NotProcessed(iri));
        }
        if document.has_errors() {
            return Err(Error::DocumentHasErrors {
                iri,
                errors: document.errors().to_vec(),
            });
        }
        if !self.resources.has_unsaved_changes(&iri) {
            error!("Nothing to PUT for {}", iri);
            return Ok(PutOutcome::NothingToPut);
        }

        let graph = document_graph(&self.resources, &iri, document.prefixes())?;
        let format = document.format().unwrap_or(RdfFormat::Turtle);
        let bytes = self
            .codec
            .serialize(&graph, document.prefixes(), format)
            .map_err(|e| match e {
                Error::Serialize { message, .. } => Error::Serialize {
                    iri: iri.clone(),
                    message,
                },
                other => other,
            })?;

        info!("PUT {} ({} triples)", iri, graph.len());
        let triples = graph.len();
        let document = self.documents.get_mut(&iri)?;
        document.store(bytes, format)?;
        document.replace_snapshot(graph);
        self.resources.mark_clean(&iri);
        Ok(PutOutcome::Written {
            resources: self.resources.count_for_document(&iri),
            triples,
        })
    }

    /// Fetches `iri` through its document's transport and returns the response as is,
    /// without parsing, distributing or changing the document's state.
    pub fn fetch_raw(&mut self, iri: &str) -> Result<Payload> {
        let iri = slash_iri(iri)?;
        self.check_cancelled()?;
        let (document, _) = self.documents.get_or_create(&iri)?;
        info!("Negotiating {} via {}", iri, document.transport_name());
        document.fetch_payload()
    }

    /// Restores the content `document` had before its last PUT. The next GET picks up the
    /// restored graph as a remote change. Returns false when the transport keeps no
    /// previous version.
    pub fn revert(&mut self, document: &str) -> Result<bool> {
        let iri = slash_iri(document)?;
        let reverted = self.documents.get_mut(&iri)?.revert()?;
        if reverted {
            info!("Reverted {}", iri);
        }
        Ok(reverted)
    }

    /// Saves the document owning `key`.
    pub fn save_resource(&mut self, key: &ResourceKey) -> Result<PutOutcome> {
        if self.resources.get_by_key(key).is_none() {
            return Err(Error::NotFound(key.to_string()));
        }
        let document = key.document.clone();
        self.put(&document)
    }

    /// Resource for `uri` as described by the document owning its IRI. The document is
    /// fetched (without following any links) unless it holds unsaved changes.
    pub fn get_authoritative_resource(&mut self, uri: &str) -> Result<&Resource> {
        let document = slash_iri(uri)?;
        self.documents.get_or_create(&document)?;
        if !self.resources.has_unsaved_changes(&document) {
            let options = self
                .get_options()
                .with_follow(Follow::nothing())
                .with_errors(ErrorPolicy::Swallow);
            self.get(&document, &options)?;
        }
        self.resources.get(uri, Some(&document))
    }

    /// Crawls for `depth` rounds; every round fetches all documents which are not processed
    /// yet. Individual failures are recorded and never abort the crawl.
    pub fn get_all(&mut self, depth: usize, options: &GetOptions) -> Result<CrawlReport> {
        self.crawl(depth, options, |documents| documents.unprocessed())
    }

    /// Like [`LdEnv::get_all`], restricted to documents which never saw a fetch attempt.
    pub fn get_uncrawled(&mut self, depth: usize, options: &GetOptions) -> Result<CrawlReport> {
        self.crawl(depth, options, |documents| documents.never_fetched())
    }

    fn crawl<F>(&mut self, depth: usize, options: &GetOptions, frontier: F) -> Result<CrawlReport>
    where
        F: Fn(&DocumentRegistry) -> Vec<String>,
    {
        let options = options.clone().with_errors(ErrorPolicy::Swallow);
        let mut report = CrawlReport::default();
        for round in 0..depth {
            let pending = frontier(&self.documents);
            if pending.is_empty() {
                break;
            }
            info!(
                "Crawl round {} of {}: {} documents",
                round + 1,
                depth,
                pending.len()
            );
            report.rounds += 1;
            for iri in pending {
                match self.get(&iri, &options) {
                    Ok(GetOutcome::Failed(e)) => {
                        debug!("{} failed: {}", iri, e);
                        report.failed.push(iri);
                    }
                    Ok(_) => report.fetched.push(iri),
                    Err(Error::Cancelled) => {
                        warn!("Crawl cancelled");
                        report.cancelled = true;
                        return Ok(report);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(report)
    }
}
