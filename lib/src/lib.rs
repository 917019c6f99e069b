//! Object view over Linked Data documents: fetch RDF graphs, map their triples onto
//! in-memory resources, track local edits and write them back.

extern crate derive_builder;

pub mod api;
pub mod attr;
pub mod codec;
pub mod config;
pub mod consts;
pub mod discovery;
mod distribute;
pub mod doctor;
pub mod document;
pub mod errors;
pub mod graph;
pub mod iri;
pub mod options;
pub mod registry;
pub mod resource;
pub mod transport;

pub use api::{init_logging, CancelFlag, CrawlReport, GetOutcome, LdEnv, PutOutcome};
pub use config::Config;
pub use errors::{Error, Result};
pub use iri::{ResourceKey, SubjectId};
pub use options::{ErrorPolicy, Follow, GetOptions, ImportHandling, SkipList};
pub use resource::{AttrValue, Resource, Value};
