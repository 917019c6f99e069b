//! Graph distribution: maps a freshly parsed graph onto the resources of its document and
//! grows the crawl frontier with the documents it mentions.

use crate::api::LdEnv;
use crate::attr::predicate_to_attr;
use crate::codec::PrefixTable;
use crate::consts::IMPORTS;
use crate::discovery::DiscoveryKind;
use crate::errors::Result;
use crate::iri::{is_valid_url, slash_iri, ResourceKey, SubjectId};
use crate::options::GetOptions;
use crate::resource::Value;
use log::{debug, error, info, warn};
use oxigraph::model::{Graph, NamedNodeRef, TermRef};
use std::time::Instant;

impl LdEnv {
    /// Populates the resources of `document` from `graph`; returns how many resources the
    /// document owns afterwards. Resources are left clean.
    pub(crate) fn distribute(
        &mut self,
        document: &str,
        graph: &Graph,
        prefixes: &PrefixTable,
        options: &GetOptions,
    ) -> Result<usize> {
        let started = Instant::now();
        for triple in graph.iter() {
            let predicate = triple.predicate;

            if options.imports.is_eager() && predicate == IMPORTS {
                if let TermRef::NamedNode(target) = triple.object {
                    self.import(document, target, options);
                }
            }

            if let TermRef::NamedNode(object) = triple.object {
                if options.follow.follows(&predicate.into_owned()) {
                    self.discover(document, object)?;
                }
            }

            let subject = ResourceKey::new(document, SubjectId::from(triple.subject));
            let attr = predicate_to_attr(&predicate.into_owned(), prefixes);
            let (value, target) = object_value(document, triple.object);
            self.resources
                .ensure(subject.clone())
                .push_value(attr.clone(), value);
            if let Some(target) = target {
                debug!("{} . {} = Resource({})", subject, attr, target.subject);
                self.resources.ensure(target).add_referrer(&attr, subject);
            }
        }

        self.resources.mark_clean(document);
        let elapsed = started.elapsed();
        self.documents.get_mut(document)?.stats_mut().distribution_time = Some(elapsed);
        let count = self.resources.count_for_document(document);
        debug!(
            "Distributed {} triples of {} onto {} resources in {:?}",
            graph.len(),
            document,
            count,
            elapsed
        );
        Ok(count)
    }

    /// Grows the frontier with the document of `object`.
    fn discover(&mut self, document: &str, object: NamedNodeRef<'_>) -> Result<()> {
        if !is_valid_url(object.as_str()) {
            return Ok(());
        }
        let target = slash_iri(object.as_str())?;
        if target == document {
            return Ok(());
        }
        let (discovered, created) = self.documents.get_or_create(&target)?;
        if created {
            discovered.set_caused_by(document);
            self.discovery.record(document, &target, DiscoveryKind::Link);
        }
        Ok(())
    }

    /// Fetches an imported document before distribution continues. Failures are recorded on
    /// the imported document and do not abort the importing one.
    fn import(&mut self, document: &str, target: NamedNodeRef<'_>, options: &GetOptions) {
        let target = match slash_iri(target.as_str()) {
            Ok(target) => target,
            Err(e) => {
                warn!("Cannot import {}: {}", target, e);
                return;
            }
        };
        if self.in_flight.contains(&target) {
            warn!(
                "{} imports {} which is already being fetched; skipping import cycle",
                document, target
            );
            return;
        }
        match self.documents.get_or_create(&target) {
            Ok((imported, _)) => imported.set_caused_by(document),
            Err(e) => {
                warn!("Cannot import {}: {}", target, e);
                return;
            }
        }
        self.discovery.record(document, &target, DiscoveryKind::Import);
        info!("Interrupting {} to process owl:imports {} first", document, target);
        if let Err(e) = self.get(&target, options) {
            error!("Import {} of {} failed: {}", target, document, e);
        }
    }
}

/// Attribute value for `object`, plus the key of the resource it refers to when the object is
/// another graph entity (an http(s) IRI or a blank node).
fn object_value(document: &str, object: TermRef<'_>) -> (Value, Option<ResourceKey>) {
    match object {
        TermRef::NamedNode(n) if is_valid_url(n.as_str()) => {
            let key = ResourceKey::new(document, SubjectId::Iri(n.as_str().to_string()));
            (Value::Resource(key.clone()), Some(key))
        }
        TermRef::NamedNode(n) => {
            debug!("Not a resource IRI: {}", n);
            (Value::Iri(n.into_owned()), None)
        }
        TermRef::BlankNode(b) => {
            let key = ResourceKey::new(document, SubjectId::Blank(b.as_str().to_string()));
            (Value::Resource(key.clone()), Some(key))
        }
        TermRef::Literal(l) => (Value::Literal(l.into_owned()), None),
        #[allow(unreachable_patterns)]
        other => (Value::literal(other.to_string()), None),
    }
}
