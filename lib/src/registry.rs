//! Keyed in-memory stores for documents and resources.

use crate::document::Document;
use crate::errors::{Error, Result};
use crate::iri::{has_fragment, slash_iri, ResourceKey, SubjectId};
use crate::resource::{Resource, Value};
use crate::transport::{Transport, TransportFactory};
use log::{debug, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::RangeFrom;

/// Documents keyed by their canonical (fragment-free) IRI.
pub struct DocumentRegistry {
    documents: BTreeMap<String, Document>,
    factory: TransportFactory,
    refetch_interval: Option<chrono::Duration>,
}

impl DocumentRegistry {
    pub fn new(factory: TransportFactory) -> Self {
        DocumentRegistry {
            documents: BTreeMap::new(),
            factory,
            refetch_interval: None,
        }
    }

    /// Minimum refetch interval given to documents created from now on.
    pub fn set_default_refetch_interval(&mut self, interval: Option<chrono::Duration>) {
        self.refetch_interval = interval;
    }

    fn canonical(iri: &str) -> Result<String> {
        let slash = slash_iri(iri)?;
        if has_fragment(iri) {
            debug!("{} is not a slash IRI; using {}", iri, slash);
        }
        Ok(slash)
    }

    fn build(&self, iri: String, transport: Option<Box<dyn Transport>>) -> Document {
        let transport = transport.unwrap_or_else(|| (self.factory)(&iri));
        let mut document = Document::new(iri, transport);
        document.set_refetch_interval(self.refetch_interval);
        document
    }

    pub fn get(&self, iri: &str) -> Result<&Document> {
        let iri = Self::canonical(iri)?;
        self.documents.get(&iri).ok_or(Error::NotFound(iri))
    }

    pub fn get_mut(&mut self, iri: &str) -> Result<&mut Document> {
        let iri = Self::canonical(iri)?;
        self.documents.get_mut(&iri).ok_or(Error::NotFound(iri))
    }

    pub fn contains(&self, iri: &str) -> bool {
        Self::canonical(iri)
            .map(|iri| self.documents.contains_key(&iri))
            .unwrap_or(false)
    }

    /// Stores a new unprocessed document. Without an explicit transport the registry's
    /// factory provides one.
    pub fn create(
        &mut self,
        iri: &str,
        transport: Option<Box<dyn Transport>>,
    ) -> Result<&mut Document> {
        let iri = Self::canonical(iri)?;
        if self.documents.contains_key(&iri) {
            return Err(Error::AlreadyExists(iri));
        }
        let document = self.build(iri.clone(), transport);
        Ok(self.documents.entry(iri).or_insert(document))
    }

    /// Returns the document and whether it was created.
    pub fn get_or_create(&mut self, iri: &str) -> Result<(&mut Document, bool)> {
        let iri = Self::canonical(iri)?;
        if self.documents.contains_key(&iri) {
            return self.get_mut(&iri).map(|d| (d, false));
        }
        let document = self.build(iri.clone(), None);
        match self.documents.entry(iri) {
            Entry::Vacant(v) => Ok((v.insert(document), true)),
            Entry::Occupied(o) => Ok((o.into_mut(), false)),
        }
    }

    /// IRIs of every document not yet processed, in key order.
    pub fn unprocessed(&self) -> Vec<String> {
        self.documents
            .values()
            .filter(|d| !d.is_processed())
            .map(|d| d.iri().to_string())
            .collect()
    }

    /// IRIs of documents that never saw a fetch attempt.
    pub fn never_fetched(&self) -> Vec<String> {
        self.documents
            .values()
            .filter(|d| d.last_fetched().is_none() && !d.is_processed())
            .map(|d| d.iri().to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

/// Filter over resources. Attribute criteria match a single value or membership in a set.
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    document: Option<String>,
    subject: Option<SubjectId>,
    dirty: Option<bool>,
    authoritative: Option<bool>,
    attrs: Vec<(String, Value)>,
}

impl ResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(mut self, iri: impl Into<String>) -> Self {
        self.document = Some(iri.into());
        self
    }

    pub fn subject(mut self, subject: SubjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }

    pub fn authoritative(mut self, authoritative: bool) -> Self {
        self.authoritative = Some(authoritative);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(doc) = &self.document {
            if resource.document() != doc.as_str() {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if resource.subject() != subject {
                return false;
            }
        }
        if let Some(dirty) = self.dirty {
            if resource.is_dirty() != dirty {
                return false;
            }
        }
        if let Some(authoritative) = self.authoritative {
            if resource.is_authoritative() != authoritative {
                return false;
            }
        }
        self.attrs.iter().all(|(name, value)| {
            resource
                .attr(name)
                .map(|attr| attr.contains(value))
                .unwrap_or(false)
        })
    }
}

/// Resources keyed by (document, subject).
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceKey, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn document_range(document: &str) -> RangeFrom<ResourceKey> {
        ResourceKey::first_of(document)..
    }

    /// Creates a resource for `uri` in `document`. Fragment IRIs (`#me`) are resolved
    /// against the document. The document must have been fetched at least once.
    pub fn create(&mut self, uri: &str, document: &Document) -> Result<&mut Resource> {
        if !document.is_processed() {
            return Err(Error::NotProcessed(document.iri().to_string()));
        }
        let key = ResourceKey::new(document.iri(), SubjectId::parse(uri, document.iri())?);
        match self.resources.entry(key) {
            Entry::Occupied(o) => Err(Error::AlreadyExists(o.key().to_string())),
            Entry::Vacant(v) => {
                let resource = Resource::new(v.key().clone());
                Ok(v.insert(resource))
            }
        }
    }

    /// Get-or-create without the processed guard; distribution creates resources while the
    /// fetch that processes their document is still running.
    pub(crate) fn ensure(&mut self, key: ResourceKey) -> &mut Resource {
        self.resources
            .entry(key)
            .or_insert_with_key(|k| Resource::new(k.clone()))
    }

    /// Exact lookup when `document` is given. Otherwise searches every document; several
    /// matches resolve to the authoritative one if there is one.
    pub fn get(&self, uri: &str, document: Option<&str>) -> Result<&Resource> {
        match document {
            Some(document) => {
                let key = ResourceKey::new(document, SubjectId::parse(uri, document)?);
                self.resources
                    .get(&key)
                    .ok_or_else(|| Error::NotFound(key.to_string()))
            }
            None => {
                let subject = SubjectId::parse(uri, "")?;
                let matches: Vec<&Resource> = self
                    .resources
                    .values()
                    .filter(|r| r.subject() == &subject)
                    .collect();
                match matches.as_slice() {
                    [] => Err(Error::NotFound(uri.to_string())),
                    [only] => Ok(*only),
                    many => match many.iter().find(|r| r.is_authoritative()) {
                        Some(authoritative) => Ok(*authoritative),
                        None => {
                            warn!("No authoritative resource found for {}", uri);
                            Err(Error::Ambiguous {
                                iri: uri.to_string(),
                                documents: many.iter().map(|r| r.document().to_string()).collect(),
                            })
                        }
                    },
                }
            }
        }
    }

    pub fn get_by_key(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    pub fn get_mut(&mut self, key: &ResourceKey) -> Option<&mut Resource> {
        self.resources.get_mut(key)
    }

    /// Returns the resource and whether it was created.
    pub fn get_or_create(
        &mut self,
        uri: &str,
        document: &Document,
    ) -> Result<(&mut Resource, bool)> {
        let key = ResourceKey::new(document.iri(), SubjectId::parse(uri, document.iri())?);
        if self.resources.contains_key(&key) {
            return self
                .resources
                .get_mut(&key)
                .map(|r| (r, false))
                .ok_or(Error::NotFound(key.to_string()));
        }
        self.create(uri, document).map(|r| (r, true))
    }

    pub fn for_document<'a>(&'a self, document: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .range(Self::document_range(document))
            .take_while(move |(k, _)| k.document == document)
            .map(|(_, r)| r)
    }

    pub fn keys_for_document(&self, document: &str) -> Vec<ResourceKey> {
        self.for_document(document).map(|r| r.key().clone()).collect()
    }

    pub fn count_for_document(&self, document: &str) -> usize {
        self.for_document(document).count()
    }

    pub fn has_unsaved_changes(&self, document: &str) -> bool {
        self.for_document(document).any(|r| r.is_dirty())
    }

    pub(crate) fn mark_clean(&mut self, document: &str) {
        for (_, resource) in self
            .resources
            .range_mut(Self::document_range(document))
            .take_while(|(k, _)| k.document == document)
        {
            resource.mark_clean();
        }
    }

    pub fn delete(&mut self, key: &ResourceKey) -> Option<Resource> {
        self.resources.remove(key)
    }

    /// Deletes every resource owned by `document`; returns how many were removed.
    pub fn delete_document(&mut self, document: &str) -> usize {
        let keys = self.keys_for_document(document);
        for key in &keys {
            self.resources.remove(key);
        }
        keys.len()
    }

    pub fn filter<'a>(&'a self, query: &'a ResourceQuery) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.values().filter(move |r| query.matches(r))
    }

    pub fn filter_has_attr<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.values().filter(move |r| r.has_attr(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemorySite;

    fn registry() -> DocumentRegistry {
        DocumentRegistry::new(MemorySite::new().factory())
    }

    #[test]
    fn documents_are_keyed_by_slash_iri() {
        let mut docs = registry();
        let doc = docs.create("http://ex.com/foaf#me", None).unwrap();
        assert_eq!(doc.iri(), "http://ex.com/foaf");
        assert!(docs.get("http://ex.com/foaf").is_ok());
        assert!(docs.get("http://ex.com/foaf#other").is_ok());
        assert!(matches!(docs.get("http://ex.com/x"), Err(Error::NotFound(_))));
        assert!(matches!(
            docs.create("http://ex.com/foaf", None),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(docs.create("", None), Err(Error::InvalidIri(_))));
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut docs = registry();
        assert!(docs.get_or_create("http://ex.com/a").unwrap().1);
        assert!(!docs.get_or_create("http://ex.com/a#x").unwrap().1);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.unprocessed(), vec!["http://ex.com/a".to_string()]);
    }

    #[test]
    fn resource_create_requires_processed_document() {
        let mut docs = registry();
        let doc = docs.create("http://ex.com/foaf", None).unwrap();
        let mut resources = ResourceRegistry::new();
        assert!(matches!(
            resources.create("#me", doc),
            Err(Error::NotProcessed(_))
        ));
        doc.mark_processed();
        let me = resources.create("#me", doc).unwrap();
        assert_eq!(me.subject().iri(), Some("http://ex.com/foaf#me"));
        assert!(me.is_dirty());
        assert!(matches!(
            resources.create("http://ex.com/foaf#me", doc),
            Err(Error::AlreadyExists(_))
        ));
        assert!(!resources.get_or_create("#me", doc).unwrap().1);
    }

    #[test]
    fn lookup_without_document_prefers_authoritative() {
        let mut docs = registry();
        let mut resources = ResourceRegistry::new();
        for iri in ["http://ex.com/foaf", "http://other.org/doc", "http://third.org/doc"] {
            let doc = docs.create(iri, None).unwrap();
            doc.mark_processed();
        }
        let other = docs.get("http://other.org/doc").unwrap();
        resources.create("http://ex.com/foaf#me", other).unwrap();
        assert_eq!(
            resources.get("http://ex.com/foaf#me", None).unwrap().document(),
            "http://other.org/doc"
        );

        let third = docs.get("http://third.org/doc").unwrap();
        resources.create("http://ex.com/foaf#me", third).unwrap();
        assert!(matches!(
            resources.get("http://ex.com/foaf#me", None),
            Err(Error::Ambiguous { .. })
        ));

        let foaf = docs.get("http://ex.com/foaf").unwrap();
        resources.create("#me", foaf).unwrap();
        assert_eq!(
            resources.get("http://ex.com/foaf#me", None).unwrap().document(),
            "http://ex.com/foaf"
        );
        assert!(matches!(
            resources.get("http://nowhere.org/x", None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn filter_matches_scalars_sets_and_state() {
        let mut docs = registry();
        let doc = docs.create("http://ex.com/foaf", None).unwrap();
        doc.mark_processed();
        let mut resources = ResourceRegistry::new();
        {
            let me = resources.create("#me", doc).unwrap();
            me.set("foaf_name", Value::literal("Max"));
            me.add("foaf_nick", Value::literal("m"));
            me.add("foaf_nick", Value::literal("mx"));
        }
        resources.create("#you", doc).unwrap().set("foaf_name", Value::literal("Erika"));
        resources.mark_clean("http://ex.com/foaf");

        let q = ResourceQuery::new().attr("foaf_name", Value::literal("Max"));
        assert_eq!(resources.filter(&q).count(), 1);
        let q = ResourceQuery::new().attr("foaf_nick", Value::literal("mx"));
        assert_eq!(resources.filter(&q).count(), 1);
        let q = ResourceQuery::new().document("http://ex.com/foaf").dirty(false);
        assert_eq!(resources.filter(&q).count(), 2);
        assert_eq!(resources.filter_has_attr("foaf_nick").count(), 1);
        assert!(!resources.has_unsaved_changes("http://ex.com/foaf"));

        assert_eq!(resources.delete_document("http://ex.com/foaf"), 2);
        assert!(resources.is_empty());
    }
}
