//! The `Resource` entity: one subject of one document, with its attributes, dirty flag
//! and reverse-link index.

use crate::iri::{slash_iri, ResourceKey, SubjectId};
use oxigraph::model::{Literal, NamedNode, Term};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Another resource of the same document.
    Resource(ResourceKey),
    /// An IRI which is not dereferenceable (mailto:, urn:, ...).
    Iri(NamedNode),
    Literal(Literal),
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(Literal::new_simple_literal(value))
    }

    pub fn as_resource(&self) -> Option<&ResourceKey> {
        match self {
            Value::Resource(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// RDF term for serialization.
    pub fn to_term(&self) -> Term {
        match self {
            Value::Resource(key) => key.subject.to_node().into(),
            Value::Iri(n) => n.clone().into(),
            Value::Literal(l) => l.clone().into(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Resource(key) => write!(f, "{}", key.subject),
            Value::Iri(n) => write!(f, "{}", n),
            Value::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        Value::Literal(l)
    }
}

impl From<ResourceKey> for Value {
    fn from(key: ResourceKey) -> Self {
        Value::Resource(key)
    }
}

/// Attribute contents: one value until a second distinct one arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    One(Value),
    Many(Vec<Value>),
}

impl AttrValue {
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        let slice: &[Value] = match self {
            AttrValue::One(v) => std::slice::from_ref(v),
            AttrValue::Many(vs) => vs.as_slice(),
        };
        slice.iter()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values().any(|v| v == value)
    }

    /// The value if there is exactly one.
    pub fn single(&self) -> Option<&Value> {
        match self {
            AttrValue::One(v) => Some(v),
            AttrValue::Many(vs) if vs.len() == 1 => vs.first(),
            AttrValue::Many(_) => None,
        }
    }

    fn push(&mut self, value: Value) {
        if self.contains(&value) {
            return;
        }
        match self {
            AttrValue::One(existing) => {
                let existing = existing.clone();
                *self = AttrValue::Many(vec![existing, value]);
            }
            AttrValue::Many(vs) => vs.push(value),
        }
    }
}

impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        AttrValue::One(v)
    }
}

impl From<Vec<Value>> for AttrValue {
    fn from(vs: Vec<Value>) -> Self {
        AttrValue::Many(vs)
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    key: ResourceKey,
    attributes: BTreeMap<String, AttrValue>,
    reverse: BTreeMap<String, BTreeSet<ResourceKey>>,
    dirty: bool,
}

impl Resource {
    /// New resources carry unsaved state until a distribution pass or a PUT clears it.
    pub(crate) fn new(key: ResourceKey) -> Self {
        Resource {
            key,
            attributes: BTreeMap::new(),
            reverse: BTreeMap::new(),
            dirty: true,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn subject(&self) -> &SubjectId {
        &self.key.subject
    }

    pub fn document(&self) -> &str {
        &self.key.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Replaces an attribute and marks the resource dirty.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
        self.dirty = true;
    }

    /// Adds one value to an attribute, turning it into a set if needed, and marks the
    /// resource dirty.
    pub fn add(&mut self, name: impl Into<String>, value: Value) {
        self.push_value(name.into(), value);
        self.dirty = true;
    }

    /// Removes an attribute and marks the resource dirty.
    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub(crate) fn push_value(&mut self, name: String, value: Value) {
        match self.attributes.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.attributes.insert(name, AttrValue::One(value));
            }
        }
    }

    /// Resources pointing at this one, per attribute name.
    pub fn reverse(&self) -> &BTreeMap<String, BTreeSet<ResourceKey>> {
        &self.reverse
    }

    pub fn referrers(&self, name: &str) -> impl Iterator<Item = &ResourceKey> {
        self.reverse.get(name).into_iter().flatten()
    }

    pub(crate) fn add_referrer(&mut self, name: &str, from: ResourceKey) {
        self.reverse.entry(name.to_string()).or_default().insert(from);
    }

    /// Authoritative per "SAOR: Authoritative Reasoning for the Web": blank nodes always, IRIs
    /// when their slash form is the owning document.
    pub fn is_authoritative(&self) -> bool {
        match &self.key.subject {
            SubjectId::Blank(_) => true,
            SubjectId::Iri(iri) => slash_iri(iri)
                .map(|slash| slash == self.key.document)
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authoritative() {
            write!(f, "{} *authoritative*", self.key.subject)
        } else {
            write!(f, "{} [{}]", self.key.subject, self.key.document)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(doc: &str, subject: &str) -> ResourceKey {
        ResourceKey::new(doc, SubjectId::parse(subject, doc).unwrap())
    }

    #[test]
    fn values_accumulate_into_sets() {
        let mut r = Resource::new(key("http://ex.com/foaf", "#me"));
        r.push_value("foaf_nick".into(), Value::literal("max"));
        assert_eq!(r.attr("foaf_nick").unwrap().single(), Some(&Value::literal("max")));
        r.push_value("foaf_nick".into(), Value::literal("maxi"));
        r.push_value("foaf_nick".into(), Value::literal("max"));
        let nicks = r.attr("foaf_nick").unwrap();
        assert_eq!(nicks.values().count(), 2);
        assert!(nicks.contains(&Value::literal("maxi")));
    }

    #[test]
    fn edits_mark_dirty() {
        let mut r = Resource::new(key("http://ex.com/foaf", "#me"));
        assert!(r.is_dirty());
        r.mark_clean();
        r.set("foaf_name", Value::literal("Max"));
        assert!(r.is_dirty());
        r.mark_clean();
        assert!(r.remove("missing").is_none());
        assert!(!r.is_dirty());
    }

    #[test]
    fn authoritative_resources() {
        assert!(Resource::new(key("http://ex.com/foaf", "#me")).is_authoritative());
        assert!(Resource::new(key("http://ex.com/foaf", "http://ex.com/foaf")).is_authoritative());
        assert!(Resource::new(key("http://ex.com/foaf", "_:b1")).is_authoritative());
        assert!(!Resource::new(key("http://ex.com/foaf", "http://other.org/x#y")).is_authoritative());
        assert!(!Resource::new(key("http://ex.com/foaf", "urn:isbn:1")).is_authoritative());
    }
}
