//! Option types that replace boolean flags and optional lists in the GET API.

use crate::config::Config;
use globset::{Glob, GlobSet, GlobSetBuilder};
use oxigraph::model::NamedNode;
use std::collections::HashSet;

/// Whether a failed fetch/parse is returned to the caller or only recorded on the document.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ErrorPolicy {
    #[default]
    Propagate,
    Swallow,
}

impl From<bool> for ErrorPolicy {
    fn from(raise_errors: bool) -> Self {
        if raise_errors {
            ErrorPolicy::Propagate
        } else {
            ErrorPolicy::Swallow
        }
    }
}

/// Controls what happens to `owl:imports` objects during distribution.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ImportHandling {
    /// Fetch imported documents immediately, before the remaining triples.
    Eager,
    /// Treat imports like any other triple.
    #[default]
    Deferred,
}

impl ImportHandling {
    pub fn is_eager(self) -> bool {
        matches!(self, ImportHandling::Eager)
    }
}

impl From<bool> for ImportHandling {
    fn from(value: bool) -> Self {
        if value {
            ImportHandling::Eager
        } else {
            ImportHandling::Deferred
        }
    }
}

/// Discovery filter: which object IRIs grow the crawl frontier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Follow {
    /// Every object that is a valid http(s) IRI.
    #[default]
    All,
    /// Only objects of these predicates. An empty set follows nothing.
    Only(HashSet<NamedNode>),
}

impl Follow {
    pub fn nothing() -> Self {
        Follow::Only(HashSet::new())
    }

    pub fn predicates<I>(predicates: I) -> Self
    where
        I: IntoIterator<Item = NamedNode>,
    {
        Follow::Only(predicates.into_iter().collect())
    }

    pub fn follows(&self, predicate: &NamedNode) -> bool {
        match self {
            Follow::All => true,
            Follow::Only(set) => set.contains(predicate),
        }
    }
}

/// IRIs that GET must not fetch. Entries are glob patterns, so plain IRIs match themselves.
#[derive(Debug, Clone)]
pub struct SkipList {
    patterns: Vec<String>,
    set: GlobSet,
}

impl Default for SkipList {
    fn default() -> Self {
        SkipList {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }
}

impl SkipList {
    pub fn new<I>(patterns: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            // `?` is common in IRIs; treat it literally
            builder.add(Glob::new(&pattern.replace('?', "[?]"))?);
            kept.push(pattern.to_string());
        }
        Ok(SkipList {
            patterns: kept,
            set: builder.build()?,
        })
    }

    pub fn matches(&self, iri: &str) -> bool {
        self.set.is_match(iri)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Per-call knobs for `LdEnv::get`.
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub graph_size_limit: usize,
    pub follow: Follow,
    pub imports: ImportHandling,
    pub errors: ErrorPolicy,
    pub skip: SkipList,
}

impl Default for GetOptions {
    fn default() -> Self {
        GetOptions {
            graph_size_limit: 30_000,
            follow: Follow::All,
            imports: ImportHandling::Deferred,
            errors: ErrorPolicy::Propagate,
            skip: SkipList::default(),
        }
    }
}

impl GetOptions {
    /// Options derived from the environment configuration.
    pub fn from_config(config: &Config) -> Self {
        GetOptions {
            graph_size_limit: config.graph_size_limit,
            imports: config.handle_imports.into(),
            skip: config.skip_list(),
            ..GetOptions::default()
        }
    }

    pub fn with_follow(mut self, follow: Follow) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_imports(mut self, imports: ImportHandling) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_graph_size_limit(mut self, limit: usize) -> Self {
        self.graph_size_limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: SkipList) -> Self {
        self.skip = skip;
        self
    }
}
