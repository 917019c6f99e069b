//! Provides functionality for diagnosing potential issues within an `LdEnv`.
//! Defines traits and structs for environment checks and reporting problems.

use crate::api::LdEnv;
use crate::errors::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentProblem {
    pub documents: Vec<String>,
    pub message: String,
}

impl fmt::Display for DocumentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.documents.join(", "))
    }
}

pub trait EnvironmentCheck {
    fn name(&self) -> &str;
    fn check(&mut self, env: &LdEnv, problems: &mut Vec<DocumentProblem>) -> Result<()>;
}

pub struct Doctor {
    checks: Vec<Box<dyn EnvironmentCheck>>,
}

impl Default for Doctor {
    fn default() -> Self {
        let mut doctor = Self::new();
        doctor.add_check(Box::new(ConflictingPrefixes {}));
        doctor.add_check(Box::new(DocumentErrors {}));
        doctor
    }
}

impl Doctor {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn add_check(&mut self, check: Box<dyn EnvironmentCheck>) {
        self.checks.push(check);
    }

    pub fn run(&mut self, env: &LdEnv) -> Result<Vec<DocumentProblem>> {
        let mut problems = Vec::new();
        for check in &mut self.checks {
            log::debug!("Running check: {}", check.name());
            check.check(env, &mut problems)?;
        }
        Ok(problems)
    }
}

/// A prefix bound to different namespaces by different documents. Attribute names of such
/// documents are not comparable.
pub struct ConflictingPrefixes {}

impl EnvironmentCheck for ConflictingPrefixes {
    fn name(&self) -> &str {
        "Conflicting Prefixes"
    }

    fn check(&mut self, env: &LdEnv, problems: &mut Vec<DocumentProblem>) -> Result<()> {
        // prefix -> { namespace -> [documents] }
        let mut prefix_map: BTreeMap<&str, BTreeMap<&str, Vec<String>>> = BTreeMap::new();
        for document in env.documents().iter().filter(|d| d.snapshot().is_some()) {
            for (prefix, namespace) in document.prefixes().iter() {
                prefix_map
                    .entry(prefix)
                    .or_default()
                    .entry(namespace)
                    .or_default()
                    .push(document.iri().to_string());
            }
        }

        for (prefix, namespaces) in prefix_map {
            if namespaces.len() > 1 {
                let listed: Vec<&str> = namespaces.keys().copied().collect();
                let documents: BTreeSet<String> = namespaces.into_values().flatten().collect();
                problems.push(DocumentProblem {
                    documents: documents.into_iter().collect(),
                    message: format!(
                        "Conflicting namespace definitions for prefix '{}': {}",
                        prefix,
                        listed.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

pub struct DocumentErrors {}

impl EnvironmentCheck for DocumentErrors {
    fn name(&self) -> &str {
        "Document Errors"
    }

    fn check(&mut self, env: &LdEnv, problems: &mut Vec<DocumentProblem>) -> Result<()> {
        for document in env.documents().iter().filter(|d| d.has_errors()) {
            let errors: Vec<String> = document.errors().iter().map(|e| e.to_string()).collect();
            problems.push(DocumentProblem {
                documents: vec![document.iri().to_string()],
                message: format!("Recorded errors: {}", errors.join(", ")),
            });
        }
        Ok(())
    }
}
