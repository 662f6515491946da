// src/index/mod.rs

//! Provider index (evidence store) interface
//!
//! The index answers three questions: does a provider exist by name, which
//! providers own a given file path, and which providers' provisions
//! intersect a dependency set. It is read-only for the duration of an
//! inference run; records are returned as immutable snapshots.
//!
//! Two implementations ship here: [`MemoryIndex`] for embedding callers
//! and tests, and [`SqliteIndex`] backed by rusqlite.

mod sqlite;

pub use sqlite::SqliteIndex;

use crate::deps::DependencySet;
use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of one installable unit (package:component)
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProviderRecord {
    /// Provider identifier, `pkg:component`
    pub id: String,
    /// Dependency atoms this provider supplies
    pub provides: DependencySet,
    /// Dependency atoms this provider needs
    pub requires: DependencySet,
}

impl ProviderRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Read-only query interface over known providers
pub trait ProviderIndex {
    /// Does a provider with this exact id exist?
    fn has_provider(&self, id: &str) -> Result<bool>;

    /// Providers owning a file path, sorted by id
    fn providers_for_path(&self, path: &str) -> Result<Vec<String>>;

    /// Snapshot of one provider's record
    fn record(&self, id: &str) -> Result<Option<ProviderRecord>>;

    /// For each query set, the sorted provider ids whose provisions
    /// intersect it. The result is parallel to `dep_sets`.
    fn providers_matching(&self, dep_sets: &[DependencySet]) -> Result<Vec<Vec<String>>>;
}

/// In-memory provider index
///
/// Deterministic iteration order throughout, so inference output over the
/// same records is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    records: BTreeMap<String, ProviderRecord>,
    paths: BTreeMap<String, BTreeSet<String>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a provider record
    pub fn add_provider(&mut self, record: ProviderRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Record that a provider owns a file path
    pub fn add_path(&mut self, provider: impl Into<String>, path: impl Into<String>) {
        self.paths
            .entry(path.into())
            .or_default()
            .insert(provider.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ProviderIndex for MemoryIndex {
    fn has_provider(&self, id: &str) -> Result<bool> {
        Ok(self.records.contains_key(id))
    }

    fn providers_for_path(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .paths
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn record(&self, id: &str) -> Result<Option<ProviderRecord>> {
        Ok(self.records.get(id).cloned())
    }

    fn providers_matching(&self, dep_sets: &[DependencySet]) -> Result<Vec<Vec<String>>> {
        let mut results = Vec::with_capacity(dep_sets.len());
        for dep_set in dep_sets {
            let matching: Vec<String> = self
                .records
                .values()
                .filter(|r| !r.provides.intersect(dep_set).is_empty())
                .map(|r| r.id.clone())
                .collect();
            results.push(matching);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{DependKind, DependencyAtom};

    fn record(id: &str, provides: &[(DependKind, &str)], requires: &[(DependKind, &str)]) -> ProviderRecord {
        let mut rec = ProviderRecord::new(id);
        for (kind, name) in provides {
            rec.provides.add(DependencyAtom::new(*kind, *name));
        }
        for (kind, name) in requires {
            rec.requires.add(DependencyAtom::new(*kind, *name));
        }
        rec
    }

    #[test]
    fn test_has_provider() {
        let mut index = MemoryIndex::new();
        index.add_provider(record("openssl:lib", &[(DependKind::Soname, "libssl.so.3")], &[]));
        assert!(index.has_provider("openssl:lib").unwrap());
        assert!(!index.has_provider("openssl:devel").unwrap());
    }

    #[test]
    fn test_providers_for_path() {
        let mut index = MemoryIndex::new();
        index.add_path("openssl:lib", "/usr/lib/libssl.so.3");
        index.add_path("compat-openssl:lib", "/usr/lib/libssl.so.3");
        let providers = index.providers_for_path("/usr/lib/libssl.so.3").unwrap();
        assert_eq!(providers, vec!["compat-openssl:lib", "openssl:lib"]);
        assert!(index.providers_for_path("/nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_providers_matching() {
        let mut index = MemoryIndex::new();
        index.add_provider(record("openssl:lib", &[(DependKind::Soname, "libssl.so.3")], &[]));
        index.add_provider(record("zlib:lib", &[(DependKind::Soname, "libz.so.1")], &[]));

        let query = vec![
            DependencySet::singleton(DependencyAtom::new(DependKind::Soname, "libssl.so.3")),
            DependencySet::singleton(DependencyAtom::new(DependKind::Soname, "libmissing.so.0")),
        ];
        let results = index.providers_matching(&query).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], vec!["openssl:lib"]);
        assert!(results[1].is_empty());
    }
}
