// src/enforce.rs

//! Build-requirement enforcement from runtime dependencies
//!
//! The packaged components' unsatisfied runtime requirements are the
//! primary evidence: anything the package needs at runtime but does not
//! provide itself must have been present at build time. Each requirement
//! kind is enforced separately; for every unsatisfied atom the provider
//! index is consulted, providers are expanded to their preferred
//! development components, and whatever the declared build requirements
//! do not already cover is reported as missing, as an explicit choice
//! when several non-redundant candidates remain.

use crate::candidates::{ExceptionSet, provides_names, reduce_candidates};
use crate::deps::{DependKind, DependencyAtom, DependencySet};
use crate::error::Result;
use crate::index::ProviderIndex;
use crate::package::PackageContents;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Enforcement outcome for one dependency kind
#[derive(Debug, Default)]
pub struct KindReport {
    /// Candidates that should be added to the build requirements
    pub missing: BTreeSet<String>,
    /// Groups where the packager must pick one candidate
    pub choices: Vec<BTreeSet<String>>,
    /// Every candidate seen satisfying some requirement, before
    /// exceptions; feeds excess-requirement detection
    pub found: BTreeSet<String>,
    /// Requirements no known provider satisfies, rendered as strings
    pub unprovided: Vec<String>,
    /// Packaged path → requirement strings it cannot satisfy at build time
    pub path_requirements: BTreeMap<String, BTreeSet<String>>,
}

impl KindReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
            && self.choices.is_empty()
            && self.unprovided.is_empty()
            && self.path_requirements.is_empty()
    }
}

/// Enforces build requirements for a package snapshot
pub struct BuildReqEnforcer<'a> {
    index: &'a dyn ProviderIndex,
    contents: &'a PackageContents,
    /// Transitive closure of the declared build requirements
    transitive: &'a BTreeSet<String>,
    exceptions: &'a ExceptionSet,
    path_filter: Option<Box<dyn Fn(&str) -> bool + 'a>>,
}

impl<'a> BuildReqEnforcer<'a> {
    pub fn new(
        index: &'a dyn ProviderIndex,
        contents: &'a PackageContents,
        transitive: &'a BTreeSet<String>,
        exceptions: &'a ExceptionSet,
    ) -> Self {
        Self {
            index,
            contents,
            transitive,
            exceptions,
            path_filter: None,
        }
    }

    /// Restrict per-path reporting to paths accepted by the filter
    pub fn with_path_filter(mut self, filter: impl Fn(&str) -> bool + 'a) -> Self {
        self.path_filter = Some(Box::new(filter));
        self
    }

    fn path_allowed(&self, path: &str) -> bool {
        self.path_filter.as_ref().is_none_or(|f| f(path))
    }

    /// Enforce one dependency kind
    pub fn enforce_kind(&self, kind: DependKind) -> Result<KindReport> {
        let mut report = KindReport::default();
        let unsatisfied = self.contents.unsatisfied_requires().by_kind(kind);
        let atoms: Vec<DependencyAtom> = unsatisfied.iter().cloned().collect();
        if atoms.is_empty() {
            return Ok(report);
        }

        // CIL dependency discovery itself needs the mono toolchain
        if kind == DependKind::Cil && !self.transitive.contains("mono:devel") {
            report.missing.insert("mono:devel".to_string());
        }

        let dep_sets: Vec<DependencySet> = atoms
            .iter()
            .cloned()
            .map(DependencySet::singleton)
            .collect();
        let providers = self.index.providers_matching(&dep_sets)?;

        let mut interpreters: BTreeSet<String> = BTreeSet::new();

        for (atom, provider_names) in atoms.iter().zip(&providers) {
            if provider_names.is_empty() {
                report.unprovided.push(atom.to_string());
                continue;
            }

            // Expand each provider to its best existing component.
            let mut found_candidates: BTreeSet<String> = BTreeSet::new();
            for name in provider_names {
                for candidate in provides_names(name) {
                    if self.index.has_provider(&candidate)? {
                        found_candidates.insert(candidate);
                        break;
                    }
                }
            }
            report.found.extend(found_candidates.iter().cloned());

            let allowed = self.exceptions.filter_set(&found_candidates);
            let none_declared = allowed.iter().all(|c| !self.transitive.contains(c));
            if !allowed.is_empty() && none_declared {
                if allowed.len() > 1 {
                    let ordered: Vec<String> = allowed.iter().cloned().collect();
                    let reduced = reduce_candidates(self.index, &ordered)?;
                    if reduced.len() == 1 {
                        report.missing.extend(reduced);
                    } else {
                        let choice: BTreeSet<String> = reduced.into_iter().collect();
                        if !report.choices.contains(&choice) {
                            report.choices.push(choice);
                        }
                    }
                } else if let Some(single) = allowed.first() {
                    report.missing.insert(single.clone());
                }

                // Specific per-path information helps when the summary
                // alone does not look obvious.
                let mut path_list = Vec::new();
                for (path, info) in &self.contents.path_map {
                    if self.path_allowed(path) && info.requires.contains(atom) {
                        path_list.push(path.clone());
                        report
                            .path_requirements
                            .entry(path.clone())
                            .or_default()
                            .insert(atom.to_string());
                    }
                }
                if !path_list.is_empty() {
                    warn!(
                        "buildRequires {:?} needed to satisfy \"{}\" for files: {}",
                        allowed.iter().collect::<Vec<_>>(),
                        atom,
                        path_list.join(", ")
                    );
                }
            }

            for (path, info) in &self.contents.path_map {
                if self.path_allowed(path)
                    && let Some(interpreter) = &info.interpreter
                    && info.requires.contains(atom)
                {
                    interpreters.insert(interpreter.clone());
                }
            }
        }

        for interpreter in interpreters {
            for trove in self.index.providers_for_path(&interpreter)? {
                if !self.transitive.contains(&trove) {
                    warn!("interpreter {interpreter} missing build requirement {trove}");
                    report.missing.insert(trove);
                }
            }
        }

        for (path, deps) in &report.path_requirements {
            warn!(
                "file {} has unsatisfied build requirements \"{}\"",
                path,
                deps.iter().cloned().collect::<Vec<_>>().join("\", \"")
            );
        }
        if !report.missing.is_empty() {
            warn!(
                "add to buildRequires: {:?}",
                report.missing.iter().collect::<Vec<_>>()
            );
        }
        for choice in &report.choices {
            warn!(
                "add to buildRequires one of: {:?}",
                choice.iter().collect::<Vec<_>>()
            );
        }
        if !report.unprovided.is_empty() {
            warn!(
                "The following dependencies are not resolved within the \
                 package or in the provider index: {:?}",
                report.unprovided
            );
            warn!(
                "The package may not function if installed; if these are \
                 really provided within the package, except them from \
                 requirement discovery"
            );
        }
        Ok(report)
    }
}
