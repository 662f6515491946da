// src/report.rs

//! Aggregated inference output
//!
//! Every scanner and enforcement pass produces partial findings; this
//! module folds them into one report with two coalesced streams: names
//! that should be added to the build requirements, and names observed
//! satisfying some requirement (which feed excess-requirement
//! detection). Absorbing the same findings twice changes nothing, and
//! absorption order does not affect the result.

use crate::candidates::{ExceptionSet, provides_names};
use crate::enforce::KindReport;
use crate::error::Result;
use crate::index::ProviderIndex;
use crate::staticlib::StaticLinkReport;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Coalesced findings of one inference run
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BuildReqReport {
    /// Names to add to the build requirements
    pub missing: BTreeSet<String>,
    /// Candidate groups where the packager must pick one entry
    pub choices: Vec<BTreeSet<String>>,
    /// Names observed satisfying some requirement, before exceptions
    pub found: BTreeSet<String>,
    /// Requirement strings no known provider satisfies
    pub unprovided: BTreeSet<String>,
    /// Packaged path → requirement strings unsatisfied at build time
    pub path_requirements: BTreeMap<String, BTreeSet<String>>,
    /// Link name → library files owned by no known provider
    pub unowned_libraries: BTreeMap<String, BTreeSet<String>>,
    /// Link names with no matching library file at all
    pub unlocated_libraries: BTreeSet<String>,
}

impl BuildReqReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
            && self.choices.is_empty()
            && self.unprovided.is_empty()
            && self.path_requirements.is_empty()
            && self.unowned_libraries.is_empty()
            && self.unlocated_libraries.is_empty()
    }

    /// Add a choice group unless an identical group is already present
    pub fn add_choice(&mut self, choice: BTreeSet<String>) {
        if !choice.is_empty() && !self.choices.contains(&choice) {
            self.choices.push(choice);
        }
    }

    /// Fold in one dependency kind's enforcement outcome
    pub fn absorb_kind(&mut self, report: KindReport) {
        self.missing.extend(report.missing);
        for choice in report.choices {
            self.add_choice(choice);
        }
        self.found.extend(report.found);
        self.unprovided.extend(report.unprovided);
        for (path, deps) in report.path_requirements {
            self.path_requirements.entry(path).or_default().extend(deps);
        }
    }

    /// Fold in the static-link scanner's outcome
    pub fn absorb_static(&mut self, report: StaticLinkReport) {
        self.missing.extend(report.missing);
        for (_, (_, troves)) in report.choices {
            self.add_choice(troves);
        }
        for (lib_name, files) in report.unowned {
            self.unowned_libraries
                .entry(lib_name)
                .or_default()
                .extend(files);
        }
        self.unlocated_libraries.extend(report.not_found);
        self.found.extend(report.all_possible_providers);
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: BuildReqReport) {
        self.missing.extend(other.missing);
        for choice in other.choices {
            self.add_choice(choice);
        }
        self.found.extend(other.found);
        self.unprovided.extend(other.unprovided);
        for (path, deps) in other.path_requirements {
            self.path_requirements.entry(path).or_default().extend(deps);
        }
        for (lib_name, files) in other.unowned_libraries {
            self.unowned_libraries
                .entry(lib_name)
                .or_default()
                .extend(files);
        }
        self.unlocated_libraries.extend(other.unlocated_libraries);
    }

    /// Declared build requirements never observed satisfying anything
    pub fn excess_requires(&self, declared: &BTreeSet<String>) -> BTreeSet<String> {
        declared.difference(&self.found).cloned().collect()
    }
}

/// Turn file evidence from log scanners into requirement suggestions
///
/// For each path the build was seen to consult, the owning providers are
/// expanded to their preferred components; all existing candidates count
/// as found, the best one is suggested when the declared requirements do
/// not already cover it. Returns `(missing, found)`.
pub fn suggest_from_paths(
    index: &dyn ProviderIndex,
    transitive: &BTreeSet<String>,
    exceptions: &ExceptionSet,
    paths: &BTreeSet<String>,
) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
    let mut found = BTreeSet::new();
    let mut file_reqs: BTreeSet<String> = BTreeSet::new();

    for path in paths {
        for provider in index.providers_for_path(path)? {
            let mut candidates = Vec::new();
            for candidate in provides_names(&provider) {
                if index.has_provider(&candidate)? && !exceptions.is_excepted(&candidate) {
                    candidates.push(candidate);
                }
            }
            // none of these candidates counts as excessive
            found.extend(candidates.iter().cloned());
            // suggest only the best choice
            let Some(best) = candidates.first() else {
                continue;
            };
            if !transitive.contains(best) {
                warn!("path {path} suggests buildRequires: {best}");
            }
            file_reqs.insert(best.clone());
        }
    }

    let missing: BTreeSet<String> = file_reqs
        .difference(transitive)
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!(
            "Probably add to buildRequires: {:?}",
            missing.iter().collect::<Vec<_>>()
        );
    }
    Ok((missing, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, ProviderRecord};

    fn kind_report(missing: &[&str], found: &[&str]) -> KindReport {
        let mut report = KindReport::default();
        report.missing = missing.iter().map(|s| s.to_string()).collect();
        report.found = found.iter().map(|s| s.to_string()).collect();
        report
    }

    // ====================
    // Aggregation
    // ====================

    #[test]
    fn test_absorb_is_idempotent() {
        let mut once = BuildReqReport::new();
        once.absorb_kind(kind_report(&["a:devel"], &["a:devel", "b:lib"]));

        let mut twice = once.clone();
        twice.absorb_kind(kind_report(&["a:devel"], &["a:devel", "b:lib"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_order_independent() {
        let r1 = kind_report(&["a:devel"], &["a:devel"]);
        let r2 = kind_report(&["b:devel"], &["b:devel"]);

        let mut forward = BuildReqReport::new();
        forward.absorb_kind(kind_report(&["a:devel"], &["a:devel"]));
        forward.absorb_kind(r2);

        let mut backward = BuildReqReport::new();
        backward.absorb_kind(kind_report(&["b:devel"], &["b:devel"]));
        backward.absorb_kind(r1);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_choice_groups_deduplicated() {
        let mut report = BuildReqReport::new();
        let choice: BTreeSet<String> =
            ["x:devel".to_string(), "y:devel".to_string()].into();
        report.add_choice(choice.clone());
        report.add_choice(choice);
        assert_eq!(report.choices.len(), 1);
    }

    #[test]
    fn test_excess_requires() {
        let mut report = BuildReqReport::new();
        report.found.insert("used:devel".to_string());
        let declared: BTreeSet<String> =
            ["used:devel".to_string(), "unused:devel".to_string()].into();
        let excess = report.excess_requires(&declared);
        assert_eq!(excess.len(), 1);
        assert!(excess.contains("unused:devel"));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut report = BuildReqReport::new();
        report.missing.insert("openssl:devel".to_string());
        let json = serde_json::to_string(&report).unwrap();
        let back: BuildReqReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }

    // ====================
    // Path suggestions
    // ====================

    #[test]
    fn test_suggest_from_paths() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("pcre:devel"));
        index.add_provider(ProviderRecord::new("pcre:lib"));
        index.add_path("pcre:lib", "/usr/bin/pcregrep");

        let paths: BTreeSet<String> = ["/usr/bin/pcregrep".to_string()].into();
        let transitive = BTreeSet::new();
        let exceptions = ExceptionSet::new();
        let (missing, found) =
            suggest_from_paths(&index, &transitive, &exceptions, &paths).unwrap();

        // pcre:lib expands to the devel-first preference list; the best
        // existing entry is suggested, every existing entry is found
        assert!(missing.contains("pcre:devel"));
        assert!(found.contains("pcre:devel"));
        assert!(found.contains("pcre:lib"));
    }

    #[test]
    fn test_suggest_respects_transitive_closure() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("grep:runtime"));
        index.add_path("grep:runtime", "/usr/bin/grep");

        let paths: BTreeSet<String> = ["/usr/bin/grep".to_string()].into();
        let transitive: BTreeSet<String> = ["grep:runtime".to_string()].into();
        let exceptions = ExceptionSet::new();
        let (missing, found) =
            suggest_from_paths(&index, &transitive, &exceptions, &paths).unwrap();
        assert!(missing.is_empty());
        assert!(found.contains("grep:runtime"));
    }

    #[test]
    fn test_suggest_skips_excepted_candidates() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("flex:runtime"));
        index.add_path("flex:runtime", "/usr/bin/flex");

        let paths: BTreeSet<String> = ["/usr/bin/flex".to_string()].into();
        let transitive = BTreeSet::new();
        let exceptions = ExceptionSet::from_exceptions(["flex:runtime"]).unwrap();
        let (missing, found) =
            suggest_from_paths(&index, &transitive, &exceptions, &paths).unwrap();
        assert!(missing.is_empty());
        assert!(found.is_empty());
    }
}
