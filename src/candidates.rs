// src/candidates.rs

//! Candidate expansion, reduction, and exception filtering
//!
//! A low-level dependency rarely names the component a packager should
//! require. Library components come in a three-tier chain
//! (`:devel` ⊃ `:devellib` ⊃ `:lib`), so a `:lib` provider first expands
//! to the preference list `[pkg:devel, pkg:devellib, pkg:lib]`, and a
//! group of surviving candidates is then reduced to its minimal
//! non-redundant subset using the pairwise satisfies relation.

use crate::error::Result;
use crate::index::ProviderIndex;
use regex::Regex;
use std::collections::BTreeSet;

/// Expand a provider name into its ordered preference list
///
/// For `pkg:lib` and `pkg:devellib` the header-providing `:devel`
/// component is preferred, then the soname-link `:devellib`, then the
/// runtime-only `:lib`. Any other name maps to itself.
pub fn provides_names(name: &str) -> Vec<String> {
    if name.ends_with(":lib") || name.ends_with(":devellib") {
        let pkg = name.split(':').next().unwrap_or(name);
        vec![
            format!("{pkg}:devel"),
            format!("{pkg}:devellib"),
            format!("{pkg}:lib"),
        ]
    } else {
        vec![name.to_string()]
    }
}

/// Does candidate `a` subsume candidate `b`?
///
/// True iff `a`'s provisions intersect `b`'s requirements, meaning that
/// requiring `a` pulls `b` in anyway (typically `:devel` over
/// `:devellib`). Unknown providers never satisfy anything.
fn satisfies(index: &dyn ProviderIndex, a: &str, b: &str) -> Result<bool> {
    let (Some(rec_a), Some(rec_b)) = (index.record(a)?, index.record(b)?) else {
        return Ok(false);
    };
    Ok(!rec_a.provides.intersect(&rec_b.requires).is_empty())
}

/// Reduce a candidate group to its minimal non-redundant subset
///
/// Recursive greedy pairwise reduction: the first two candidates are
/// compared; whichever subsumes the other survives and the reduction
/// recurses. When neither subsumes the other, both branches are reduced
/// independently against the remainder and the union of the results is
/// returned sorted and deduplicated; with no remainder both candidates
/// are retained as an ambiguous pair. Worst case is exponential in the
/// candidate count, but groups are tiny in practice (almost always a
/// `:devel`/`:devellib` pair).
pub fn reduce_candidates(index: &dyn ProviderIndex, candidates: &[String]) -> Result<Vec<String>> {
    if candidates.len() < 2 {
        return Ok(candidates.to_vec());
    }

    let a = &candidates[0];
    let b = &candidates[1];
    let rest = &candidates[2..];

    if satisfies(index, a, b)? {
        let mut next = vec![a.clone()];
        next.extend_from_slice(rest);
        return reduce_candidates(index, &next);
    }
    if satisfies(index, b, a)? {
        let mut next = vec![b.clone()];
        next.extend_from_slice(rest);
        return reduce_candidates(index, &next);
    }

    if !rest.is_empty() {
        let mut left = vec![a.clone()];
        left.extend_from_slice(rest);
        let mut right = vec![b.clone()];
        right.extend_from_slice(rest);

        let mut merged = reduce_candidates(index, &left)?;
        merged.extend(reduce_candidates(index, &right)?);
        merged.sort();
        merged.dedup();
        return Ok(merged);
    }

    Ok(vec![a.clone(), b.clone()])
}

/// Exclusions applied before any candidate is reported missing
///
/// Exact `pkg:component` ids are matched literally; anything else is
/// compiled as an anchored regex. Package-internal component names are
/// added as exact exclusions so a package never suggests requiring
/// itself.
#[derive(Debug, Default)]
pub struct ExceptionSet {
    exact: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from user-supplied exception strings
    pub fn from_exceptions<I, S>(exceptions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // A plain `pkg:component` id is a literal, never a prefix; any
        // metacharacter makes the whole entry an anchored regex.
        let component_re = Regex::new("^[a-zA-Z0-9]+:[a-zA-Z0-9]+$")?;
        let mut set = Self::new();
        for exception in exceptions {
            let exception = exception.as_ref();
            if component_re.is_match(exception) {
                set.exact.insert(exception.to_string());
            } else {
                set.patterns.push(Regex::new(&format!("^(?:{exception})"))?);
            }
        }
        Ok(set)
    }

    /// Add an exact component id exclusion
    pub fn insert_exact(&mut self, id: impl Into<String>) {
        self.exact.insert(id.into());
    }

    /// Is this candidate excluded?
    pub fn is_excepted(&self, id: &str) -> bool {
        self.exact.contains(id) || self.patterns.iter().any(|re| re.is_match(id))
    }

    /// Filter a candidate set, dropping excluded entries
    pub fn filter_set(&self, candidates: &BTreeSet<String>) -> BTreeSet<String> {
        candidates
            .iter()
            .filter(|c| !self.is_excepted(c))
            .cloned()
            .collect()
    }

    /// Filter an ordered candidate list, preserving order
    pub fn retain_allowed(&self, candidates: Vec<String>) -> Vec<String> {
        candidates
            .into_iter()
            .filter(|c| !self.is_excepted(c))
            .collect()
    }
}
