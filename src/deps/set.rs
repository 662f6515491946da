// src/deps/set.rs

//! Dependency set algebra
//!
//! A `DependencySet` maps atoms to occurrence counts. The combinators are
//! pure: they never mutate their inputs and return freshly-built sets, so
//! a snapshot taken at the start of an inference run stays valid for the
//! whole run.

use super::{DependKind, DependencyAtom};
use std::collections::BTreeMap;
use std::fmt;

/// A set of typed dependency atoms with occurrence counts
///
/// Invariant: no duplicate atoms; adding an already-present atom bumps its
/// occurrence count and merges flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DependencySet {
    atoms: BTreeMap<DependencyAtom, u32>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one atom occurrence
    pub fn add(&mut self, atom: DependencyAtom) {
        *self.atoms.entry(atom).or_insert(0) += 1;
    }

    /// Remove an atom entirely, returning whether it was present
    pub fn remove(&mut self, atom: &DependencyAtom) -> bool {
        self.atoms.remove(atom).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn contains(&self, atom: &DependencyAtom) -> bool {
        self.atoms.contains_key(atom)
    }

    /// Occurrence count for an atom, zero if absent
    pub fn count(&self, atom: &DependencyAtom) -> u32 {
        self.atoms.get(atom).copied().unwrap_or(0)
    }

    /// Iterate atoms in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &DependencyAtom> {
        self.atoms.keys()
    }

    /// Iterate only the atoms of one kind
    pub fn iter_kind(&self, kind: DependKind) -> impl Iterator<Item = &DependencyAtom> {
        self.atoms.keys().filter(move |a| a.kind == kind)
    }

    /// All atoms present in either set; counts are summed
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (atom, count) in &other.atoms {
            *result.atoms.entry(atom.clone()).or_insert(0) += count;
        }
        result
    }

    /// Atoms present in `self` but not in `other`
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .filter(|(atom, _)| !other.contains(atom))
                .map(|(atom, count)| (atom.clone(), *count))
                .collect(),
        }
    }

    /// Atoms present in both sets; counts come from `self`
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .filter(|(atom, _)| other.contains(atom))
                .map(|(atom, count)| (atom.clone(), *count))
                .collect(),
        }
    }

    /// The subset of one kind
    pub fn by_kind(&self, kind: DependKind) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .filter(|(atom, _)| atom.kind == kind)
                .map(|(atom, count)| (atom.clone(), *count))
                .collect(),
        }
    }

    /// A singleton set holding one atom
    pub fn singleton(atom: DependencyAtom) -> Self {
        let mut set = Self::new();
        set.add(atom);
        set
    }
}

impl FromIterator<DependencyAtom> for DependencySet {
    fn from_iter<I: IntoIterator<Item = DependencyAtom>>(iter: I) -> Self {
        let mut set = Self::new();
        for atom in iter {
            set.add(atom);
        }
        set
    }
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for atom in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{atom}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soname(name: &str) -> DependencyAtom {
        DependencyAtom::new(DependKind::Soname, name)
    }

    fn python(name: &str) -> DependencyAtom {
        DependencyAtom::new(DependKind::Python, name)
    }

    #[test]
    fn test_no_duplicate_atoms() {
        let mut set = DependencySet::new();
        set.add(soname("libz.so.1"));
        set.add(soname("libz.so.1"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.count(&soname("libz.so.1")), 2);
    }

    #[test]
    fn test_union_does_not_mutate() {
        let a: DependencySet = [soname("liba.so.1")].into_iter().collect();
        let b: DependencySet = [soname("libb.so.1")].into_iter().collect();
        let u = a.union(&b);
        assert_eq!(u.len(), 2);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_difference_seeds_inference() {
        let requires: DependencySet = [soname("libssl.so.3"), soname("libinternal.so.0")]
            .into_iter()
            .collect();
        let provides: DependencySet = [soname("libinternal.so.0")].into_iter().collect();
        let unsatisfied = requires.difference(&provides);
        assert_eq!(unsatisfied.len(), 1);
        assert!(unsatisfied.contains(&soname("libssl.so.3")));
    }

    #[test]
    fn test_intersect() {
        let a: DependencySet = [soname("libz.so.1"), python("requests")].into_iter().collect();
        let b: DependencySet = [python("requests")].into_iter().collect();
        let i = a.intersect(&b);
        assert_eq!(i.len(), 1);
        assert!(i.contains(&python("requests")));
    }

    #[test]
    fn test_by_kind() {
        let set: DependencySet = [soname("libz.so.1"), python("requests"), python("flask")]
            .into_iter()
            .collect();
        let py = set.by_kind(DependKind::Python);
        assert_eq!(py.len(), 2);
        assert!(py.iter().all(|a| a.kind == DependKind::Python));
        assert_eq!(set.len(), 3);
    }
}
