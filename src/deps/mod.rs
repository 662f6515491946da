// src/deps/mod.rs

//! Typed dependency atoms and set algebra
//!
//! Runtime needs are expressed as typed atoms (a shared-library soname, a
//! file path, an interpreter, a language-runtime symbol, a provider name)
//! collected into sets. `difference(requires, provides)` over the union of
//! all package components yields the externally-unsatisfied dependencies
//! that seed every inference pass.
//!
//! # Example
//!
//! ```ignore
//! use conary_buildreqs::deps::{DependKind, DependencyAtom, DependencySet};
//!
//! let mut requires = DependencySet::new();
//! requires.add(DependencyAtom::new(DependKind::Soname, "libssl.so.3"));
//! let provides = DependencySet::new();
//! let unsatisfied = requires.difference(&provides);
//! assert_eq!(unsatisfied.len(), 1);
//! ```

mod atom;
mod set;

pub use atom::{DependKind, DependencyAtom};
pub use set::DependencySet;
