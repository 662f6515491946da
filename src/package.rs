// src/package.rs

//! Snapshot of the package being built
//!
//! The packaging framework owns the real file and component model; this
//! crate only needs a read-only view of it: which components exist, what
//! each provides and requires, and per-path detail (owning component,
//! file-level requirements, script interpreter). The snapshot is built by
//! the caller once per inference run.

use crate::deps::{DependKind, DependencySet};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

/// One component of the package under build
#[derive(Debug, Clone, Default)]
pub struct ComponentContents {
    /// Component id, `pkg:component`
    pub name: String,
    pub provides: DependencySet,
    pub requires: DependencySet,
}

impl ComponentContents {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Per-path detail for one packaged file
#[derive(Debug, Clone, Default)]
pub struct PathInfo {
    /// Component this path was assigned to
    pub component: String,
    /// File-level requirements (subset of the component's)
    pub requires: DependencySet,
    /// Script interpreter path, when the file is a script with one
    pub interpreter: Option<String>,
}

/// Read-only view of the package being built
#[derive(Debug, Clone, Default)]
pub struct PackageContents {
    pub components: Vec<ComponentContents>,
    /// Packaged path → detail
    pub path_map: BTreeMap<String, PathInfo>,
}

impl PackageContents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all component requirements
    pub fn requires_union(&self) -> DependencySet {
        self.components
            .iter()
            .fold(DependencySet::new(), |acc, c| acc.union(&c.requires))
    }

    /// Union of all component provisions
    pub fn provides_union(&self) -> DependencySet {
        self.components
            .iter()
            .fold(DependencySet::new(), |acc, c| acc.union(&c.provides))
    }

    /// Requirements not satisfied within the package itself
    pub fn unsatisfied_requires(&self) -> DependencySet {
        self.requires_union().difference(&self.provides_union())
    }

    /// All component ids in this package
    pub fn component_names(&self) -> BTreeSet<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    /// The component owning a packaged path
    pub fn owning_component(&self, path: &str) -> Option<&str> {
        self.path_map.get(path).map(|info| info.component.as_str())
    }

    /// Does a non-empty component with this id exist?
    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name == name)
    }

    /// Library base names packaged by this build, e.g. `z` for
    /// `/usr/lib/libz.so.1`. Used to suppress self-satisfying link flags.
    pub fn packaged_library_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for path in self.path_map.keys() {
            let Some(basename) = Path::new(path).file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(stem) = basename.strip_prefix("lib")
                && basename.contains('.')
                && let Some(name) = stem.split('.').next()
                && !name.is_empty()
            {
                names.insert(name.to_string());
            }
        }
        names
    }

    /// Shared-library link names this package already requires, with and
    /// without the `lib` prefix (e.g. `ssl` and `libssl` for
    /// `libssl.so.3`).
    pub fn soname_link_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for atom in self.requires_union().iter_kind(DependKind::Soname) {
            let basename = Path::new(&atom.name)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&atom.name);
            let Some(stem) = basename.split('.').next() else {
                continue;
            };
            names.insert(stem.to_string());
            if let Some(short) = stem.strip_prefix("lib") {
                names.insert(short.to_string());
            } else {
                names.insert(format!("lib{stem}"));
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencyAtom;

    fn soname(name: &str) -> DependencyAtom {
        DependencyAtom::new(DependKind::Soname, name)
    }

    fn sample_package() -> PackageContents {
        let mut runtime = ComponentContents::new("mypkg:runtime");
        runtime.requires.add(soname("libssl.so.3"));
        runtime.requires.add(soname("libinternal.so.0"));

        let mut lib = ComponentContents::new("mypkg:lib");
        lib.provides.add(soname("libinternal.so.0"));

        let mut contents = PackageContents::new();
        contents.components = vec![runtime, lib];
        contents.path_map.insert(
            "/usr/lib/libinternal.so.0".to_string(),
            PathInfo {
                component: "mypkg:lib".to_string(),
                ..Default::default()
            },
        );
        contents
    }

    #[test]
    fn test_unsatisfied_requires() {
        let contents = sample_package();
        let unsatisfied = contents.unsatisfied_requires();
        assert_eq!(unsatisfied.len(), 1);
        assert!(unsatisfied.contains(&soname("libssl.so.3")));
    }

    #[test]
    fn test_component_names() {
        let contents = sample_package();
        let names = contents.component_names();
        assert!(names.contains("mypkg:runtime"));
        assert!(names.contains("mypkg:lib"));
    }

    #[test]
    fn test_packaged_library_names() {
        let contents = sample_package();
        let names = contents.packaged_library_names();
        assert!(names.contains("internal"));
    }

    #[test]
    fn test_soname_link_names() {
        let contents = sample_package();
        let names = contents.soname_link_names();
        assert!(names.contains("libssl"));
        assert!(names.contains("ssl"));
        assert!(names.contains("internal"));
    }
}
