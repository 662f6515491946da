// src/filedeps.rs

//! File-dependency resolution
//!
//! A requirement on a bare file path is fragile: the owning provider may
//! stop declaring that exact path as a provision even though it still
//! ships the file. When a component requires a path that no provider
//! directly provides but some provider owns, the file requirement is
//! rewritten into a requirement on that provider. Requirements the
//! package satisfies itself and paths matching the exception patterns
//! are left alone.

use crate::deps::{DependKind, DependencyAtom};
use crate::error::Result;
use crate::index::ProviderIndex;
use crate::package::PackageContents;
use regex::Regex;
use tracing::info;

/// Rewrite unresolved file requirements into provider requirements
///
/// Mutates each component's requirement set in place. Paths matching any
/// exception pattern are never rewritten.
pub fn resolve_file_deps(
    index: &dyn ProviderIndex,
    contents: &mut PackageContents,
    exceptions: &[Regex],
) -> Result<()> {
    for component in &mut contents.components {
        let file_deps: Vec<DependencyAtom> = component
            .requires
            .iter_kind(DependKind::File)
            .filter(|atom| !component.provides.contains(atom))
            .filter(|atom| !exceptions.iter().any(|re| re.is_match(&atom.name)))
            .cloned()
            .collect();

        for file_dep in file_deps {
            let owners = index.providers_for_path(&file_dep.name)?;
            let Some(first_owner) = owners.first() else {
                continue;
            };

            // An owner that directly provides the file satisfies the
            // requirement as-is.
            let mut directly_provided = false;
            for owner in &owners {
                if let Some(record) = index.record(owner)?
                    && record.provides.contains(&file_dep)
                {
                    directly_provided = true;
                    break;
                }
            }
            if directly_provided {
                continue;
            }

            info!(
                "Replacing requirement on file {} with a requirement on \
                 trove {} since that file is not directly provided.",
                file_dep.name, first_owner
            );
            component
                .requires
                .add(DependencyAtom::new(DependKind::Trove, first_owner.clone()));
            component.requires.remove(&file_dep);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, ProviderRecord};
    use crate::package::ComponentContents;

    fn file(path: &str) -> DependencyAtom {
        DependencyAtom::new(DependKind::File, path)
    }

    fn trove(name: &str) -> DependencyAtom {
        DependencyAtom::new(DependKind::Trove, name)
    }

    fn package_with_file_req(path: &str) -> PackageContents {
        let mut component = ComponentContents::new("mypkg:runtime");
        component.requires.add(file(path));
        let mut contents = PackageContents::new();
        contents.components.push(component);
        contents
    }

    #[test]
    fn test_owned_but_not_provided_is_rewritten() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("httpd:runtime"));
        index.add_path("httpd:runtime", "/usr/sbin/httpd");

        let mut contents = package_with_file_req("/usr/sbin/httpd");
        resolve_file_deps(&index, &mut contents, &[]).unwrap();

        let requires = &contents.components[0].requires;
        assert!(!requires.contains(&file("/usr/sbin/httpd")));
        assert!(requires.contains(&trove("httpd:runtime")));
    }

    #[test]
    fn test_directly_provided_file_is_kept() {
        let mut index = MemoryIndex::new();
        let mut rec = ProviderRecord::new("httpd:runtime");
        rec.provides.add(file("/usr/sbin/httpd"));
        index.add_provider(rec);
        index.add_path("httpd:runtime", "/usr/sbin/httpd");

        let mut contents = package_with_file_req("/usr/sbin/httpd");
        resolve_file_deps(&index, &mut contents, &[]).unwrap();

        let requires = &contents.components[0].requires;
        assert!(requires.contains(&file("/usr/sbin/httpd")));
        assert!(!requires.contains(&trove("httpd:runtime")));
    }

    #[test]
    fn test_unowned_file_is_left_alone() {
        let index = MemoryIndex::new();
        let mut contents = package_with_file_req("/usr/sbin/nothing");
        resolve_file_deps(&index, &mut contents, &[]).unwrap();

        assert!(contents.components[0]
            .requires
            .contains(&file("/usr/sbin/nothing")));
    }

    #[test]
    fn test_self_provided_file_is_left_alone() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("other:runtime"));
        index.add_path("other:runtime", "/usr/bin/tool");

        let mut contents = package_with_file_req("/usr/bin/tool");
        contents.components[0].provides.add(file("/usr/bin/tool"));
        resolve_file_deps(&index, &mut contents, &[]).unwrap();

        assert!(contents.components[0]
            .requires
            .contains(&file("/usr/bin/tool")));
    }

    #[test]
    fn test_exception_pattern_prevents_rewrite() {
        let mut index = MemoryIndex::new();
        index.add_provider(ProviderRecord::new("httpd:runtime"));
        index.add_path("httpd:runtime", "/usr/sbin/httpd");

        let mut contents = package_with_file_req("/usr/sbin/httpd");
        let exceptions = vec![Regex::new("^/usr/sbin/").unwrap()];
        resolve_file_deps(&index, &mut contents, &exceptions).unwrap();

        assert!(contents.components[0]
            .requires
            .contains(&file("/usr/sbin/httpd")));
    }
}
