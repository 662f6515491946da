// src/localization.rs

//! Localization tooling requirement
//!
//! A `POTFILES.in` anywhere in the build tree means the source uses the
//! gettext/intltool machinery, so those tools must have been available at
//! build time. The check is binary: one hit is enough, and the walk stops
//! at the first one.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// The tools a gettext-using source tree needs at build time
pub fn intl_tools() -> BTreeSet<String> {
    ["gettext:runtime", "intltool:runtime"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Localization check outcome
#[derive(Debug, Default)]
pub struct LocalizationReport {
    /// Tool components counted as found (for excess detection)
    pub found: BTreeSet<String>,
    /// Tool components absent from the declared build requirements
    pub missing: BTreeSet<String>,
}

/// Check the build tree for localization tooling requirements
pub fn check_localization(
    build_dir: &Path,
    transitive: &BTreeSet<String>,
) -> LocalizationReport {
    let potfiles = WalkDir::new(build_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == "POTFILES.in");
    let Some(potfiles) = potfiles else {
        return LocalizationReport::default();
    };

    let tools = intl_tools();
    let missing: BTreeSet<String> = tools.difference(transitive).cloned().collect();
    if !missing.is_empty() {
        warn!(
            "missing buildRequires {:?} for file {}",
            missing.iter().collect::<Vec<_>>(),
            potfiles.path().display()
        );
    }
    LocalizationReport {
        found: tools,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_potfiles_triggers_requirement() {
        let build = TempDir::new().unwrap();
        let po = build.path().join("po");
        std::fs::create_dir_all(&po).unwrap();
        std::fs::write(po.join("POTFILES.in"), "src/main.c\n").unwrap();

        let report = check_localization(build.path(), &BTreeSet::new());
        assert!(report.missing.contains("gettext:runtime"));
        assert!(report.missing.contains("intltool:runtime"));
        assert_eq!(report.found, intl_tools());
    }

    #[test]
    fn test_no_potfiles_no_findings() {
        let build = TempDir::new().unwrap();
        let report = check_localization(build.path(), &BTreeSet::new());
        assert!(report.missing.is_empty());
        assert!(report.found.is_empty());
    }

    #[test]
    fn test_declared_tools_are_satisfied() {
        let build = TempDir::new().unwrap();
        std::fs::write(build.path().join("POTFILES.in"), "").unwrap();

        let transitive = intl_tools();
        let report = check_localization(build.path(), &transitive);
        assert!(report.missing.is_empty());
        assert_eq!(report.found, intl_tools());
    }
}
