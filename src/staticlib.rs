// src/staticlib.rs

//! Static-link evidence from compiler output
//!
//! Shared-library requirements are discovered from the packaged binaries
//! themselves; static linking leaves no such trace. This scanner is the
//! fallback: it watches build output for compiler and linker invocations
//! carrying `-l` flags that no shared-library requirement explains, then
//! probes the link search path for the static archive (or, failing that,
//! the shared object) and maps whatever it finds back to providers.
//!
//! Findings come in four strengths. Exactly one provider is a confident
//! recommendation; several providers is a choice the packager must make;
//! files with no owning provider and names with no files at all are noted
//! at lower severity. A later confident find for the same name retracts
//! the weaker notes.

use crate::candidates::{ExceptionSet, provides_names, reduce_candidates};
use crate::env::{BuildEnv, normpath};
use crate::error::Result;
use crate::index::ProviderIndex;
use crate::package::PackageContents;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of one static-link scan
#[derive(Debug, Default)]
pub struct StaticLinkReport {
    /// Confident recommendations not already in the build requirements
    pub missing: BTreeSet<String>,
    /// Link name → (matched files, candidate providers) where several
    /// providers matched and no confident find superseded it
    pub choices: BTreeMap<String, (BTreeSet<String>, BTreeSet<String>)>,
    /// Link name → matched files owned by no known provider
    pub unowned: BTreeMap<String, BTreeSet<String>>,
    /// Link names with no matching file anywhere on the search path
    pub not_found: BTreeSet<String>,
    /// Every provider that could have satisfied any matched file
    pub all_possible_providers: BTreeSet<String>,
}

/// Scanner for `-l` flags in build output
pub struct StaticLinkScanner<'a> {
    env: &'a BuildEnv,
    index: &'a dyn ProviderIndex,
    exceptions: &'a ExceptionSet,
    /// Transitive build requirements plus names already suggested for
    /// shared libraries; confident finds inside this set are silent
    satisfied: BTreeSet<String>,
    line_re: Regex,
    lib_re: Regex,
    lib_dir_re: Regex,
}

impl<'a> StaticLinkScanner<'a> {
    pub fn new(
        env: &'a BuildEnv,
        index: &'a dyn ProviderIndex,
        exceptions: &'a ExceptionSet,
        satisfied: BTreeSet<String>,
    ) -> Result<Self> {
        let cc = regex::escape(&env.cc);
        let cxx = regex::escape(&env.cxx);
        Ok(Self {
            env,
            index,
            exceptions,
            satisfied,
            line_re: Regex::new(&format!(
                r"^(\+ )?({cc}|{cxx}|ld)( | .* )-l[a-zA-Z]+($| )"
            ))?,
            lib_re: Regex::new(r"^-l[a-zA-Z]+$")?,
            lib_dir_re: Regex::new(r"^-L/..*$")?,
        })
    }

    /// Does this build-output line carry link flags worth scanning?
    pub fn matches_line(&self, line: &str) -> bool {
        self.line_re.is_match(line)
    }

    /// Scan build-output lines and classify every unexplained link name
    pub fn scan<I, S>(&self, lines: I, contents: &PackageContents) -> Result<StaticLinkReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let shared_library_requires = contents.soname_link_names();
        let trove_libraries = contents.packaged_library_names();
        let dest_prefix = self.env.dest_dir.display().to_string();
        let build_prefix = self.env.build_dir.display().to_string();

        // probe location (host filesystem) → path to record
        let base_dirs: BTreeMap<PathBuf, String> = self
            .env
            .lib_dirs
            .iter()
            .map(|dir| {
                let dir = dir.display().to_string();
                (self.env.under_root(&dir), dir)
            })
            .collect();

        let mut build_dir_libs: Option<BTreeSet<String>> = None;
        let mut found_lib_names: BTreeSet<String> = BTreeSet::new();
        let mut report = StaticLinkReport::default();

        for line in lines {
            let line = line.as_ref().trim();
            if !self.line_re.is_match(line) {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();

            let lib_names: BTreeSet<&str> = tokens
                .iter()
                .filter(|t| self.lib_re.is_match(t))
                .map(|t| &t[2..])
                .collect();

            // Per line, extend the system search dirs with any -L flags
            // that point outside the staging and build trees.
            let mut lib_dirs = base_dirs.clone();
            for token in &tokens {
                if !self.lib_dir_re.is_match(token) {
                    continue;
                }
                let dir = token[2..].trim_end_matches('/');
                if dir.starts_with(&dest_prefix) || dir.starts_with(&build_prefix) {
                    continue;
                }
                let dir = normpath(dir);
                lib_dirs
                    .entry(self.env.under_root(&dir))
                    .or_insert_with(|| dir.clone());
                lib_dirs.entry(PathBuf::from(&dir)).or_insert(dir);
            }

            for lib_name in lib_names {
                if found_lib_names.contains(lib_name) {
                    continue;
                }
                if shared_library_requires.contains(lib_name)
                    || trove_libraries.contains(lib_name)
                {
                    found_lib_names.insert(lib_name.to_string());
                    continue;
                }
                // A library built somewhere in the build tree is almost
                // certainly the one being linked.
                let build_libs = build_dir_libs
                    .get_or_insert_with(|| walk_build_dir(&self.env.build_dir));
                if build_libs.contains(lib_name) {
                    found_lib_names.insert(lib_name.to_string());
                    continue;
                }

                let mut found_libs: BTreeSet<String> = BTreeSet::new();
                for (probe_root, record_dir) in &lib_dirs {
                    // If there is no .a, take the .so in case no shared
                    // library dependency was found from packaged files.
                    for ext in ["a", "so"] {
                        let file = format!("lib{lib_name}.{ext}");
                        if probe_root.join(&file).exists() {
                            found_libs.insert(format!("{record_dir}/{file}"));
                            break;
                        }
                    }
                }

                let trove_set = self.providers_of(&found_libs, &mut report)?;

                if trove_set.len() == 1 {
                    let recommended = trove_set.first().cloned().unwrap_or_default();
                    if !self.satisfied.contains(&recommended) {
                        info!(
                            "Add '{}' to buildRequires for -l{} ({})",
                            recommended,
                            lib_name,
                            found_libs
                                .iter()
                                .cloned()
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                        report.missing.insert(recommended);
                        found_lib_names.insert(lib_name.to_string());
                    }
                } else if !trove_set.is_empty() {
                    report
                        .choices
                        .entry(lib_name.to_string())
                        .or_insert((found_libs, trove_set));
                } else if !found_libs.is_empty() {
                    report
                        .unowned
                        .entry(lib_name.to_string())
                        .or_insert(found_libs);
                } else {
                    // keep looking: a later line may carry a useful -L
                    report.not_found.insert(lib_name.to_string());
                }
            }
        }

        // A confident find retracts every weaker note for the same name,
        // and a choice retracts an unowned or not-found note.
        report.choices.retain(|lib_name, (files, troves)| {
            if found_lib_names.contains(lib_name) {
                return false;
            }
            found_lib_names.insert(lib_name.clone());
            warn!(
                "Multiple troves match files {} for -l{}: choose one of the \
                 following entries for buildRequires: '{}'",
                files.iter().cloned().collect::<Vec<_>>().join(" "),
                lib_name,
                troves.iter().cloned().collect::<Vec<_>>().join("', '")
            );
            true
        });
        report.unowned.retain(|lib_name, files| {
            if found_lib_names.contains(lib_name) {
                return false;
            }
            found_lib_names.insert(lib_name.clone());
            info!(
                "No trove found matching any of files {} for -l{}: \
                 possible missing buildRequires",
                files.iter().cloned().collect::<Vec<_>>().join(" "),
                lib_name
            );
            true
        });
        report.not_found.retain(|lib_name| {
            if found_lib_names.contains(lib_name) {
                return false;
            }
            info!(
                "No files found matching -l{lib_name}: possible missing buildRequires"
            );
            true
        });

        if !report.missing.is_empty() {
            info!(
                "add to buildRequires: {:?}",
                report.missing.iter().collect::<Vec<_>>()
            );
        }
        Ok(report)
    }

    /// Map matched library files to the providers a packager could require
    fn providers_of(
        &self,
        found_libs: &BTreeSet<String>,
        report: &mut StaticLinkReport,
    ) -> Result<BTreeSet<String>> {
        let mut trove_set = BTreeSet::new();
        for path in found_libs {
            for provider in self.index.providers_for_path(path)? {
                let mut candidates = Vec::new();
                for name in provides_names(&provider) {
                    if self.index.has_provider(&name)? {
                        candidates.push(name);
                    }
                }
                if candidates.is_empty() {
                    continue;
                }
                report
                    .all_possible_providers
                    .extend(candidates.iter().cloned());
                let reduced = reduce_candidates(self.index, &candidates)?;
                trove_set.extend(self.exceptions.retain_allowed(reduced));
            }
        }
        Ok(trove_set)
    }
}

fn walk_build_dir(build_dir: &Path) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for entry in WalkDir::new(build_dir).into_iter().filter_map(|e| e.ok()) {
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(stem) = file_name.strip_prefix("lib")
            && file_name.contains('.')
            && let Some(name) = stem.split('.').next()
            && !name.is_empty()
        {
            names.insert(name.to_string());
        }
    }
    names
}
