// src/pkgconfig.rs

//! Requirement extraction from pkg-config descriptors
//!
//! Packaged `.pc` files encode their own dependency story: `Requires`
//! lines name other pkg-config modules and `Libs` lines carry `-l`/`-L`
//! link flags. Both are resolved to concrete files, probing the staging
//! directory before the system root so freshly-built modules win, and
//! the files are then mapped to the components that own them.

use crate::candidates::provides_names;
use crate::env::BuildEnv;
use crate::error::Result;
use crate::index::ProviderIndex;
use crate::package::PackageContents;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Parsed contents of one pkg-config descriptor
#[derive(Debug, Default, Clone)]
pub struct PkgConfigFile {
    /// Required pkg-config module names, version constraints stripped
    pub requirements: BTreeSet<String>,
    /// `-L` directories in file order
    pub library_dirs: Vec<String>,
    /// `-l` library names
    pub libraries: BTreeSet<String>,
}

impl PkgConfigFile {
    /// Parse a descriptor from lines already in memory
    pub fn parse_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // A self-referential variable (`a=${a}x`) never converges; cap
        // the passes so a broken descriptor cannot loop forever.
        const MAX_INTERPOLATION_PASSES: usize = 16;

        let variable_re = Regex::new("^[a-zA-Z0-9]+=")?;
        let mut variables: BTreeMap<String, String> = BTreeMap::new();
        let mut parsed = Self::default();

        for raw in lines {
            // interpolate variables: assume variables are interpreted
            // line-by-line while processing
            let mut line = raw.as_ref().trim().to_string();
            let mut passes = 0;
            loop {
                let mut next = line.clone();
                for (var, value) in &variables {
                    next = next.replace(var.as_str(), value);
                }
                if next == line {
                    break;
                }
                line = next;
                passes += 1;
                if passes >= MAX_INTERPOLATION_PASSES {
                    warn!(
                        "variable interpolation did not converge on line: {}",
                        raw.as_ref().trim()
                    );
                    break;
                }
            }

            if variable_re.is_match(&line) {
                if let Some((key, value)) = line.split_once('=') {
                    variables.insert(format!("${{{key}}}"), value.to_string());
                }
                continue;
            }

            if !(line.starts_with("Requires") || line.starts_with("Lib")) {
                continue;
            }
            let Some((keyword, args)) = line.split_once(':') else {
                continue;
            };
            let tokens = args
                .split_whitespace()
                .flat_map(|t| t.split(','))
                .filter(|t| !t.is_empty());

            if keyword.starts_with("Requires") {
                let mut version_next = false;
                for token in tokens {
                    if token.contains(['<', '=', '>']) {
                        version_next = true;
                        continue;
                    }
                    if version_next {
                        version_next = false;
                        continue;
                    }
                    parsed.requirements.insert(token.to_string());
                }
            } else {
                for token in tokens {
                    if let Some(dir) = token.strip_prefix("-L") {
                        if !dir.is_empty() {
                            parsed.library_dirs.push(dir.to_string());
                        }
                    } else if let Some(lib) = token.strip_prefix("-l")
                        && !lib.is_empty()
                    {
                        parsed.libraries.insert(lib.to_string());
                    }
                }
            }
        }
        Ok(parsed)
    }

    /// Parse a descriptor file on disk
    pub fn parse_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?;
        Self::parse_lines(lines)
    }
}

/// What kind of file a resolved requirement points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredFileKind {
    PkgConfig,
    Library,
}

/// One concrete file a descriptor was resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredFile {
    /// Absolute path; staging-directory hits keep the staging prefix
    pub path: String,
    pub kind: RequiredFileKind,
}

/// Resolves parsed descriptors against the staging dir and system root
pub struct PkgConfigResolver<'a> {
    env: &'a BuildEnv,
}

impl<'a> PkgConfigResolver<'a> {
    pub fn new(env: &'a BuildEnv) -> Self {
        Self { env }
    }

    /// Resolve every requirement and library to a concrete file
    ///
    /// Unresolvable entries are warned about and skipped; a missing
    /// module never fails the run.
    pub fn resolve(&self, parsed: &PkgConfigFile) -> Vec<RequiredFile> {
        let mut resolved = Vec::new();

        for req in &parsed.requirements {
            let rel = format!("pkgconfig/{req}.pc");
            let staged = [
                self.env.dest_dir.join(
                    self.env
                        .lib_dir
                        .strip_prefix("/")
                        .unwrap_or(&self.env.lib_dir),
                ),
                self.env.dest_dir.join(
                    self.env
                        .data_dir
                        .strip_prefix("/")
                        .unwrap_or(&self.env.data_dir),
                ),
            ];
            let system = [&self.env.lib_dir, &self.env.data_dir];

            let mut found = None;
            for dir in &staged {
                let candidate = dir.join(&rel);
                if candidate.exists() {
                    found = Some(candidate.display().to_string());
                    break;
                }
            }
            if found.is_none() {
                for dir in system {
                    let candidate = dir.join(&rel);
                    let candidate = candidate.display().to_string();
                    if self.env.exists_under_root(&candidate) {
                        found = Some(candidate);
                        break;
                    }
                }
            }
            match found {
                Some(path) => resolved.push(RequiredFile {
                    path,
                    kind: RequiredFileKind::PkgConfig,
                }),
                None => warn!("pkg-config file {req}.pc not found"),
            }
        }

        // system lib dirs first, then -L dirs not already listed
        let mut library_paths: Vec<String> = self
            .env
            .lib_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        library_paths.sort();
        for dir in &parsed.library_dirs {
            if !library_paths.contains(dir) {
                library_paths.push(dir.clone());
            }
        }

        for library in &parsed.libraries {
            let mut found = None;
            'dirs: for dir in &library_paths {
                let rels: Vec<String> = ["so", "a"]
                    .iter()
                    .map(|s| format!("{}/lib{library}.{s}", dir.trim_end_matches('/')))
                    .collect();
                for rel in &rels {
                    let staged = self.env.dest_dir.join(rel.trim_start_matches('/'));
                    if staged.exists() {
                        found = Some(staged.display().to_string());
                        break 'dirs;
                    }
                }
                for rel in &rels {
                    if self.env.exists_under_root(rel) {
                        found = Some(rel.clone());
                        break 'dirs;
                    }
                }
            }
            match found {
                Some(path) => resolved.push(RequiredFile {
                    path,
                    kind: RequiredFileKind::Library,
                }),
                None => warn!("library file lib{library} not found"),
            }
        }

        resolved
    }
}

/// Map resolved files to the components a requirer should depend on
///
/// Staging-directory files belong to this very package: the owning
/// component is looked up and, for `:lib`/`:devellib`, upgraded to the
/// best non-empty development component. System files are mapped through
/// the provider index; unowned files are warned about and dropped.
pub fn requirement_troves(
    env: &BuildEnv,
    contents: &PackageContents,
    index: &dyn ProviderIndex,
    required: &[RequiredFile],
) -> Result<BTreeSet<String>> {
    let dest_prefix = env.dest_dir.display().to_string();
    let mut troves = BTreeSet::new();

    for file in required {
        if let Some(rel) = file.path.strip_prefix(&dest_prefix) {
            let rel = if rel.starts_with('/') {
                rel.to_string()
            } else {
                format!("/{rel}")
            };
            let Some(component) = contents.owning_component(&rel) else {
                warn!("staged file {rel} is not packaged, cannot map to a component");
                continue;
            };
            let mut chosen = component.to_string();
            if component.ends_with(":lib") || component.ends_with(":devellib") {
                for preferred in provides_names(component) {
                    if contents.has_component(&preferred) {
                        chosen = preferred;
                        break;
                    }
                }
            }
            troves.insert(chosen);
        } else {
            let providers = index.providers_for_path(&file.path)?;
            match providers.first() {
                Some(provider) => {
                    troves.insert(provider.clone());
                }
                None => {
                    let kind = match file.kind {
                        RequiredFileKind::PkgConfig => "pkg-config",
                        RequiredFileKind::Library => "library",
                    };
                    warn!("{kind} file {} not owned by any known component", file.path);
                }
            }
        }
    }
    Ok(troves)
}
