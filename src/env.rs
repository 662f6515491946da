// src/env.rs

//! Build environment paths
//!
//! The original recipe framework resolved these locations through macro
//! interpolation. Here they arrive already resolved: the caller fills in
//! the target root, the build and install staging trees, and the toolchain
//! binary names, and every scanner consults this one struct.

use std::path::{Path, PathBuf};

/// Resolved paths and toolchain names for one inference run
#[derive(Debug, Clone)]
pub struct BuildEnv {
    /// Target filesystem root that installed packages live under
    pub root: PathBuf,
    /// Build tree (sources are configured and compiled here)
    pub build_dir: PathBuf,
    /// Install staging tree (the package's files land here)
    pub dest_dir: PathBuf,
    /// System include directory seeded into header searches
    pub include_dir: PathBuf,
    /// System binary directory (greylist entries point here)
    pub bin_dir: PathBuf,
    /// Architecture-independent data directory (pkgconfig descriptors)
    pub data_dir: PathBuf,
    /// Primary library directory
    pub lib_dir: PathBuf,
    /// All system library search directories
    pub lib_dirs: Vec<PathBuf>,
    /// C compiler binary name
    pub cc: String,
    /// C++ compiler binary name
    pub cxx: String,
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            build_dir: PathBuf::from("/var/tmp/build"),
            dest_dir: PathBuf::from("/var/tmp/dest"),
            include_dir: PathBuf::from("/usr/include"),
            bin_dir: PathBuf::from("/usr/bin"),
            data_dir: PathBuf::from("/usr/share"),
            lib_dir: PathBuf::from("/usr/lib"),
            lib_dirs: vec![PathBuf::from("/usr/lib"), PathBuf::from("/usr/lib64")],
            cc: "gcc".to_string(),
            cxx: "g++".to_string(),
        }
    }
}

impl BuildEnv {
    /// Join an absolute target path onto the target root
    pub fn under_root(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Check whether an absolute target path exists under the target root
    pub fn exists_under_root(&self, path: &str) -> bool {
        self.under_root(path).exists()
    }
}

/// Textual path normalization: collapses repeated separators and `.`
/// components and resolves `..` without touching the filesystem.
pub fn normpath(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Normalized join of a directory and a file name
pub fn normjoin(dir: &Path, name: &str) -> String {
    normpath(&format!("{}/{}", dir.display(), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normpath_collapses() {
        assert_eq!(normpath("/usr//include/./gtk"), "/usr/include/gtk");
        assert_eq!(normpath("/usr/include/../lib"), "/usr/lib");
        assert_eq!(normpath("a/./b"), "a/b");
        assert_eq!(normpath("/"), "/");
    }

    #[test]
    fn test_under_root() {
        let env = BuildEnv {
            root: PathBuf::from("/target"),
            ..Default::default()
        };
        assert_eq!(
            env.under_root("/usr/include/stdio.h"),
            PathBuf::from("/target/usr/include/stdio.h")
        );
    }
}
