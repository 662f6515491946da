// src/scan/cmake.rs

//! CMake cache file evidence
//!
//! `CMakeCache.txt` records every file and program the configure step
//! located as `NAME:FILEPATH=/absolute/path` entries. Those are direct
//! evidence of build-time use; no stanza tracking is needed.

use super::{ScanHandler, StanzaEvent, StanzaScanner};
use crate::error::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Scanner for CMake cache files
pub struct CMakeCacheScanner {
    scanner: StanzaScanner,
    path_exceptions: BTreeSet<String>,
}

impl CMakeCacheScanner {
    pub fn new(path_exceptions: BTreeSet<String>) -> Result<Self> {
        Ok(Self {
            scanner: StanzaScanner::new(
                Vec::new(),
                Some(Regex::new(r"^[^ ]+:FILEPATH=(/[^ ]+)$")?),
            ),
            path_exceptions,
        })
    }

    /// Collect located file paths from a cache file on disk
    pub fn scan_file(&self, path: &Path) -> Result<BTreeSet<String>> {
        let file = File::open(path)?;
        let mut handler = PathCollector::default();
        self.scanner.scan_reader(BufReader::new(file), &mut handler)?;
        Ok(self.filter(handler.paths))
    }

    /// Collect located file paths from lines already in memory
    pub fn scan_lines<I, S>(&self, lines: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handler = PathCollector::default();
        self.scanner.scan_lines(lines, &mut handler);
        self.filter(handler.paths)
    }

    fn filter(&self, paths: BTreeSet<String>) -> BTreeSet<String> {
        paths
            .into_iter()
            .filter(|p| !self.path_exceptions.contains(p))
            .collect()
    }
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<String>,
}

impl ScanHandler for PathCollector {
    fn on_found(&mut self, path: &str) {
        self.paths.insert(path.to_string());
    }

    fn on_stanza(&mut self, _event: StanzaEvent<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // ====================
    // Cache entry extraction
    // ====================

    #[test]
    fn test_filepath_entries_collected() {
        let scanner = CMakeCacheScanner::new(BTreeSet::new()).unwrap();
        let paths = scanner.scan_lines([
            "# This is the CMakeCache file.",
            "CMAKE_AR:FILEPATH=/usr/bin/ar",
            "CMAKE_C_COMPILER:FILEPATH=/usr/bin/cc",
            "CMAKE_BUILD_TYPE:STRING=Release",
            "ZLIB_LIBRARY:FILEPATH=/usr/lib/libz.so",
        ]);
        assert_eq!(paths.len(), 3);
        assert!(paths.contains("/usr/bin/ar"));
        assert!(paths.contains("/usr/bin/cc"));
        assert!(paths.contains("/usr/lib/libz.so"));
    }

    #[test]
    fn test_relative_and_malformed_entries_ignored() {
        let scanner = CMakeCacheScanner::new(BTreeSet::new()).unwrap();
        let paths = scanner.scan_lines([
            "FOO:FILEPATH=relative/path",
            "BAR:FILEPATH=/has a space",
            "BAZ:PATH=/usr/share/baz",
        ]);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_path_exceptions_applied() {
        let exceptions: BTreeSet<String> = ["/usr/bin/cc".to_string()].into();
        let scanner = CMakeCacheScanner::new(exceptions).unwrap();
        let paths = scanner.scan_lines([
            "CMAKE_C_COMPILER:FILEPATH=/usr/bin/cc",
            "CMAKE_AR:FILEPATH=/usr/bin/ar",
        ]);
        assert_eq!(paths.len(), 1);
        assert!(paths.contains("/usr/bin/ar"));
    }
}
