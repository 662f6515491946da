// src/scan/config_log.rs

//! Configure-log check/result interpretation
//!
//! Reads autoconf-style logs for `checking for X` … `result: Y` stanzas
//! and turns successful checks into file evidence: header paths resolved
//! against the include search list, absolute paths verified on the target
//! root, and `-l` check bodies forwarded to the static-link scanner (the
//! compiler invocation in the body is the real evidence there, whether or
//! not the check itself succeeded).
//!
//! A greylist suppresses over-eager positives from generic configure
//! checks: a greylisted path only counts when a confirmation file next to
//! the log contains a corroborating line.

use super::{ScanHandler, StanzaEvent, StanzaRule, StanzaScanner};
use crate::env::{BuildEnv, normjoin, normpath};
use crate::error::Result;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Classification of a `result:` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Empty result or a failure token
    Failure,
    /// Literal `yes`
    Yes,
    /// Any other value, kept verbatim
    Value(String),
}

/// Classify a check result value
///
/// Only the first whitespace-delimited token decides failure; values like
/// `/bin/grep -E` are successes carrying the value itself.
pub fn parse_success(token: &str) -> CheckResult {
    if token.is_empty() {
        // empty string, such as looking for an executable suffix
        return CheckResult::Failure;
    }
    if token == "yes" {
        return CheckResult::Yes;
    }
    let first = token.split_whitespace().next().unwrap_or("");
    if matches!(first, "no" | "not" | "done" | "failed" | "none" | "disabled") {
        return CheckResult::Failure;
    }
    CheckResult::Value(token.to_string())
}

/// Corroboration rules for tentatively-found paths
///
/// Maps a found path to confirmation `(file, pattern)` pairs; the path is
/// kept only when at least one confirmation file, resolved next to the
/// scanned log, contains a matching line. An entry with no confirmations
/// is an unconditional blacklist.
#[derive(Debug, Default)]
pub struct Greylist {
    entries: BTreeMap<String, Vec<(String, Regex)>>,
}

impl Greylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry; patterns are anchored at line start
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        confirmations: Vec<(String, String)>,
    ) -> Result<()> {
        let compiled = confirmations
            .into_iter()
            .map(|(file, pattern)| Ok((file, Regex::new(&format!("^(?:{pattern})"))?)))
            .collect::<Result<Vec<_>>>()?;
        self.entries.insert(path.into(), compiled);
        Ok(())
    }

    /// The stock entries: tools configure probes for but rarely needs
    pub fn default_for(env: &BuildEnv) -> Result<Self> {
        let bindir = env.bin_dir.display();
        let f77 = vec![
            ("configure.ac".to_string(), r"\s*AC_PROG_F77".to_string()),
            ("configure.in".to_string(), r"\s*AC_PROG_F77".to_string()),
        ];
        let mut greylist = Self::new();
        greylist.insert("/usr/X11R6/bin/makedepend", Vec::new())?;
        greylist.insert(format!("{bindir}/g77"), f77.clone())?;
        greylist.insert(format!("{bindir}/gfortran"), f77)?;
        greylist.insert(
            format!("{bindir}/bison"),
            vec![
                ("configure.ac".to_string(), r"\s*AC_PROC_YACC".to_string()),
                (
                    "configure.in".to_string(),
                    r"\s*(AC_PROG_YACC|YACC=)".to_string(),
                ),
            ],
        )?;
        Ok(greylist)
    }

    /// Is this path acceptable given the log it was found in?
    fn confirmed(&self, path: &str, log_path: &Path) -> bool {
        let Some(confirmations) = self.entries.get(path) else {
            // not greylisted, no corroboration needed
            return true;
        };
        let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        for (aux_name, pattern) in confirmations {
            let aux_path = log_dir.join(aux_name);
            let Ok(file) = File::open(&aux_path) else {
                continue;
            };
            for line in BufReader::new(file).lines() {
                let Ok(line) = line else {
                    break;
                };
                if pattern.is_match(&line) {
                    return true;
                }
            }
        }
        false
    }

    /// Drop unconfirmed greylisted paths from a found set
    pub fn filter(&self, paths: BTreeSet<String>, log_path: &Path) -> BTreeSet<String> {
        paths
            .into_iter()
            .filter(|p| self.confirmed(p, log_path))
            .collect()
    }
}

/// Evidence extracted from one configure log
#[derive(Debug, Default)]
pub struct ConfigLogFindings {
    /// Verified file paths the build actually consulted
    pub found_paths: BTreeSet<String>,
    /// Check-body lines (log prefix stripped) for the static-link scanner
    pub forwarded_lines: Vec<String>,
}

/// Scanner for autoconf `config.log` output
pub struct ConfigLogScanner<'a> {
    env: &'a BuildEnv,
    greylist: Greylist,
    path_exceptions: BTreeSet<String>,
    scanner: StanzaScanner,
    header_re: Regex,
    lib_re: Regex,
}

impl<'a> ConfigLogScanner<'a> {
    pub fn new(
        env: &'a BuildEnv,
        greylist: Greylist,
        path_exceptions: BTreeSet<String>,
    ) -> Result<Self> {
        let scanner = StanzaScanner::new(
            vec![StanzaRule::new(
                r"^configure:[0-9]+: checking for  *(.*)$",
                r"^configure:[0-9]+: result:  *(.*)$",
            )?],
            Some(Regex::new(r"^[^ ]+: found (/([^ ]+)?bin/[^ ]+)$")?),
        );
        Ok(Self {
            env,
            greylist,
            path_exceptions,
            scanner,
            // sys/wait.h is not found in "sys/wait.h that is POSIX.1
            // compatible"; the leading-slash exclusion keeps us from
            // chasing "checking whether time.h and sys/time.h may both
            // be included"
            header_re: Regex::new(r"^[^/].*\.h$")?,
            lib_re: Regex::new(r"^.* -l([-a-zA-Z_]*)$")?,
        })
    }

    /// Scan a config.log file on disk
    pub fn scan_file(&self, path: &Path) -> Result<ConfigLogFindings> {
        let file = File::open(path)?;
        let mut handler = CheckHandler::new(self, path);
        self.scanner.scan_reader(BufReader::new(file), &mut handler)?;
        Ok(self.finish(handler, path))
    }

    /// Scan lines already in memory; `log_path` locates greylist
    /// confirmation files
    pub fn scan_lines<I, S>(&self, lines: I, log_path: &Path) -> ConfigLogFindings
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handler = CheckHandler::new(self, log_path);
        self.scanner.scan_lines(lines, &mut handler);
        self.finish(handler, log_path)
    }

    fn finish(&self, handler: CheckHandler<'_>, log_path: &Path) -> ConfigLogFindings {
        let mut found: BTreeSet<String> = handler
            .found
            .into_iter()
            .filter(|p| !self.path_exceptions.contains(p))
            .collect();
        if !self.greylist.is_empty() {
            found = self.greylist.filter(found, log_path);
        }
        ConfigLogFindings {
            found_paths: found,
            forwarded_lines: handler.forwarded,
        }
    }
}

/// Per-scan handler state
struct CheckHandler<'s> {
    env: &'s BuildEnv,
    header_re: &'s Regex,
    lib_re: &'s Regex,
    greylist: &'s Greylist,
    log_path: PathBuf,
    found: BTreeSet<String>,
    forwarded: Vec<String>,
}

impl<'s> CheckHandler<'s> {
    fn new(scanner: &'s ConfigLogScanner<'_>, log_path: &Path) -> Self {
        Self {
            env: scanner.env,
            header_re: &scanner.header_re,
            lib_re: &scanner.lib_re,
            greylist: &scanner.greylist,
            log_path: log_path.to_path_buf(),
            found: BTreeSet::new(),
            forwarded: Vec::new(),
        }
    }
}

impl ScanHandler for CheckHandler<'_> {
    fn on_found(&mut self, path: &str) {
        self.found.insert(path.to_string());
    }

    fn on_stanza(&mut self, event: StanzaEvent<'_>) {
        let Some(_) = event.end_groups else {
            // lost sync: don't start guessing, the result of the check
            // is exactly what we care about
            return;
        };
        let Some(sought) = event.start_group(0) else {
            return;
        };

        // The check body contains the compiler invocation whenever the
        // subject is a -l flag; forward it (minus the configure:NNNN:
        // prefix) whether or not the check succeeded, since the link
        // line itself is the evidence.
        if self.lib_re.is_match(sought) {
            for line in event.lines {
                if let Some((_, rest)) = line.split_once(": ") {
                    self.forwarded.push(rest.to_string());
                }
            }
        }

        let result = parse_success(event.end_group(0).unwrap_or(""));
        if result == CheckResult::Failure {
            // all failed cases are ignored
            return;
        }

        if self.header_re.is_match(sought) {
            let mut include_dirs = vec![self.env.include_dir.clone()];
            for line in event.lines {
                for token in line.split_whitespace() {
                    if token.starts_with("-I/") && token.len() > 3 {
                        include_dirs.push(PathBuf::from(&token[2..]));
                    }
                }
            }
            for dir in include_dirs {
                let seek = normjoin(&dir, sought);
                if self.env.exists_under_root(&seek) {
                    self.found.insert(seek);
                    break;
                }
            }
        }

        // checking for /bin/sought        -> result: yes
        // checking for egrep              -> result: /bin/grep -E
        // checking for ld used by gcc     -> result: /usr/bin/ld
        let candidate = if sought.starts_with('/') {
            Some(sought.to_string())
        } else if let CheckResult::Value(value) = &result
            && value.starts_with('/')
        {
            Some(value.clone())
        } else {
            None
        };
        if let Some(candidate) = candidate
            && let Some(seek) = candidate.split_whitespace().next()
        {
            let seek = normpath(seek);
            if self.env.exists_under_root(&seek)
                && self.greylist.confirmed(&seek, &self.log_path)
            {
                self.found.insert(seek);
            }
        }

        // anything we do not specifically recognize is ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_with_root(root: &Path) -> BuildEnv {
        BuildEnv {
            root: root.to_path_buf(),
            include_dir: PathBuf::from("/usr/include"),
            ..Default::default()
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel.trim_start_matches('/'));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    // ====================
    // parse_success
    // ====================

    #[test]
    fn test_parse_success_classification() {
        assert_eq!(parse_success(""), CheckResult::Failure);
        assert_eq!(parse_success("no"), CheckResult::Failure);
        assert_eq!(parse_success("not found"), CheckResult::Failure);
        assert_eq!(parse_success("disabled"), CheckResult::Failure);
        assert_eq!(parse_success("yes"), CheckResult::Yes);
        assert_eq!(
            parse_success("/bin/grep -E"),
            CheckResult::Value("/bin/grep -E".to_string())
        );
    }

    // ====================
    // Header checks
    // ====================

    #[test]
    fn test_header_check_found() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/usr/include/stdio.h");
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:1234: checking for stdio.h",
                "configure:1240: result: yes",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.contains("/usr/include/stdio.h"));
    }

    #[test]
    fn test_header_check_failed_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/usr/include/stdio.h");
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:1234: checking for stdio.h",
                "configure:1240: result: no",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.is_empty());
    }

    #[test]
    fn test_header_check_uses_include_flags() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/opt/gtk/include/gtk.h");
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:2000: checking for gtk.h",
                "configure:2001: gcc -I/opt/gtk/include conftest.c",
                "configure:2002: result: yes",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.contains("/opt/gtk/include/gtk.h"));
    }

    // ====================
    // Absolute path checks
    // ====================

    #[test]
    fn test_absolute_result_verified() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/bin/grep");
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:4441: checking for egrep",
                "configure:4519: result: /bin/grep -E",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.contains("/bin/grep"));
    }

    #[test]
    fn test_absolute_result_missing_on_disk_ignored() {
        let tmp = TempDir::new().unwrap();
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:4441: checking for egrep",
                "configure:4519: result: /bin/grep -E",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.is_empty());
    }

    // ====================
    // Lost sync and forwarding
    // ====================

    #[test]
    fn test_lost_sync_is_not_trusted() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/usr/include/stdio.h");
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        // Second check starts before the first resolves; EOF closes the
        // second without a result.
        let findings = scanner.scan_lines(
            [
                "configure:1234: checking for stdio.h",
                "configure:1300: checking for stdlib.h",
            ],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.is_empty());
    }

    #[test]
    fn test_lib_check_forwards_body() {
        let tmp = TempDir::new().unwrap();
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:5000: checking for pcre_compile in -lpcre",
                "configure:5010: gcc -o conftest conftest.c -lpcre",
                "configure:5020: result: no",
            ],
            Path::new("/nonexistent/config.log"),
        );
        // Forwarded even though the check failed
        assert!(findings
            .forwarded_lines
            .iter()
            .any(|l| l.contains("gcc -o conftest")));
    }

    // ====================
    // Greylist
    // ====================

    #[test]
    fn test_greylist_requires_confirmation() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/usr/bin/bison");
        let build = TempDir::new().unwrap();
        let log_path = build.path().join("config.log");

        let env = env_with_root(tmp.path());
        let greylist = Greylist::default_for(&env).unwrap();
        let scanner = ConfigLogScanner::new(&env, greylist, BTreeSet::new()).unwrap();

        let lines = [
            "configure:100: checking for /usr/bin/bison".to_string(),
            "configure:101: result: yes".to_string(),
        ];

        // No configure.ac: bison is suppressed
        let findings = scanner.scan_lines(lines.clone(), &log_path);
        assert!(findings.found_paths.is_empty());

        // With a confirming configure.in, bison is accepted
        std::fs::write(build.path().join("configure.in"), "YACC=bison\n").unwrap();
        let findings = scanner.scan_lines(lines, &log_path);
        assert!(findings.found_paths.contains("/usr/bin/bison"));
    }

    #[test]
    fn test_greylist_unconditional_blacklist() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "/usr/X11R6/bin/makedepend");
        let build = TempDir::new().unwrap();

        let env = env_with_root(tmp.path());
        let greylist = Greylist::default_for(&env).unwrap();
        let scanner = ConfigLogScanner::new(&env, greylist, BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            [
                "configure:100: checking for /usr/X11R6/bin/makedepend",
                "configure:101: result: yes",
            ],
            &build.path().join("config.log"),
        );
        assert!(findings.found_paths.is_empty());
    }

    // ====================
    // found pattern
    // ====================

    #[test]
    fn test_found_line_recorded() {
        let tmp = TempDir::new().unwrap();
        let env = env_with_root(tmp.path());
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), BTreeSet::new()).unwrap();

        let findings = scanner.scan_lines(
            ["ac_cv_path_GREP: found /usr/bin/grep"],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.contains("/usr/bin/grep"));
    }

    #[test]
    fn test_path_exceptions_applied() {
        let tmp = TempDir::new().unwrap();
        let env = env_with_root(tmp.path());
        let exceptions: BTreeSet<String> = ["/usr/bin/grep".to_string()].into();
        let scanner = ConfigLogScanner::new(&env, Greylist::new(), exceptions).unwrap();

        let findings = scanner.scan_lines(
            ["ac_cv_path_GREP: found /usr/bin/grep"],
            Path::new("/nonexistent/config.log"),
        );
        assert!(findings.found_paths.is_empty());
    }
}
