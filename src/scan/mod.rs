// src/scan/mod.rs

//! Streaming stanza scanner for semi-structured build-tool output
//!
//! A stanza is a region of log text between a recognized start line and
//! end line, processed as a unit. Stanzas of different rules may overlap
//! freely (improper nesting is allowed), but a rule never has two of its
//! own instances open at once: a second start while one is open
//! force-closes the first with no end match, which handlers must treat as
//! an unsynchronized, untrustworthy result. This trades perfect nesting
//! for robustness against malformed or interleaved tool output.
//!
//! Independent of stanzas, a single "found" pattern can pull individual
//! paths out of individual lines in the same pass.

pub mod cmake;
pub mod config_log;

use crate::error::Result;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io::BufRead;

/// Identifies a rule by its position in the scanner's rule list
pub type RuleId = usize;

/// One scan region definition
#[derive(Debug)]
pub struct StanzaRule {
    start: Regex,
    end: Option<Regex>,
}

impl StanzaRule {
    /// A region between a start and an end pattern
    pub fn new(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: Regex::new(start)?,
            end: Some(Regex::new(end)?),
        })
    }

    /// A single-line rule: each start match is a complete stanza
    pub fn single_line(start: &str) -> Result<Self> {
        Ok(Self {
            start: Regex::new(start)?,
            end: None,
        })
    }
}

/// A closed (or force-closed) stanza delivered to a handler
#[derive(Debug)]
pub struct StanzaEvent<'a> {
    pub rule: RuleId,
    /// Captured groups of the start line (group 1 onward)
    pub start_groups: &'a [Option<String>],
    /// Captured groups of the end line; `None` means the scanner lost
    /// sync (a second start or EOF arrived before a clean end) and the
    /// result must not be used to assert success. Single-line rules get
    /// an empty group list.
    pub end_groups: Option<&'a [Option<String>]>,
    /// All lines from the start line through the closing line
    pub lines: &'a [String],
}

impl StanzaEvent<'_> {
    /// First start group, when present
    pub fn start_group(&self, i: usize) -> Option<&str> {
        self.start_groups.get(i).and_then(|g| g.as_deref())
    }

    /// End group by position, `None` on lost sync or absent group
    pub fn end_group(&self, i: usize) -> Option<&str> {
        self.end_groups
            .and_then(|groups| groups.get(i))
            .and_then(|g| g.as_deref())
    }
}

/// Receives stanza closures and single-line found paths
pub trait ScanHandler {
    fn on_stanza(&mut self, event: StanzaEvent<'_>);

    fn on_found(&mut self, _path: &str) {}
}

/// One stanza currently being collected
#[derive(Debug)]
struct OpenStanza {
    start_groups: Vec<Option<String>>,
    lines: Vec<String>,
}

/// Scanner state for one file: open stanzas keyed by rule id
///
/// Keyed storage (rather than captured closures) keeps per-line
/// processing a single method over explicit state, and the BTreeMap
/// keeps rule processing order deterministic.
#[derive(Debug, Default)]
struct ScanState {
    open: BTreeMap<RuleId, OpenStanza>,
}

/// Single-pass line-oriented scanner
pub struct StanzaScanner {
    rules: Vec<StanzaRule>,
    found: Option<Regex>,
}

impl StanzaScanner {
    pub fn new(rules: Vec<StanzaRule>, found: Option<Regex>) -> Self {
        Self { rules, found }
    }

    /// Scan lines already in memory
    pub fn scan_lines<I, S, H>(&self, lines: I, handler: &mut H)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        H: ScanHandler + ?Sized,
    {
        let mut state = ScanState::default();
        for line in lines {
            self.scan_line(line.as_ref().trim_end_matches('\n'), &mut state, handler);
        }
        self.flush(state, handler);
    }

    /// Scan a buffered reader without loading the whole file
    pub fn scan_reader<R: BufRead, H>(&self, reader: R, handler: &mut H) -> Result<()>
    where
        H: ScanHandler + ?Sized,
    {
        let mut state = ScanState::default();
        for line in reader.lines() {
            let line = line?;
            self.scan_line(line.trim_end_matches('\n'), &mut state, handler);
        }
        self.flush(state, handler);
        Ok(())
    }

    fn scan_line<H>(&self, line: &str, state: &mut ScanState, handler: &mut H)
    where
        H: ScanHandler + ?Sized,
    {
        // The trivial case: a known-needed path on one line. Found
        // matches never interact with stanza state.
        if let Some(re) = &self.found
            && let Some(caps) = re.captures(line)
            && let Some(found) = caps.get(1)
        {
            handler.on_found(found.as_str());
        }

        // Close pass runs before the start pass so that rules whose
        // start and end patterns are identical segment the file.
        let mut closing: Vec<(RuleId, Vec<Option<String>>)> = Vec::new();
        for (&rule, open) in state.open.iter_mut() {
            open.lines.push(line.to_string());
            let Some(end_re) = self.rules[rule].end.as_ref() else {
                continue;
            };
            if let Some(caps) = end_re.captures(line) {
                closing.push((rule, groups_of(&caps)));
            }
        }
        for (rule, end_groups) in closing {
            if let Some(open) = state.open.remove(&rule) {
                handler.on_stanza(StanzaEvent {
                    rule,
                    start_groups: &open.start_groups,
                    end_groups: Some(&end_groups),
                    lines: &open.lines,
                });
            }
        }

        for (rule, def) in self.rules.iter().enumerate() {
            let Some(caps) = def.start.captures(line) else {
                continue;
            };
            let start_groups = groups_of(&caps);

            // A second start of an already-open rule means we lost
            // sync; the partial stanza is reported without an end match.
            if let Some(open) = state.open.remove(&rule) {
                handler.on_stanza(StanzaEvent {
                    rule,
                    start_groups: &open.start_groups,
                    end_groups: None,
                    lines: &open.lines,
                });
            }

            if def.end.is_none() {
                let lines = vec![line.to_string()];
                let no_groups: &[Option<String>] = &[];
                handler.on_stanza(StanzaEvent {
                    rule,
                    start_groups: &start_groups,
                    end_groups: Some(no_groups),
                    lines: &lines,
                });
            } else {
                state.open.insert(
                    rule,
                    OpenStanza {
                        start_groups,
                        lines: vec![line.to_string()],
                    },
                );
            }
        }
    }

    /// Force-close any stanza still open at end of input
    fn flush<H>(&self, state: ScanState, handler: &mut H)
    where
        H: ScanHandler + ?Sized,
    {
        for (rule, open) in state.open {
            handler.on_stanza(StanzaEvent {
                rule,
                start_groups: &open.start_groups,
                end_groups: None,
                lines: &open.lines,
            });
        }
    }
}

fn groups_of(caps: &Captures<'_>) -> Vec<Option<String>> {
    caps.iter()
        .skip(1)
        .map(|m| m.map(|m| m.as_str().to_string()))
        .collect()
}
