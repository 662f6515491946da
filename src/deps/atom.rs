// src/deps/atom.rs

//! Dependency atom definitions
//!
//! An atom is a single typed unit of runtime need. Equality, ordering and
//! hashing consider only `(kind, name)`; occurrence flags are metadata and
//! never affect identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The kind of need a dependency atom expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum DependKind {
    /// Shared library soname, e.g. `libssl.so.3`
    Soname,
    /// File path that must exist, e.g. `/usr/bin/python3`
    File,
    /// ELF interpreter or script interpreter path
    Interpreter,
    /// Python runtime symbol
    Python,
    /// Java runtime symbol
    Java,
    /// Perl runtime symbol
    Perl,
    /// .NET/Mono CIL runtime symbol
    Cil,
    /// Provider (package:component) name
    Trove,
}

impl DependKind {
    /// String prefix used in dependency strings
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Soname => "soname",
            Self::File => "file",
            Self::Interpreter => "interpreter",
            Self::Python => "python",
            Self::Java => "java",
            Self::Perl => "perl",
            Self::Cil => "cil",
            Self::Trove => "",
        }
    }

    /// Parse a kind from its prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "soname" => Some(Self::Soname),
            "file" => Some(Self::File),
            "interpreter" => Some(Self::Interpreter),
            "python" => Some(Self::Python),
            "java" => Some(Self::Java),
            "perl" => Some(Self::Perl),
            "cil" => Some(Self::Cil),
            "" | "trove" => Some(Self::Trove),
            _ => None,
        }
    }

    /// Return all dependency kinds
    pub fn all() -> &'static [DependKind] {
        &[
            Self::Soname,
            Self::File,
            Self::Interpreter,
            Self::Python,
            Self::Java,
            Self::Perl,
            Self::Cil,
            Self::Trove,
        ]
    }

    /// Is this a language-runtime symbol kind?
    pub fn is_language(&self) -> bool {
        matches!(self, Self::Python | Self::Java | Self::Perl | Self::Cil)
    }
}

impl fmt::Display for DependKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A single typed dependency
///
/// Immutable once created. `flags` carry version or ABI markers that ride
/// along for reporting but do not participate in identity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DependencyAtom {
    pub kind: DependKind,
    pub name: String,
    pub flags: Vec<String>,
}

impl DependencyAtom {
    /// Create an atom with no flags
    pub fn new(kind: DependKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            flags: Vec::new(),
        }
    }

    /// Create an atom carrying flags
    pub fn with_flags(kind: DependKind, name: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            flags,
        }
    }

    /// Parse a dependency string like `soname(libssl.so.3)`
    ///
    /// Bare names parse as provider (trove) dependencies. Returns `None`
    /// for an unknown prefix or empty name.
    pub fn parse(s: &str) -> Option<Self> {
        let Some(open) = s.find('(') else {
            if s.is_empty() {
                return None;
            }
            return Some(Self::new(DependKind::Trove, s));
        };
        let close = s.rfind(')')?;
        if close <= open {
            return None;
        }
        let kind = DependKind::from_prefix(&s[..open])?;
        let inner = s[open + 1..close].trim();
        if inner.is_empty() {
            return None;
        }
        Some(Self::new(kind, inner))
    }
}

impl PartialEq for DependencyAtom {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for DependencyAtom {}

impl PartialOrd for DependencyAtom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyAtom {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind, &self.name).cmp(&(other.kind, &other.name))
    }
}

impl Hash for DependencyAtom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for DependencyAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.kind.prefix();
        if prefix.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", prefix, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_prefix_roundtrip() {
        for kind in DependKind::all() {
            assert_eq!(DependKind::from_prefix(kind.prefix()), Some(*kind));
        }
    }

    #[test]
    fn test_parse_soname() {
        let atom = DependencyAtom::parse("soname(libssl.so.3)").unwrap();
        assert_eq!(atom.kind, DependKind::Soname);
        assert_eq!(atom.name, "libssl.so.3");
    }

    #[test]
    fn test_parse_bare_trove() {
        let atom = DependencyAtom::parse("openssl:devel").unwrap();
        assert_eq!(atom.kind, DependKind::Trove);
        assert_eq!(atom.name, "openssl:devel");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DependencyAtom::parse("").is_none());
        assert!(DependencyAtom::parse("soname()").is_none());
        assert!(DependencyAtom::parse("bogus(foo)").is_none());
    }

    #[test]
    fn test_equality_ignores_flags() {
        let plain = DependencyAtom::new(DependKind::Soname, "libz.so.1");
        let flagged = DependencyAtom::with_flags(
            DependKind::Soname,
            "libz.so.1",
            vec!["ZLIB_1.2".to_string()],
        );
        assert_eq!(plain, flagged);
    }

    #[test]
    fn test_display() {
        let atom = DependencyAtom::new(DependKind::Python, "requests");
        assert_eq!(atom.to_string(), "python(requests)");
        let trove = DependencyAtom::new(DependKind::Trove, "openssl:lib");
        assert_eq!(trove.to_string(), "openssl:lib");
    }
}
