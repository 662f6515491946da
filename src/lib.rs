// src/lib.rs

//! Build-requirement inference for Conary packages
//!
//! Infers which components must be listed in a package's build
//! requirements by combining several evidence sources gathered during a
//! build:
//!
//! - Unsatisfied runtime dependencies of the packaged components,
//!   enforced per dependency kind against a provider index
//! - `config.log` check/result stanzas and CMake cache entries naming
//!   files the configure step actually consulted
//! - `-l` flags in compiler output with no shared-library explanation
//!   (the static-linking fallback)
//! - pkg-config descriptors packaged by the build itself
//! - Localization tooling implied by `POTFILES.in`
//!
//! Findings coalesce into one [`BuildReqReport`] with a missing stream
//! (what to add) and a found stream (what was observed in use, feeding
//! excess-requirement detection). Aggregation is idempotent and
//! order-independent.

pub mod candidates;
pub mod deps;
pub mod enforce;
pub mod env;
mod error;
pub mod filedeps;
pub mod index;
pub mod localization;
pub mod package;
pub mod pkgconfig;
pub mod report;
pub mod scan;
pub mod staticlib;

pub use candidates::{ExceptionSet, provides_names, reduce_candidates};
pub use deps::{DependKind, DependencyAtom, DependencySet};
pub use enforce::{BuildReqEnforcer, KindReport};
pub use env::BuildEnv;
pub use error::{Error, Result};
pub use index::{MemoryIndex, ProviderIndex, ProviderRecord, SqliteIndex};
pub use localization::{LocalizationReport, check_localization};
pub use package::{ComponentContents, PackageContents, PathInfo};
pub use pkgconfig::{PkgConfigFile, PkgConfigResolver, RequiredFile, RequiredFileKind};
pub use report::{BuildReqReport, suggest_from_paths};
pub use scan::cmake::CMakeCacheScanner;
pub use scan::config_log::{ConfigLogFindings, ConfigLogScanner, Greylist};
pub use scan::{ScanHandler, StanzaEvent, StanzaRule, StanzaScanner};
pub use staticlib::{StaticLinkReport, StaticLinkScanner};
