//! Directory loader
//!
//! Runs the load pipeline for one document kind:
//! 1. Discovery: parse every document file into a by-name map
//! 2. Resolution: merge each document over its base chain
//! 3. Finalization: stamp metadata defaults and re-key by instance id
//!
//! Outside strict mode nothing short of an unreadable directory fails the
//! load; bad files and broken chains are logged and left out.

mod discovery;
mod finalize;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use profile_inherit::{resolve_all, ChainFailure, ResolveError};
use tracing::{error, info};

use crate::kind::DocumentKind;
use crate::registry::Snapshot;

pub use discovery::{yaml_to_json, DuplicateName, SkipReason, SkippedFile, SourceFile};
pub use finalize::{stamp_defaults, IdReassignment};

/// Default document file extension
pub const DEFAULT_EXTENSION: &str = "yaml";

/// Load behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail on the first recoverable problem instead of skipping
    pub strict: bool,

    /// File extensions (without the dot) treated as documents
    pub extensions: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            extensions: vec![DEFAULT_EXTENSION.to_string()],
        }
    }
}

/// What happened during one load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Directory that was loaded
    pub directory: PathBuf,

    /// The directory did not exist; the snapshot is empty
    pub directory_missing: bool,

    /// Document files found (including skipped ones)
    pub files_discovered: usize,

    /// Files left out, with reasons
    pub skipped: Vec<SkippedFile>,

    /// Logical names declared by more than one file
    pub duplicates: Vec<DuplicateName>,

    /// Chains that failed to resolve
    pub failures: Vec<ChainFailure>,

    /// Documents that received a fresh id on collision
    pub reassigned_ids: Vec<IdReassignment>,

    /// Documents in the final snapshot
    pub finalized: usize,
}

impl LoadReport {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            ..Self::default()
        }
    }

    /// True when every discovered file made it into the snapshot
    pub fn is_clean(&self) -> bool {
        !self.directory_missing
            && self.skipped.is_empty()
            && self.duplicates.is_empty()
            && self.failures.is_empty()
    }
}

/// Errors that abort a load
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Document directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read document directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document file {}: {reason}", .path.display())]
    Skipped { path: PathBuf, reason: SkipReason },

    #[error(
        "Duplicate document name '{}' in {} and {}",
        .0.name,
        .0.replaced.display(),
        .0.kept.display()
    )]
    DuplicateName(DuplicateName),

    #[error("Failed to resolve '{name}': {source}")]
    Resolve {
        name: String,
        #[source]
        source: ResolveError,
    },
}

/// Load, resolve and finalize every document of kind `K` in `dir`.
pub fn load_and_resolve<K: DocumentKind>(
    dir: &Path,
    options: &LoadOptions,
) -> Result<Snapshot<K>, LoadError> {
    let loaded_at = Utc::now();
    let mut report = LoadReport::new(dir);

    if !dir.is_dir() {
        if options.strict {
            return Err(LoadError::DirectoryNotFound(dir.to_path_buf()));
        }
        error!(kind = K::LABEL, path = %dir.display(), "document directory not found");
        report.directory_missing = true;
        return Ok(Snapshot::new(
            BTreeMap::new(),
            BTreeMap::new(),
            report,
            loaded_at,
        ));
    }

    // Phase 1: discovery
    let discovered = discovery::discover(dir, options, &mut report)?;

    // Phase 2: resolution
    let resolved = resolve_all(&discovered.raw, K::BASE_KEY);
    for failure in &resolved.failures {
        if options.strict {
            return Err(LoadError::Resolve {
                name: failure.name.clone(),
                source: failure.error.clone(),
            });
        }
        log_failure::<K>(failure);
    }
    report.failures = resolved.failures;

    // Phase 3: finalization
    let documents = finalize::finalize::<K>(resolved.documents, loaded_at, &mut report);

    info!(
        kind = K::LABEL,
        path = %dir.display(),
        files = report.files_discovered,
        documents = report.finalized,
        failures = report.failures.len(),
        "documents loaded"
    );

    Ok(Snapshot::new(documents, discovered.sources, report, loaded_at))
}

fn log_failure<K: DocumentKind>(failure: &ChainFailure) {
    match &failure.error {
        ResolveError::Circular { path } => error!(
            kind = K::LABEL,
            name = %failure.name,
            cycle = %path.join(" -> "),
            "circular inheritance, document skipped"
        ),
        ResolveError::MissingBase { base, required_by } => error!(
            kind = K::LABEL,
            name = %failure.name,
            base = %base,
            required_by = required_by.as_deref().unwrap_or("<root>"),
            "base document not found, document skipped"
        ),
        ResolveError::InvalidBase { found, .. } => error!(
            kind = K::LABEL,
            name = %failure.name,
            found = %found,
            "invalid base reference, document skipped"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::AgentProfile;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_yields_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let snapshot =
            load_and_resolve::<AgentProfile>(&missing, &LoadOptions::default()).unwrap();

        assert!(snapshot.is_empty());
        assert!(snapshot.report().directory_missing);
        assert!(!snapshot.report().is_clean());
    }

    #[test]
    fn test_missing_directory_strict() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let options = LoadOptions {
            strict: true,
            ..LoadOptions::default()
        };

        let result = load_and_resolve::<AgentProfile>(&missing, &options);

        assert!(matches!(result, Err(LoadError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_strict_mode_rejects_broken_chain() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.yaml"), "name: x\nbase_profile: ghost\n").unwrap();
        let options = LoadOptions {
            strict: true,
            ..LoadOptions::default()
        };

        let err = load_and_resolve::<AgentProfile>(dir.path(), &options).unwrap_err();

        assert!(matches!(err, LoadError::Resolve { ref name, .. } if name == "x"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_clean_load_report() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yaml"), "name: a\n").unwrap();

        let snapshot =
            load_and_resolve::<AgentProfile>(dir.path(), &LoadOptions::default()).unwrap();

        assert!(snapshot.report().is_clean());
        assert_eq!(snapshot.report().finalized, 1);
        assert_eq!(snapshot.report().files_discovered, 1);
    }
}
