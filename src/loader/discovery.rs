//! Document discovery (phase 1)
//!
//! Enumerates document files in one directory (non-recursive, sorted by
//! file name), parses each into a mapping and indexes it by logical name.
//! Bad files are skipped; a duplicate name lets the later file win.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use profile_inherit::Document;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{LoadError, LoadOptions, LoadReport};
use crate::kind::NAME_KEY;

/// A document file that contributed to the load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// File path as enumerated
    pub path: PathBuf,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

/// Why a file was left out of the load
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("YAML parse error: {0}")]
    Parse(String),

    #[error("top-level value is {0}, expected a mapping")]
    NotMapping(&'static str),

    #[error("'name' must be a string, found {0}")]
    InvalidName(String),
}

/// A skipped file and the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Two files declaring the same logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    pub name: String,

    /// File whose document was discarded
    pub replaced: PathBuf,

    /// File whose document was kept
    pub kept: PathBuf,
}

/// Raw documents indexed by logical name
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub raw: BTreeMap<String, Document>,
    pub sources: BTreeMap<String, SourceFile>,
}

/// Discover and parse every document file in `dir`.
///
/// Recoverable problems are recorded in `report` (or returned as errors
/// in strict mode). Failing to read the directory itself is always an
/// error.
pub fn discover(
    dir: &Path,
    options: &LoadOptions,
    report: &mut LoadReport,
) -> Result<Discovered, LoadError> {
    let mut discovered = Discovered::default();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(LoadError::Io {
                    path: dir.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, &options.extensions) {
            continue;
        }

        report.files_discovered += 1;
        match load_file(path) {
            Ok(file) => insert(&mut discovered, file, options, report)?,
            Err(reason) => {
                if options.strict {
                    return Err(LoadError::Skipped {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
                warn!(file = %path.display(), error = %reason, "skipping document file");
                report.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        }
    }

    debug!(
        path = %dir.display(),
        documents = discovered.raw.len(),
        "discovery complete"
    );
    Ok(discovered)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

fn insert(
    discovered: &mut Discovered,
    file: LoadedFile,
    options: &LoadOptions,
    report: &mut LoadReport,
) -> Result<(), LoadError> {
    let LoadedFile {
        name,
        document,
        source,
    } = file;

    if let Some(previous) = discovered.sources.get(&name) {
        let duplicate = DuplicateName {
            name: name.clone(),
            replaced: previous.path.clone(),
            kept: source.path.clone(),
        };
        if options.strict {
            return Err(LoadError::DuplicateName(duplicate));
        }
        warn!(
            name = %name,
            replaced = %duplicate.replaced.display(),
            kept = %duplicate.kept.display(),
            "duplicate document name, later file wins"
        );
        report.duplicates.push(duplicate);
    }

    discovered.raw.insert(name.clone(), document);
    discovered.sources.insert(name, source);
    Ok(())
}

struct LoadedFile {
    name: String,
    document: Document,
    source: SourceFile,
}

/// Read and parse one document file, defaulting `name` to the file stem.
fn load_file(path: &Path) -> Result<LoadedFile, SkipReason> {
    let bytes = fs::read(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| SkipReason::Parse(format!("invalid UTF-8: {}", e)))?;

    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|e| SkipReason::Parse(e.to_string()))?;
    // Expand `<<: *anchor` merge keys before conversion
    yaml.apply_merge().map_err(|e| SkipReason::Parse(e.to_string()))?;

    let mut document = match yaml_to_json(yaml) {
        Value::Object(map) => map,
        other => return Err(SkipReason::NotMapping(value_kind(&other))),
    };

    let name = match document.get(NAME_KEY) {
        Some(Value::String(name)) => name.clone(),
        None | Some(Value::Null) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            document.insert(NAME_KEY.to_string(), Value::String(stem.clone()));
            stem
        }
        Some(other) => return Err(SkipReason::InvalidName(other.to_string())),
    };

    Ok(LoadedFile {
        name,
        document,
        source: SourceFile {
            path: path.to_path_buf(),
            digest,
        },
    })
}

/// Convert a YAML value to a JSON value.
///
/// Tags are dropped and non-string mapping keys are rendered as their
/// JSON text.
pub fn yaml_to_json(yaml: serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let map: serde_json::Map<String, Value> = mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect();
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
