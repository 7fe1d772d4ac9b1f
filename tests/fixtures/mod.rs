//! Test fixtures
//!
//! - Static document directories under `tests/fixtures/`
//! - Scratch directories built from inline YAML

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Static agent profile fixtures (includes a cycle, an orphan and a malformed file)
pub fn agent_profiles_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/agent_profiles")
}

/// Static shared LLM config fixtures
pub fn llm_configs_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/llm_configs")
}

/// A scratch directory of document files
pub struct DocDir {
    dir: TempDir,
}

impl DocDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Build a directory from `(file name, YAML contents)` pairs
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let dir = Self::new();
        for (file, contents) in files {
            dir.write(file, contents);
        }
        dir
    }

    pub fn write(&self, file: &str, contents: &str) {
        fs::write(self.dir.path().join(file), contents).expect("Failed to write fixture");
    }

    pub fn remove(&self, file: &str) {
        fs::remove_file(self.dir.path().join(file)).expect("Failed to remove fixture");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
