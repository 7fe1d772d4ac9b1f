//! Effective settings with provenance
//!
//! Captures the merged settings plus where each contributing layer came
//! from.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use profile_inherit::{merge_layers, ListMerge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use crate::loader::LoadOptions;

/// Project settings file looked up in the working directory
pub const PROJECT_SETTINGS_FILE: &str = "profile-registry.toml";

/// Origin of a settings layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsOrigin {
    Builtin,
    Host,
    Project,
    Cli,
}

/// A contributing settings layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSource {
    /// Origin of this layer
    pub origin: SettingsOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Document directories per kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Directories {
    pub agent_profiles: PathBuf,
    pub llm_configs: PathBuf,
}

/// Typed view of the merged settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegistrySettings {
    pub directories: Directories,
    pub strict: bool,
    pub extensions: Vec<String>,
}

impl RegistrySettings {
    /// Loader options derived from these settings
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict,
            extensions: self.extensions.clone(),
        }
    }
}

/// Effective settings with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveSettings {
    /// When these settings were computed
    pub created_at: DateTime<Utc>,

    /// The merged settings object
    pub config: Value,

    /// Typed view of `config`
    #[serde(skip)]
    pub settings: RegistrySettings,

    /// Contributing layers in precedence order
    pub sources: Vec<SettingsSource>,
}

impl EffectiveSettings {
    /// Build effective settings from layers
    pub fn build(
        host_path: Option<&Path>,
        project_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, SettingsError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(SettingsSource {
            origin: SettingsOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Host config
        if let Some(path) = host_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(SettingsSource {
                    origin: SettingsOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Project config
        if let Some(path) = project_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(SettingsSource {
                    origin: SettingsOrigin::Project,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 4: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(SettingsSource {
                origin: SettingsOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers, ListMerge::Replace);
        let settings = Self::validate(&merged)?;

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            settings,
            sources,
        })
    }

    /// Default host settings path, if HOME is set
    pub fn default_host_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/profile-registry/settings.toml"))
    }

    /// The typed settings
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), SettingsError> {
        let bytes = fs::read(path).map_err(|e| SettingsError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| SettingsError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => {
                let map: serde_json::Map<String, Value> = table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Validate merged settings and convert to the typed form
    fn validate(config: &Value) -> Result<RegistrySettings, SettingsError> {
        let settings: RegistrySettings = serde_json::from_value(config.clone())
            .map_err(|e| SettingsError::ValidationError(format!("invalid settings: {}", e)))?;

        if settings.directories.agent_profiles.as_os_str().is_empty()
            || settings.directories.llm_configs.as_os_str().is_empty()
        {
            return Err(SettingsError::ValidationError(
                "directories must not be empty".to_string(),
            ));
        }

        if settings.extensions.is_empty() {
            return Err(SettingsError::ValidationError(
                "extensions must list at least one extension".to_string(),
            ));
        }

        if let Some(bad) = settings
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(SettingsError::ValidationError(format!(
                "extension '{}' must be non-empty and have no leading dot",
                bad
            )));
        }

        Ok(settings)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let effective = EffectiveSettings::build(None, None, None).unwrap();
        let settings = effective.settings();

        assert_eq!(
            settings.directories.agent_profiles,
            PathBuf::from("config/agent_profiles")
        );
        assert!(!settings.strict);
        assert_eq!(settings.load_options(), LoadOptions::default());
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({
            "strict": true,
            "directories": {"agent_profiles": "/srv/profiles"}
        });

        let settings = EffectiveSettings::build(None, None, Some(cli))
            .unwrap()
            .settings;

        assert!(settings.strict);
        assert_eq!(settings.directories.agent_profiles, PathBuf::from("/srv/profiles"));
        // Untouched sibling key survives the deep merge
        assert_eq!(settings.directories.llm_configs, PathBuf::from("config/llm_configs"));
    }

    #[test]
    fn test_project_file_layer() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "extensions = [\"yaml\", \"yml\"]").unwrap();
        writeln!(temp, "[directories]").unwrap();
        writeln!(temp, "llm_configs = \"shared/llm\"").unwrap();

        let effective = EffectiveSettings::build(None, Some(temp.path()), None).unwrap();
        let settings = effective.settings();

        assert_eq!(settings.extensions, vec!["yaml".to_string(), "yml".to_string()]);
        assert_eq!(settings.directories.llm_configs, PathBuf::from("shared/llm"));
        assert_eq!(effective.sources.len(), 2);
        assert_eq!(effective.sources[1].origin, SettingsOrigin::Project);
        assert_eq!(effective.sources[1].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_layers_replace_arrays() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "extensions = [\"yaml\", \"yml\"]").unwrap();
        let cli = serde_json::json!({"extensions": ["yml"]});

        let settings = EffectiveSettings::build(Some(host.path()), None, Some(cli))
            .unwrap()
            .settings;

        assert_eq!(settings.extensions, vec!["yml".to_string()]);
    }

    #[test]
    fn test_missing_files_are_ignored() {
        let effective = EffectiveSettings::build(
            Some(Path::new("/nonexistent/host.toml")),
            Some(Path::new("/nonexistent/project.toml")),
            None,
        )
        .unwrap();

        assert_eq!(effective.sources.len(), 1);
        assert_eq!(effective.sources[0].origin, SettingsOrigin::Builtin);
    }

    #[test]
    fn test_validation_rejects_dotted_extension() {
        let cli = serde_json::json!({"extensions": [".yaml"]});

        let result = EffectiveSettings::build(None, None, Some(cli));

        assert!(result.unwrap_err().to_string().contains("leading dot"));
    }

    #[test]
    fn test_validation_rejects_empty_extensions() {
        let cli = serde_json::json!({"extensions": []});

        let result = EffectiveSettings::build(None, None, Some(cli));

        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_key() {
        let cli = serde_json::json!({"strcit": true});

        let result = EffectiveSettings::build(None, None, Some(cli));

        assert!(result.unwrap_err().to_string().contains("strcit"));
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "strict = ").unwrap();

        let result = EffectiveSettings::build(None, Some(temp.path()), None);

        assert!(matches!(result, Err(SettingsError::ParseError(_))));
    }
}
