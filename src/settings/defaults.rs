//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::loader::DEFAULT_EXTENSION;

/// Built-in default settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Agent profile directory (default: "config/agent_profiles")
    pub agent_profiles_dir: String,

    /// Shared LLM config directory (default: "config/llm_configs")
    pub llm_configs_dir: String,

    /// Fail loads on any recoverable problem (default: false)
    pub strict: bool,

    /// Document file extensions (default: ["yaml"])
    pub extensions: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            agent_profiles_dir: "config/agent_profiles".to_string(),
            llm_configs_dir: "config/llm_configs".to_string(),
            strict: false,
            extensions: vec![DEFAULT_EXTENSION.to_string()],
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "directories": {
                "agent_profiles": self.agent_profiles_dir,
                "llm_configs": self.llm_configs_dir
            },
            "strict": self.strict,
            "extensions": self.extensions
        })
    }
}
