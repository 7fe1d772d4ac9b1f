//! Document kinds
//!
//! A kind names the identity and inheritance fields of one family of
//! documents. The field names are associated constants, so each kind is
//! checked at compile time instead of being threaded through as strings.

/// Logical name of a document (not unique across revisions)
pub const NAME_KEY: &str = "name";

/// Revision number; higher is newer
pub const REV_KEY: &str = "rev";

/// Whether the document may be served
pub const IS_ACTIVE_KEY: &str = "is_active";

/// Soft-delete marker
pub const IS_DELETED_KEY: &str = "is_deleted";

/// RFC 3339 creation/resolution stamp
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Free-form category label, only used for logging
pub const TYPE_KEY: &str = "type";

/// A family of resolvable, mergeable, versioned documents.
pub trait DocumentKind: Send + Sync + 'static {
    /// Label used in logs and CLI output
    const LABEL: &'static str;

    /// Field holding the unique instance id
    const ID_KEY: &'static str;

    /// Field naming the parent document by logical name
    const BASE_KEY: &'static str;
}

/// Agent profiles (`agent_profiles/*.yaml`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgentProfile;

impl DocumentKind for AgentProfile {
    const LABEL: &'static str = "agent_profile";
    const ID_KEY: &'static str = "profile_id";
    const BASE_KEY: &'static str = "base_profile";
}

/// Shared LLM configurations (`llm_configs/*.yaml`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LlmConfig;

impl DocumentKind for LlmConfig {
    const LABEL: &'static str = "llm_config";
    const ID_KEY: &'static str = "llm_config_id";
    const BASE_KEY: &'static str = "base_llm_config";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys() {
        assert_eq!(AgentProfile::ID_KEY, "profile_id");
        assert_eq!(AgentProfile::BASE_KEY, "base_profile");
        assert_eq!(LlmConfig::ID_KEY, "llm_config_id");
        assert_eq!(LlmConfig::BASE_KEY, "base_llm_config");
    }
}
