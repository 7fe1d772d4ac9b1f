//! Profile Registry - inheritance-resolving store for named YAML documents
//!
//! Loads agent profiles and shared LLM configs from directories of YAML
//! files, resolves `base_*` inheritance chains by deep merge, stamps
//! identity and version metadata, and serves the result as an immutable,
//! atomically reloadable snapshot.

pub mod kind;
pub mod loader;
pub mod redact;
pub mod registry;
pub mod settings;

pub use kind::{AgentProfile, DocumentKind, LlmConfig};
pub use loader::{load_and_resolve, LoadError, LoadOptions, LoadReport};
pub use profile_inherit::{Document, ResolveError};
pub use registry::{AgentProfiles, LlmConfigs, Registries, Registry, Snapshot};
pub use settings::{EffectiveSettings, RegistrySettings, SettingsError};
