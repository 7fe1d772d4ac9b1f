//! Registry settings
//!
//! Settings are merged from four layers, last wins:
//! 1. Built-in defaults
//! 2. Host config (~/.config/profile-registry/settings.toml)
//! 3. Project config (./profile-registry.toml, or --settings)
//! 4. CLI flags
//!
//! Objects deep-merge by key; arrays and scalars are replaced.

mod defaults;
mod effective;

pub use defaults::BuiltinDefaults;
pub use effective::{
    Directories, EffectiveSettings, RegistrySettings, SettingsError, SettingsOrigin,
    SettingsSource, PROJECT_SETTINGS_FILE,
};
