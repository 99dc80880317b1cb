//! Decoration settings.
//!
//! Settings come from code, from environment variables prefixed with
//! `FERROUS_DECOR_`, or (with the `config` feature) from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default environment prefix.
pub const ENV_PREFIX: &str = "FERROUS_DECOR";

/// Settings for decoration passes and provider builds.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{DecorationConfig, ServiceCollection};
///
/// let config = DecorationConfig::default().warn_on_skipped_candidates(true);
/// assert!(config.validate_on_build);
///
/// let mut services = ServiceCollection::new();
/// services.with_config(config);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DecorationConfig {
    /// Log skipped open-generic candidates at `warn` instead of `debug`
    pub warn_on_skipped_candidates: bool,
    /// Check in `try_build` that every shadow key a decorator depends on is registered
    pub validate_on_build: bool,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            warn_on_skipped_candidates: false,
            validate_on_build: true,
        }
    }
}

impl DecorationConfig {
    pub fn warn_on_skipped_candidates(mut self, enabled: bool) -> Self {
        self.warn_on_skipped_candidates = enabled;
        self
    }

    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    /// Loads settings from `FERROUS_DECOR_*` variables over the defaults.
    ///
    /// Recognized: `FERROUS_DECOR_WARN_ON_SKIPPED_CANDIDATES` and
    /// `FERROUS_DECOR_VALIDATE_ON_BUILD`, each `true`/`false`, `1`/`0`,
    /// `yes`/`no` or `on`/`off`.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        let mut config = Self::default();
        if let Some(value) = env_flag(prefix, "warn_on_skipped_candidates")? {
            config.warn_on_skipped_candidates = value;
        }
        if let Some(value) = env_flag(prefix, "validate_on_build")? {
            config.validate_on_build = value;
        }
        Ok(config)
    }

    /// Parses settings from a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|err| DiError::Config(format!("invalid JSON configuration: {err}")))
    }

    /// Reads and parses a JSON settings file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| DiError::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json(&content)
    }
}

fn env_flag(prefix: &str, key: &str) -> DiResult<Option<bool>> {
    let name = format!("{}_{}", prefix.to_uppercase(), key.to_uppercase());
    let Ok(value) = env::var(&name) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(DiError::Config(format!("{name} must be a boolean, got '{value}'"))),
    }
}
