//! Injector configuration
//!
//! Defaults are merged with environment variables prefixed `WEFT_`, so
//! `WEFT_SCRIPT_DIR=/var/cache/app` moves generated artifacts and the
//! binding log.

use crate::error::{Result, WeftError};
use crate::null_object::default_script_dir;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "WEFT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectorConfig {
    /// Where null-object artifacts and `module.log` are written
    pub script_dir: PathBuf,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            script_dir: default_script_dir(),
        }
    }
}

impl InjectorConfig {
    /// Load from defaults and the environment.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// The providers [`load`](Self::load) reads, for callers that want to
    /// merge their own on top.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| WeftError::Config(e.to_string()))?;
        tracing::debug!(script_dir = %config.script_dir.display(), "injector configuration loaded");
        Ok(config)
    }

    pub fn with_script_dir(mut self, script_dir: impl Into<PathBuf>) -> Self {
        self.script_dir = script_dir.into();
        self
    }

    /// The configured script directory, or the system temp directory when
    /// the configured one does not exist.
    pub fn resolved_script_dir(&self) -> PathBuf {
        if self.script_dir.is_dir() {
            return self.script_dir.clone();
        }
        let fallback = default_script_dir();
        tracing::warn!(
            configured = %self.script_dir.display(),
            fallback = %fallback.display(),
            "script directory does not exist, using the temp directory"
        );
        fallback
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_temp_dir() {
        let config = InjectorConfig::default();
        assert_eq!(config.script_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_merged_providers_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let figment = InjectorConfig::figment().merge(Serialized::default("script_dir", dir.path()));
        let config = InjectorConfig::from_figment(figment).unwrap();

        assert_eq!(config.script_dir(), dir.path());
        assert_eq!(config.resolved_script_dir(), dir.path());
    }

    #[test]
    fn test_missing_script_dir_falls_back() {
        let config = InjectorConfig::default().with_script_dir("/definitely/not/a/dir");
        assert_eq!(config.resolved_script_dir(), std::env::temp_dir());
    }
}
