use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::version::PackageVersionRange;

/// User configuration, read from `config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// A bare version in a range means `[v]` rather than `[v,)`.
    pub single_version_is_exact: bool,
    pub include_prerelease: bool,
    /// Sources pre-approved per provider full name.
    pub trusted_sources: BTreeMap<String, Vec<String>>,
    /// Manifest providers registered at start-up.
    pub manifests: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            single_version_is_exact: true,
            include_prerelease: false,
            trusted_sources: BTreeMap::new(),
            manifests: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// `<config dir>/pkgprov/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pkgprov").join("config.json"))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PKGPROV_INCLUDE_PRERELEASE") {
            self.include_prerelease = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes");
            debug!("PKGPROV_INCLUDE_PRERELEASE={}", self.include_prerelease);
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Parse a range with the configured single-version semantics.
    pub fn parse_range(&self, text: &str) -> crate::error::Result<PackageVersionRange> {
        PackageVersionRange::parse(text, self.single_version_is_exact)
    }
}
