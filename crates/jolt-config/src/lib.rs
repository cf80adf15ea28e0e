//! Configuration for the jolt build server (`jolt.toml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use jolt_project::{GlobalLibrary, PathVariables};

mod logging;

pub use logging::{build_subscriber, init_tracing, LoggingConfig};

/// Overrides `[cache] root` when set.
pub const JOLT_CACHE_DIR_ENV_VAR: &str = "JOLT_CACHE_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoltConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub globals: GlobalsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding per-project dependency mappings.
    ///
    /// Defaults to `~/.jolt/cache`; `JOLT_CACHE_DIR` takes precedence over both.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl CacheConfig {
    /// The effective cache root: `JOLT_CACHE_DIR`, then `root`, then `~/.jolt/cache`.
    pub fn resolve_root(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(JOLT_CACHE_DIR_ENV_VAR).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => default_cache_root(),
        }
    }
}

fn default_cache_root() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::MissingHomeDir)?;

    Ok(home.join(".jolt").join("cache"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// What to do when a build is requested for a project that is already building.
    #[serde(default)]
    pub concurrent_builds: ConcurrentBuildPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrentBuildPolicy {
    /// Queue behind the running build.
    #[default]
    Wait,
    /// Fail immediately.
    Reject,
}

/// Initial global libraries and path variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalsConfig {
    #[serde(default)]
    pub libraries: Vec<GlobalLibrary>,
    #[serde(default)]
    pub path_variables: PathVariables,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("could not determine home directory for the default cache root")]
    MissingHomeDir,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_string())
    }
}

impl JoltConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::load_from_str(&text)?;
        tracing::debug!(
            target: "jolt.config",
            path = %path.display(),
            libraries = config.globals.libraries.len(),
            "loaded config"
        );
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: JoltConfig = toml::from_str(text)?;
        config.warn_on_duplicate_libraries();
        Ok(config)
    }

    fn warn_on_duplicate_libraries(&self) {
        let mut seen = std::collections::BTreeSet::new();
        for library in &self.globals.libraries {
            if !seen.insert((library.is_sdk(), library.name())) {
                tracing::warn!(
                    target: "jolt.config",
                    name = library.name(),
                    "duplicate global library configured; last entry wins"
                );
            }
        }
    }
}
