use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a build request treats previously compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Compile everything in scope, discarding incremental dependency data.
    Rebuild,
    /// Compile only what changed, guided by the dependency mappings.
    Make,
    /// Remove build outputs for the modules in scope.
    Clean,
}

impl BuildType {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Rebuild => "rebuild",
            BuildType::Make => "make",
            BuildType::Clean => "clean",
        }
    }

    /// Whether this build type reads or writes the dependency mapping store.
    pub fn uses_mappings(self) -> bool {
        !matches!(self, BuildType::Clean)
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a single build request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParameters {
    pub build_type: BuildType,
    /// Free-form options forwarded to the builder backend.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl BuildParameters {
    pub fn new(build_type: BuildType) -> Self {
        Self {
            build_type,
            options: BTreeMap::new(),
        }
    }

    pub fn rebuild() -> Self {
        Self::new(BuildType::Rebuild)
    }

    pub fn make() -> Self {
        Self::new(BuildType::Make)
    }

    pub fn clean() -> Self {
        Self::new(BuildType::Clean)
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}
