use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// User-defined path variables substituted into project files as `$NAME$`.
pub type PathVariables = BTreeMap<String, String>;

/// A library or SDK configured outside any single project.
///
/// Global libraries are process-wide: they are replaced as a whole and shared
/// (read-only) by every project loaded after the replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GlobalLibrary {
    Library {
        name: String,
        #[serde(default)]
        paths: Vec<PathBuf>,
    },
    Sdk {
        name: String,
        home: PathBuf,
        #[serde(default)]
        paths: Vec<PathBuf>,
    },
}

impl GlobalLibrary {
    pub fn library(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        GlobalLibrary::Library {
            name: name.into(),
            paths,
        }
    }

    pub fn sdk(name: impl Into<String>, home: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Self {
        GlobalLibrary::Sdk {
            name: name.into(),
            home: home.into(),
            paths,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GlobalLibrary::Library { name, .. } | GlobalLibrary::Sdk { name, .. } => name,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        match self {
            GlobalLibrary::Library { paths, .. } | GlobalLibrary::Sdk { paths, .. } => paths,
        }
    }

    pub fn is_sdk(&self) -> bool {
        matches!(self, GlobalLibrary::Sdk { .. })
    }
}

/// A named classpath definition resolved into a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Library {
    pub name: String,
    pub classpath: Vec<PathBuf>,
}

/// A Java SDK resolved into a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sdk {
    pub name: String,
    pub home: PathBuf,
    pub classpath: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LibraryLevel {
    /// Defined by the project (`.idea/libraries` or the `.ipr` library table).
    Project,
    /// Defined globally, see [`GlobalLibrary`].
    Application,
}

/// One entry of a module's ordered dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleDependency {
    Module { name: String },
    Library { name: String, level: LibraryLevel },
    /// A library declared inline in the module file.
    ModuleLibrary { classpath: Vec<PathBuf> },
    Sdk { name: String },
    /// Use the project SDK.
    InheritedSdk,
}

/// A named compilation unit of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    pub name: String,
    /// Directory containing the module file.
    pub root: PathBuf,
    pub source_roots: Vec<PathBuf>,
    pub test_source_roots: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub test_output_dir: Option<PathBuf>,
    pub dependencies: Vec<ModuleDependency>,
}

impl Module {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            source_roots: Vec::new(),
            test_source_roots: Vec::new(),
            output_dir: None,
            test_output_dir: None,
            dependencies: Vec::new(),
        }
    }

    /// Output directories that exist in the model (production first).
    pub fn output_dirs(&self) -> impl Iterator<Item = &Path> {
        self.output_dir
            .iter()
            .chain(self.test_output_dir.iter())
            .map(PathBuf::as_path)
    }

    pub fn module_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().filter_map(|dep| match dep {
            ModuleDependency::Module { name } => Some(name.as_str()),
            _ => None,
        })
    }
}

/// An in-memory project loaded from disk and combined with the global
/// libraries that were configured at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// Lower-cased project name, see [`crate::project_name`].
    pub name: String,
    /// Normalized path the project was requested with.
    pub path: PathBuf,
    /// Directory that `$PROJECT_DIR$` expands to.
    pub base_dir: PathBuf,
    /// Modules in declaration order.
    pub modules: Vec<Module>,
    pub project_sdk: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub libraries: BTreeMap<String, Library>,
    pub global_libraries: BTreeMap<String, Library>,
    pub sdks: BTreeMap<String, Sdk>,
}

impl ProjectDescriptor {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name == name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name.as_str())
    }

    /// Resolve a library referenced from a module dependency.
    pub fn library(&self, name: &str, level: LibraryLevel) -> Option<&Library> {
        match level {
            LibraryLevel::Project => self.libraries.get(name),
            LibraryLevel::Application => self.global_libraries.get(name),
        }
    }

    /// The SDK a module compiles against, following `InheritedSdk` to the
    /// project SDK.
    pub fn module_sdk(&self, module: &Module) -> Option<&Sdk> {
        module.dependencies.iter().find_map(|dep| match dep {
            ModuleDependency::Sdk { name } => self.sdks.get(name),
            ModuleDependency::InheritedSdk => {
                self.project_sdk.as_deref().and_then(|name| self.sdks.get(name))
            }
            _ => None,
        })
    }
}
