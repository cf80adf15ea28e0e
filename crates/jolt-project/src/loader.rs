use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::idea::{self, ProjectComponents};
use crate::macros::PathMacros;
use crate::{
    project_name, GlobalLibrary, Library, ModuleDependency, PathVariables, ProjectDescriptor,
    ProjectLayout, Sdk,
};

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("project file {path} does not exist")]
    MissingProjectFile { path: PathBuf },

    #[error("{path} is not a project: missing `{dirname}` directory")]
    MissingConfigDir { path: PathBuf, dirname: &'static str },

    #[error("invalid project file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Everything a loader needs to turn a project path into a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Normalized project path (directory or `.ipr` file).
    pub path: &'a Path,
    pub global_libraries: &'a [GlobalLibrary],
    pub path_variables: &'a PathVariables,
}

/// Builds in-memory project descriptors from disk.
pub trait ProjectLoader: Send + Sync {
    fn load(&self, request: &LoadRequest<'_>) -> Result<ProjectDescriptor, ProjectError>;
}

/// Loads directory-based (`.idea/`) and file-based (`.ipr`) projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdeaProjectLoader;

impl ProjectLoader for IdeaProjectLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<ProjectDescriptor, ProjectError> {
        load_project(request)
    }
}

/// Load a project with the default [`IdeaProjectLoader`].
pub fn load_project(request: &LoadRequest<'_>) -> Result<ProjectDescriptor, ProjectError> {
    let layout = ProjectLayout::detect(request.path);
    let components = match &layout {
        ProjectLayout::DirectoryBased { root, config_dir } => {
            if !root.is_dir() {
                return Err(ProjectError::MissingProjectFile {
                    path: root.clone(),
                });
            }
            if !config_dir.is_dir() {
                return Err(ProjectError::MissingConfigDir {
                    path: root.clone(),
                    dirname: crate::IDEA_PROJECT_DIRNAME,
                });
            }
            idea::read_directory_components(config_dir)?
        }
        ProjectLayout::FileBased { project_file } => {
            if !project_file.is_file() {
                return Err(ProjectError::MissingProjectFile {
                    path: project_file.clone(),
                });
            }
            idea::read_project_file_components(project_file)?
        }
    };

    let base_dir = layout.base_dir().to_path_buf();
    let macros = PathMacros::new(&base_dir, request.path_variables);
    assemble(request, &layout, &base_dir, &macros, components)
}

fn assemble(
    request: &LoadRequest<'_>,
    layout: &ProjectLayout,
    base_dir: &Path,
    macros: &PathMacros<'_>,
    components: ProjectComponents,
) -> Result<ProjectDescriptor, ProjectError> {
    let output_dir = components
        .output_url
        .as_deref()
        .map(|url| macros.url_to_path(url));

    let mut libraries = BTreeMap::new();
    for raw in components.libraries {
        let classpath = raw
            .class_urls
            .iter()
            .map(|url| macros.url_to_path(url))
            .collect();
        libraries.insert(
            raw.name.clone(),
            Library {
                name: raw.name,
                classpath,
            },
        );
    }

    let mut global_libraries = BTreeMap::new();
    let mut sdks = BTreeMap::new();
    for library in request.global_libraries {
        match library {
            GlobalLibrary::Sdk { name, home, paths } => {
                sdks.insert(
                    name.clone(),
                    Sdk {
                        name: name.clone(),
                        home: home.clone(),
                        classpath: paths.clone(),
                    },
                );
            }
            GlobalLibrary::Library { name, paths } => {
                global_libraries.insert(
                    name.clone(),
                    Library {
                        name: name.clone(),
                        classpath: paths.clone(),
                    },
                );
            }
        }
    }

    let mut modules = Vec::with_capacity(components.module_files.len());
    for module_file in &components.module_files {
        let module_file = macros.expand(module_file);
        let module_path = resolve_relative(base_dir, Path::new(&module_file));
        if !module_path.is_file() {
            return Err(ProjectError::MissingProjectFile { path: module_path });
        }
        let module = idea::read_module_file(&module_path, macros, output_dir.as_deref())?;
        if modules
            .iter()
            .any(|existing: &crate::Module| existing.name == module.name)
        {
            return Err(ProjectError::Invalid {
                path: layout.load_path().to_path_buf(),
                reason: format!("duplicate module `{}`", module.name),
            });
        }
        modules.push(module);
    }

    let project = ProjectDescriptor {
        name: project_name(request.path),
        path: request.path.to_path_buf(),
        base_dir: base_dir.to_path_buf(),
        modules,
        project_sdk: components.project_sdk,
        output_dir,
        libraries,
        global_libraries,
        sdks,
    };
    report_unresolved_references(&project);
    Ok(project)
}

fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn report_unresolved_references(project: &ProjectDescriptor) {
    for module in &project.modules {
        for dep in &module.dependencies {
            let missing = match dep {
                ModuleDependency::Module { name } => project.module(name).is_none(),
                ModuleDependency::Library { name, level } => {
                    project.library(name, *level).is_none()
                }
                ModuleDependency::Sdk { name } => !project.sdks.contains_key(name),
                ModuleDependency::InheritedSdk => project
                    .project_sdk
                    .as_deref()
                    .is_some_and(|name| !project.sdks.contains_key(name)),
                ModuleDependency::ModuleLibrary { .. } => false,
            };
            if missing {
                tracing::debug!(
                    target: "jolt.project",
                    project = %project.name,
                    module = %module.name,
                    dependency = ?dep,
                    "unresolved module dependency"
                );
            }
        }
    }
}
