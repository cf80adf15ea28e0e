//! Project model and loading for the Jolt build server.
//!
//! This crate turns a project path into a [`ProjectDescriptor`]:
//! - layout detection (directory-based `.idea/` vs. legacy `.ipr` file)
//! - project naming
//! - module files (`*.iml`): source roots, output directories, order entries
//! - project libraries, combined with the process-wide [`GlobalLibrary`] set

mod idea;
mod layout;
mod loader;
mod macros;
mod model;

pub use layout::{
    absolute_project_path, is_directory_based, normalize_project_path, project_name,
    ProjectLayout, IDEA_PROJECT_DIRNAME, PROJECT_FILE_EXTENSION,
};
pub use loader::{load_project, IdeaProjectLoader, LoadRequest, ProjectError, ProjectLoader};
pub use macros::{MODULE_DIR_MACRO, PROJECT_DIR_MACRO, USER_HOME_MACRO};
pub use model::*;
