use std::path::{Path, PathBuf};

/// Directory that marks the root of a directory-based project.
pub const IDEA_PROJECT_DIRNAME: &str = ".idea";

/// Extension of legacy single-file projects.
pub const PROJECT_FILE_EXTENSION: &str = "ipr";

/// On-disk shape of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectLayout {
    /// `<root>/.idea/` holds the project configuration.
    DirectoryBased { root: PathBuf, config_dir: PathBuf },
    /// A single `<name>.ipr` file holds the project configuration.
    FileBased { project_file: PathBuf },
}

impl ProjectLayout {
    pub fn detect(path: &Path) -> Self {
        if is_directory_based(path) {
            ProjectLayout::DirectoryBased {
                root: path.to_path_buf(),
                config_dir: path.join(IDEA_PROJECT_DIRNAME),
            }
        } else {
            ProjectLayout::FileBased {
                project_file: path.to_path_buf(),
            }
        }
    }

    /// Path handed to the loader: the `.idea` directory or the `.ipr` file.
    pub fn load_path(&self) -> &Path {
        match self {
            ProjectLayout::DirectoryBased { config_dir, .. } => config_dir,
            ProjectLayout::FileBased { project_file } => project_file,
        }
    }

    /// Directory `$PROJECT_DIR$` expands to.
    pub fn base_dir(&self) -> &Path {
        match self {
            ProjectLayout::DirectoryBased { root, .. } => root,
            ProjectLayout::FileBased { project_file } => {
                project_file.parent().unwrap_or(Path::new("."))
            }
        }
    }
}

/// A path is file based when it is not a directory and carries the `.ipr`
/// extension; everything else is treated as a directory-based project.
pub fn is_directory_based(path: &Path) -> bool {
    path.is_dir() || !has_project_file_extension(path)
}

fn has_project_file_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_FILE_EXTENSION))
}

/// Project name derived from the final path component, lower-cased, with the
/// `.ipr` extension stripped for file-based projects.
pub fn project_name(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("root")
        .to_lowercase();

    if !is_directory_based(path) {
        let suffix = format!(".{PROJECT_FILE_EXTENSION}");
        if let Some(stripped) = name.strip_suffix(&suffix) {
            return stripped.to_string();
        }
    }
    name
}

/// Canonical absolute form of a project path used as the project cache key.
///
/// Fails when the path does not exist.
pub fn normalize_project_path(path: &Path) -> std::io::Result<PathBuf> {
    dunce::canonicalize(path)
}

/// Lexical absolute form of `path`. Symlinks are not resolved, so this works
/// for paths that no longer exist.
pub fn absolute_project_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
