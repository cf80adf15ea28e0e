use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jolt_project::{
    absolute_project_path, normalize_project_path, GlobalLibrary, LoadRequest,
    PathVariables, ProjectDescriptor, ProjectError, ProjectLoader,
};
use parking_lot::Mutex;

/// Loaded projects plus the process-wide configuration they were loaded with.
///
/// Everything lives behind one lock: a descriptor is only valid for the
/// global libraries and path variables that were current when it was loaded,
/// so replacing those must evict every cached project atomically.
pub struct ConfigurationState {
    loader: Arc<dyn ProjectLoader>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    projects: HashMap<PathBuf, Arc<ProjectDescriptor>>,
    /// Absolute spelling a caller used -> canonical key it resolved to.
    aliases: HashMap<PathBuf, PathBuf>,
    global_libraries: Vec<GlobalLibrary>,
    path_variables: PathVariables,
    generation: u64,
}

impl ConfigurationState {
    pub fn new(loader: Arc<dyn ProjectLoader>) -> Self {
        Self {
            loader,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Return the cached descriptor for `path`, loading it on a miss.
    ///
    /// The load runs under the configuration lock, so concurrent requests for
    /// the same path observe a single load. A failed load caches nothing.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<ProjectDescriptor>, ProjectError> {
        let key = normalize_project_path(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProjectError::MissingProjectFile {
                    path: path.to_path_buf(),
                }
            } else {
                ProjectError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let alias = absolute_project_path(path);

        let mut inner = self.inner.lock();
        if let Some(project) = inner.projects.get(&key).cloned() {
            inner.record_alias(alias, &key);
            return Ok(project);
        }

        let request = LoadRequest {
            path: &key,
            global_libraries: &inner.global_libraries,
            path_variables: &inner.path_variables,
        };
        let project = match self.loader.load(&request) {
            Ok(project) => Arc::new(project),
            Err(err) => {
                tracing::debug!(
                    target: "jolt.build",
                    path = %key.display(),
                    error = %err,
                    "failed to load project"
                );
                return Err(err);
            }
        };
        tracing::debug!(
            target: "jolt.build",
            path = %key.display(),
            name = %project.name,
            modules = project.modules.len(),
            generation = inner.generation,
            "loaded project"
        );
        inner.record_alias(alias, &key);
        inner.projects.insert(key, Arc::clone(&project));
        Ok(project)
    }

    /// Cache key for `path`.
    ///
    /// This is the canonical path; a path that no longer resolves maps to the
    /// key it was last loaded under, or to its absolute form.
    pub fn cache_key(&self, path: &Path) -> PathBuf {
        match normalize_project_path(path) {
            Ok(key) => key,
            Err(_) => self.inner.lock().resolve_alias(absolute_project_path(path)),
        }
    }

    /// Evict the given projects; the next request reloads them from disk.
    pub fn clear_project_cache<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let resolved: Vec<Result<PathBuf, PathBuf>> = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                normalize_project_path(path).map_err(|_| absolute_project_path(path))
            })
            .collect();

        let mut inner = self.inner.lock();
        for resolved in resolved {
            let key = match resolved {
                Ok(key) => key,
                Err(absolute) => inner.resolve_alias(absolute),
            };
            inner.aliases.retain(|_, target| *target != key);
            if inner.projects.remove(&key).is_some() {
                tracing::debug!(
                    target: "jolt.build",
                    path = %key.display(),
                    "evicted project"
                );
            }
        }
    }

    /// Replace the global libraries and path variables, evicting every project.
    pub fn set_globals(&self, libraries: Vec<GlobalLibrary>, path_variables: PathVariables) {
        let mut inner = self.inner.lock();
        let evicted = inner.projects.len();
        inner.projects.clear();
        inner.aliases.clear();
        inner.global_libraries.clear();
        inner.global_libraries.extend(libraries);
        inner.path_variables.clear();
        inner.path_variables.extend(path_variables);
        inner.generation += 1;
        tracing::debug!(
            target: "jolt.build",
            libraries = inner.global_libraries.len(),
            path_variables = inner.path_variables.len(),
            generation = inner.generation,
            evicted,
            "replaced global configuration"
        );
    }

    /// Number of times the global configuration has been replaced.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn global_libraries(&self) -> Vec<GlobalLibrary> {
        self.inner.lock().global_libraries.clone()
    }

    pub fn path_variables(&self) -> PathVariables {
        self.inner.lock().path_variables.clone()
    }

    pub fn cached_project_count(&self) -> usize {
        self.inner.lock().projects.len()
    }
}

impl Inner {
    fn record_alias(&mut self, alias: PathBuf, key: &Path) {
        if alias != key {
            self.aliases.insert(alias, key.to_path_buf());
        }
    }

    fn resolve_alias(&self, absolute: PathBuf) -> PathBuf {
        self.aliases.get(&absolute).cloned().unwrap_or(absolute)
    }
}

impl std::fmt::Debug for ConfigurationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConfigurationState")
            .field("projects", &inner.projects.len())
            .field("global_libraries", &inner.global_libraries.len())
            .field("path_variables", &inner.path_variables.len())
            .field("generation", &inner.generation)
            .finish()
    }
}
