use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jolt_config::{ConcurrentBuildPolicy, JoltConfig};
use jolt_core::{BuildMessage, BuildParameters, BuildType, MessageHandler, SERVER_MESSAGE_SOURCE};
use jolt_mappings::{mappings_storage_root, Mappings, MappingsError};
use jolt_project::{
    GlobalLibrary, IdeaProjectLoader, PathVariables, ProjectDescriptor, ProjectLoader,
};

use crate::messages::MessageDispatcher;
use crate::{
    BuildContext, BuildCoordinator, CleanContext, CompileScope, ConfigurationState,
    IncrementalBuilder, PostBuildHook, Result,
};

/// Prefix of the warning sent when a project's dependency mappings cannot be
/// read and the build falls back to REBUILD.
pub const CORRUPT_MAPPINGS_MESSAGE: &str =
    "Problems reading dependency information, rebuild required";

/// Summary of a finished build request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Build type the caller asked for.
    pub requested: BuildType,
    /// Build type that actually ran.
    pub build_type: BuildType,
    /// Modules in scope, in project order.
    pub modules: Vec<String>,
    pub errors: usize,
    pub warnings: usize,
}

impl BuildOutcome {
    pub fn was_escalated(&self) -> bool {
        self.requested != self.build_type
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// An explicitly constructed build service.
///
/// Owns the configuration state (project cache, global libraries, path
/// variables), the per-project build coordinator and the collaborators a build
/// needs. Share it between request threads with an `Arc`.
pub struct BuildServer {
    state: ConfigurationState,
    builder: Arc<dyn IncrementalBuilder>,
    hooks: Vec<Arc<dyn PostBuildHook>>,
    cache_root: PathBuf,
    coordinator: BuildCoordinator,
}

impl BuildServer {
    /// A server loading `.idea`/`.ipr` projects and storing mappings under `cache_root`.
    pub fn new(cache_root: impl Into<PathBuf>, builder: Arc<dyn IncrementalBuilder>) -> Self {
        Self::with_loader(cache_root, Arc::new(IdeaProjectLoader), builder)
    }

    pub fn with_loader(
        cache_root: impl Into<PathBuf>,
        loader: Arc<dyn ProjectLoader>,
        builder: Arc<dyn IncrementalBuilder>,
    ) -> Self {
        Self {
            state: ConfigurationState::new(loader),
            builder,
            hooks: Vec::new(),
            cache_root: cache_root.into(),
            coordinator: BuildCoordinator::new(ConcurrentBuildPolicy::default()),
        }
    }

    /// Wire a server from `jolt.toml` settings: cache root, concurrent-build
    /// policy and initial globals.
    pub fn from_config(config: &JoltConfig, builder: Arc<dyn IncrementalBuilder>) -> Result<Self> {
        let cache_root = config.cache.resolve_root()?;
        let server = Self::new(cache_root, builder).with_policy(config.build.concurrent_builds);
        server.set_globals(
            config.globals.libraries.clone(),
            config.globals.path_variables.clone(),
        );
        Ok(server)
    }

    pub fn with_policy(mut self, policy: ConcurrentBuildPolicy) -> Self {
        self.coordinator = BuildCoordinator::new(policy);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostBuildHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn policy(&self) -> ConcurrentBuildPolicy {
        self.coordinator.policy()
    }

    pub fn state(&self) -> &ConfigurationState {
        &self.state
    }

    pub fn get_or_load(&self, project_path: &Path) -> Result<Arc<ProjectDescriptor>> {
        Ok(self.state.get_or_load(project_path)?)
    }

    pub fn clear_project_cache<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.state.clear_project_cache(paths);
    }

    pub fn set_globals(&self, libraries: Vec<GlobalLibrary>, path_variables: PathVariables) {
        self.state.set_globals(libraries, path_variables);
    }

    pub fn generation(&self) -> u64 {
        self.state.generation()
    }

    /// Whether a build for the project at `project_path` is running right now.
    pub fn is_building(&self, project_path: &Path) -> bool {
        self.coordinator.is_building(&self.state.cache_key(project_path))
    }

    /// Directory holding the dependency mappings of `project`.
    pub fn mappings_root(&self, project: &ProjectDescriptor) -> PathBuf {
        mappings_storage_root(&self.cache_root, &project.name, &project.path)
    }

    /// Run one build request.
    ///
    /// Configuration errors (unloadable project, unusable mapping store) fail
    /// the request before the builder runs. Builder errors are returned after
    /// cleanup; the mapping store is closed and post-build hooks run on every
    /// exit path, including a panicking builder.
    pub fn start_build<I, S>(
        &self,
        project_path: &Path,
        modules: I,
        params: &BuildParameters,
        handler: &dyn MessageHandler,
    ) -> Result<BuildOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let project = self.state.get_or_load(project_path)?;
        let _permit = self.coordinator.acquire(&project.path)?;

        let messages = MessageDispatcher::new(handler, &project.name);
        let scope = CompileScope::resolve(Arc::clone(&project), modules);
        for name in scope.unknown_modules() {
            messages.process_message(&BuildMessage::warning(
                SERVER_MESSAGE_SOURCE,
                format!("Module '{name}' not found in project '{}'", project.name),
            ));
        }

        let requested = params.build_type;
        tracing::info!(
            target: "jolt.build",
            project = %project.name,
            build_type = %requested,
            modules = scope.len(),
            "build started"
        );

        let mut cleanup = BuildCleanup {
            hooks: &self.hooks,
            project_name: &project.name,
            mappings: None,
        };
        let (build_type, result) = if requested.uses_mappings() {
            let opened = self.open_mappings(&project, &messages)?;
            let build_type = match requested {
                BuildType::Make if opened.recovered || opened.mappings.is_fresh() => {
                    tracing::info!(
                        target: "jolt.build",
                        project = %project.name,
                        recovered = opened.recovered,
                        "no usable dependency information; running make as rebuild"
                    );
                    BuildType::Rebuild
                }
                other => other,
            };

            let mappings = cleanup.mappings.insert(opened.mappings);
            if build_type == BuildType::Rebuild {
                mappings.clear();
            }
            let mut context = BuildContext::new(&scope, params, build_type, mappings, &messages);
            (build_type, self.builder.build(&mut context))
        } else {
            let context = CleanContext::new(&scope, params, &messages);
            (requested, self.builder.clean(&context))
        };
        drop(cleanup);

        let outcome = BuildOutcome {
            requested,
            build_type,
            modules: scope.module_names().map(str::to_string).collect(),
            errors: messages.errors(),
            warnings: messages.warnings(),
        };
        match result {
            Ok(()) => {
                tracing::info!(
                    target: "jolt.build",
                    project = %project.name,
                    build_type = %build_type,
                    errors = outcome.errors,
                    warnings = outcome.warnings,
                    "build finished"
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(
                    target: "jolt.build",
                    project = %project.name,
                    build_type = %build_type,
                    error = %err,
                    "build failed"
                );
                Err(err.into())
            }
        }
    }

    fn open_mappings(
        &self,
        project: &ProjectDescriptor,
        messages: &dyn MessageHandler,
    ) -> std::result::Result<OpenedMappings, MappingsError> {
        let root = self.mappings_root(project);
        let opened = match Mappings::open(&root) {
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    target: "jolt.build",
                    path = %root.display(),
                    error = %err,
                    "dependency mappings vanished while opening; retrying"
                );
                Mappings::open(&root)
            }
            other => other,
        };

        match opened {
            Ok(mappings) => Ok(OpenedMappings {
                mappings,
                recovered: false,
            }),
            Err(err) if err.is_corruption() => {
                tracing::warn!(
                    target: "jolt.build",
                    project = %project.name,
                    path = %root.display(),
                    error = %err,
                    "discarding unreadable dependency mappings"
                );
                messages.process_message(&BuildMessage::warning(
                    SERVER_MESSAGE_SOURCE,
                    format!("{CORRUPT_MAPPINGS_MESSAGE}: {err}"),
                ));
                match std::fs::remove_dir_all(&root) {
                    Ok(()) => {}
                    Err(source) if source.kind() == std::io::ErrorKind::NotFound => {}
                    Err(source) => return Err(MappingsError::Io { path: root, source }),
                }
                Ok(OpenedMappings {
                    mappings: Mappings::open(&root)?,
                    recovered: true,
                })
            }
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for BuildServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildServer")
            .field("state", &self.state)
            .field("hooks", &self.hooks.iter().map(|hook| hook.name()).collect::<Vec<_>>())
            .field("cache_root", &self.cache_root)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

struct OpenedMappings {
    mappings: Mappings,
    recovered: bool,
}

/// Closes the mapping store and runs post-build hooks when dropped, so both
/// happen exactly once on every exit path, unwinding included.
struct BuildCleanup<'a> {
    hooks: &'a [Arc<dyn PostBuildHook>],
    project_name: &'a str,
    mappings: Option<Mappings>,
}

impl Drop for BuildCleanup<'_> {
    fn drop(&mut self) {
        if let Some(mappings) = self.mappings.take() {
            let root = mappings.root().to_path_buf();
            if let Err(err) = mappings.close() {
                tracing::warn!(
                    target: "jolt.build",
                    project = self.project_name,
                    path = %root.display(),
                    error = %err,
                    "failed to close dependency mappings"
                );
            }
        }

        for hook in self.hooks {
            let project_name = self.project_name;
            match panic::catch_unwind(AssertUnwindSafe(|| hook.after_build(project_name))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        target: "jolt.build",
                        project = self.project_name,
                        hook = hook.name(),
                        error = %format!("{err:#}"),
                        "post-build hook failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        target: "jolt.build",
                        project = self.project_name,
                        hook = hook.name(),
                        "post-build hook panicked"
                    );
                }
            }
        }
        tracing::debug!(
            target: "jolt.build",
            project = self.project_name,
            "build cleanup finished"
        );
    }
}
