use std::path::PathBuf;

use jolt_core::{BuildMessage, BuildParameters, BuildType, MessageHandler, SERVER_MESSAGE_SOURCE};
use jolt_mappings::{Mappings, MappingsError};
use jolt_project::ProjectDescriptor;
use thiserror::Error;

use crate::CompileScope;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("failed to remove {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Mappings(#[from] MappingsError),

    #[error("{0}")]
    Failed(String),
}

impl BuilderError {
    pub fn failed(message: impl Into<String>) -> Self {
        BuilderError::Failed(message.into())
    }
}

/// The incremental compiler driven by the build server.
///
/// `build` is called for REBUILD and MAKE requests with an open mapping store;
/// `clean` for CLEAN requests, without one.
pub trait IncrementalBuilder: Send + Sync {
    fn build(&self, context: &mut BuildContext<'_>) -> Result<(), BuilderError>;

    fn clean(&self, context: &CleanContext<'_>) -> Result<(), BuilderError> {
        clean_output_dirs(context)
    }
}

/// Everything a builder sees while compiling one scope.
pub struct BuildContext<'a> {
    scope: &'a CompileScope,
    parameters: &'a BuildParameters,
    build_type: BuildType,
    mappings: &'a mut Mappings,
    messages: &'a dyn MessageHandler,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        scope: &'a CompileScope,
        parameters: &'a BuildParameters,
        build_type: BuildType,
        mappings: &'a mut Mappings,
        messages: &'a dyn MessageHandler,
    ) -> Self {
        Self {
            scope,
            parameters,
            build_type,
            mappings,
            messages,
        }
    }

    pub fn project(&self) -> &ProjectDescriptor {
        self.scope.project()
    }

    pub fn scope(&self) -> &CompileScope {
        self.scope
    }

    /// Parameters as requested by the caller.
    pub fn parameters(&self) -> &BuildParameters {
        self.parameters
    }

    /// The build type actually run; MAKE may have been escalated to REBUILD.
    pub fn build_type(&self) -> BuildType {
        self.build_type
    }

    /// Only units affected by changes need recompiling.
    pub fn is_incremental(&self) -> bool {
        self.build_type == BuildType::Make
    }

    pub fn mappings(&self) -> &Mappings {
        &*self.mappings
    }

    pub fn mappings_mut(&mut self) -> &mut Mappings {
        &mut *self.mappings
    }

    pub fn report(&self, message: BuildMessage) {
        self.messages.process_message(&message);
    }
}

/// Everything a builder sees while cleaning one scope.
pub struct CleanContext<'a> {
    scope: &'a CompileScope,
    parameters: &'a BuildParameters,
    messages: &'a dyn MessageHandler,
}

impl<'a> CleanContext<'a> {
    pub(crate) fn new(
        scope: &'a CompileScope,
        parameters: &'a BuildParameters,
        messages: &'a dyn MessageHandler,
    ) -> Self {
        Self {
            scope,
            parameters,
            messages,
        }
    }

    pub fn project(&self) -> &ProjectDescriptor {
        self.scope.project()
    }

    pub fn scope(&self) -> &CompileScope {
        self.scope
    }

    pub fn parameters(&self) -> &BuildParameters {
        self.parameters
    }

    pub fn report(&self, message: BuildMessage) {
        self.messages.process_message(&message);
    }
}

/// Delete the production and test output directories of every module in scope.
pub fn clean_output_dirs(context: &CleanContext<'_>) -> Result<(), BuilderError> {
    for module in context.scope().modules() {
        for dir in module.output_dirs() {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {
                    tracing::debug!(
                        target: "jolt.build",
                        module = %module.name,
                        path = %dir.display(),
                        "removed output directory"
                    );
                    context.report(BuildMessage::progress(
                        SERVER_MESSAGE_SOURCE,
                        format!("Cleaned output directory {}", dir.display()),
                    ));
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(BuilderError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }
    Ok(())
}
