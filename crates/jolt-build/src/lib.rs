//! Build orchestration for IDE projects.
//!
//! [`BuildServer`] is the entry point: it resolves and caches project
//! descriptors, owns the process-wide global libraries and path variables,
//! opens the per-project dependency mappings, resolves the compile scope and
//! drives an [`IncrementalBuilder`], streaming messages to the caller.
//!
//! The compiler itself is a collaborator; this crate only decides *what* to
//! build and keeps the on-disk state consistent around it.

mod builder;
mod coordinator;
mod hooks;
mod messages;
mod scope;
mod server;
mod state;

pub use builder::{clean_output_dirs, BuildContext, BuilderError, CleanContext, IncrementalBuilder};
pub use coordinator::{BuildCoordinator, BuildPermit};
pub use hooks::PostBuildHook;
pub use jolt_config::ConcurrentBuildPolicy;
pub use scope::CompileScope;
pub use server::{BuildOutcome, BuildServer, CORRUPT_MAPPINGS_MESSAGE};
pub use state::ConfigurationState;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Project(#[from] jolt_project::ProjectError),

    #[error(transparent)]
    Mappings(#[from] jolt_mappings::MappingsError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Config(#[from] jolt_config::ConfigError),

    #[error("a build for {path} is already in progress")]
    BuildInProgress { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, BuildError>;
