use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MappingsError>;

/// Errors produced while opening, querying, or persisting a mapping store.
#[derive(Debug, thiserror::Error)]
pub enum MappingsError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dependency mappings at {path} are corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("incompatible mappings schema version at {path}: expected {expected}, found {found}")]
    IncompatibleSchemaVersion {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("mappings at {path} were written by jolt {found}, expected {expected}")]
    IncompatibleJoltVersion {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("dependency mappings at {path} are already open")]
    Locked { path: PathBuf },
}

impl MappingsError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| MappingsError::Io { path, source }
    }

    /// The backing file or directory vanished while the store was being opened.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MappingsError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// The on-disk data cannot be trusted and the store should be discarded.
    pub fn is_corruption(&self) -> bool {
        match self {
            MappingsError::Corrupt { .. }
            | MappingsError::IncompatibleSchemaVersion { .. }
            | MappingsError::IncompatibleJoltVersion { .. }
            | MappingsError::Bincode(_) => true,
            MappingsError::Io { .. } => !self.is_not_found(),
            MappingsError::Locked { .. } => false,
        }
    }
}
