//! Persistent dependency mappings between compiled units.
//!
//! A [`Mappings`] store records, per project, which compiled unit depends on
//! which other units. Incremental builds query it to find the minimal
//! recompilation set; full rebuilds clear and rewrite it.
//!
//! ## On-disk layout
//!
//! `<cache_root>/<project-name>-<path-hash>/mappings/`:
//! - `mappings.bin`: `bincode` payload with a magic header and schema version
//! - `.lock`: lock file held for as long as a handle is open

mod error;
mod lock;
mod store;
mod util;

pub use error::{MappingsError, Result};
pub use store::{Mappings, UnitRecord, MAPPINGS_FILENAME, MAPPINGS_SCHEMA_VERSION};
pub use util::PAYLOAD_LIMIT_BYTES;

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Directory holding the mapping store of one project.
///
/// The project name keeps the directory recognizable; the hash of the
/// normalized project path keeps same-named projects apart.
pub fn mappings_storage_root(
    cache_root: &Path,
    project_name: &str,
    project_path: &Path,
) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(project_path.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    cache_root
        .join(format!("{project_name}-{}", &digest[..12]))
        .join("mappings")
}
