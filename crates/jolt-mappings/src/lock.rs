use crate::error::MappingsError;
use fs2::FileExt as _;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Exclusive ownership of one mapping store, across threads and processes.
///
/// Acquisition never blocks: a store that is already held yields
/// [`MappingsError::Locked`]. The lock is released when the value is dropped.
#[derive(Debug)]
pub(crate) struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub(crate) fn try_acquire(path: &Path) -> Result<Self, MappingsError> {
        // `fs2` file locks are process-scoped on Unix platforms (they don't exclude other
        // threads in the same process), so track held paths in-process as well.
        {
            let mut held = held_paths()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !held.insert(path.to_path_buf()) {
                return Err(MappingsError::Locked {
                    path: path.to_path_buf(),
                });
            }
        }

        match open_and_lock(path) {
            Ok(file) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(err) => {
                release_in_process(path);
                Err(err)
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        release_in_process(&self.path);
    }
}

fn open_and_lock(path: &Path) -> Result<File, MappingsError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(MappingsError::io(path))?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
            Err(MappingsError::Locked {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(MappingsError::io(path)(err)),
    }
}

fn held_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    HELD.get_or_init(|| Mutex::new(HashSet::new()))
}

fn release_in_process(path: &Path) {
    held_paths()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(path);
}
