use std::collections::HashSet;
use std::path::{Path, PathBuf};

use jolt_config::ConcurrentBuildPolicy;
use parking_lot::{Condvar, Mutex};

use crate::BuildError;

/// Guarantees at most one in-flight build per project path.
///
/// Independent of the configuration lock: builds for different projects
/// proceed concurrently, and waiting for a busy project never blocks cache
/// queries.
#[derive(Debug)]
pub struct BuildCoordinator {
    policy: ConcurrentBuildPolicy,
    in_flight: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

/// Exclusive right to build one project; released on drop.
#[derive(Debug)]
pub struct BuildPermit<'a> {
    coordinator: &'a BuildCoordinator,
    path: PathBuf,
}

impl BuildCoordinator {
    pub fn new(policy: ConcurrentBuildPolicy) -> Self {
        Self {
            policy,
            in_flight: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    pub fn policy(&self) -> ConcurrentBuildPolicy {
        self.policy
    }

    /// Claim `path`, waiting or failing according to the policy when it is busy.
    pub fn acquire(&self, path: &Path) -> Result<BuildPermit<'_>, BuildError> {
        let mut in_flight = self.in_flight.lock();
        while in_flight.contains(path) {
            match self.policy {
                ConcurrentBuildPolicy::Reject => {
                    return Err(BuildError::BuildInProgress {
                        path: path.to_path_buf(),
                    });
                }
                ConcurrentBuildPolicy::Wait => {
                    tracing::debug!(
                        target: "jolt.build",
                        path = %path.display(),
                        "waiting for in-flight build"
                    );
                    self.released.wait(&mut in_flight);
                }
            }
        }
        in_flight.insert(path.to_path_buf());
        Ok(BuildPermit {
            coordinator: self,
            path: path.to_path_buf(),
        })
    }

    pub fn is_building(&self, path: &Path) -> bool {
        self.in_flight.lock().contains(path)
    }
}

impl BuildPermit<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildPermit<'_> {
    fn drop(&mut self) {
        self.coordinator.in_flight.lock().remove(&self.path);
        self.coordinator.released.notify_all();
    }
}
