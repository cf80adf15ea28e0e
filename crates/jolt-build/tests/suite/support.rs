use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jolt_build::{BuildContext, BuildServer, BuilderError, IncrementalBuilder, PostBuildHook};
use jolt_core::BuildType;
use jolt_test_utils::ProjectFixture;

pub(crate) const ALL_MODULES: [&str; 0] = [];

/// What the builder observed during one `build` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Run {
    pub(crate) build_type: BuildType,
    pub(crate) incremental: bool,
    pub(crate) modules: Vec<String>,
    /// Units in the mapping store when the builder started.
    pub(crate) known_units: usize,
}

/// Records one `<module>.Main` unit per module in scope.
#[derive(Default)]
pub(crate) struct RecordingBuilder {
    runs: Mutex<Vec<Run>>,
}

impl RecordingBuilder {
    pub(crate) fn runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap().clone()
    }

    pub(crate) fn last_run(&self) -> Run {
        self.runs().pop().expect("builder was not invoked")
    }
}

impl IncrementalBuilder for RecordingBuilder {
    fn build(&self, context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
        let modules: Vec<String> = context.scope().module_names().map(str::to_string).collect();
        self.runs.lock().unwrap().push(Run {
            build_type: context.build_type(),
            incremental: context.is_incremental(),
            modules: modules.clone(),
            known_units: context.mappings().len(),
        });

        let mappings = context.mappings_mut();
        for module in modules {
            mappings.record_unit(format!("{module}.Main"), None, ["java.lang.Object"]);
        }
        Ok(())
    }
}

/// Counts invocations per project name.
#[derive(Default)]
pub(crate) struct CountingHook {
    calls: Mutex<Vec<String>>,
}

impl CountingHook {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PostBuildHook for CountingHook {
    fn name(&self) -> &str {
        "counting"
    }

    fn after_build(&self, project_name: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(project_name.to_string());
        Ok(())
    }
}

/// A hook that always fails.
pub(crate) struct FailingHook {
    pub(crate) calls: AtomicUsize,
}

impl PostBuildHook for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    fn after_build(&self, _project_name: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("zip index cache is not available")
    }
}

pub(crate) fn server_for(fixture: &ProjectFixture, builder: Arc<dyn IncrementalBuilder>) -> BuildServer {
    BuildServer::new(fixture.temp_dir().join("cache"), builder)
}

pub(crate) fn mappings_root(server: &BuildServer, project_path: &Path) -> std::path::PathBuf {
    let project = server.get_or_load(project_path).unwrap();
    server.mappings_root(&project)
}
