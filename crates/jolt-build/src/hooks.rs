/// Work run after every build, whatever its outcome.
///
/// Typical use is dropping compiler-internal caches (e.g. opened archive
/// indexes) that would otherwise keep output files locked. Failures are
/// logged and never fail the build.
pub trait PostBuildHook: Send + Sync {
    fn name(&self) -> &str;

    fn after_build(&self, project_name: &str) -> anyhow::Result<()>;
}
