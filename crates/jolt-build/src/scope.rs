use std::collections::BTreeSet;
use std::sync::Arc;

use jolt_project::{Module, ProjectDescriptor};

/// The modules one build request targets.
#[derive(Debug, Clone)]
pub struct CompileScope {
    project: Arc<ProjectDescriptor>,
    /// Indices into `project.modules`, in project order.
    modules: Vec<usize>,
    unknown: Vec<String>,
}

impl CompileScope {
    /// A non-empty `requested` set selects the project modules with those
    /// names; an empty one selects every module.
    ///
    /// Requested names that match no module are kept in
    /// [`CompileScope::unknown_modules`].
    pub fn resolve<I, S>(project: Arc<ProjectDescriptor>, requested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> = requested
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();

        if requested.is_empty() {
            let modules = (0..project.modules.len()).collect();
            return Self {
                project,
                modules,
                unknown: Vec::new(),
            };
        }

        let modules = project
            .modules
            .iter()
            .enumerate()
            .filter(|(_, module)| requested.contains(&module.name))
            .map(|(idx, _)| idx)
            .collect();
        let unknown = requested
            .into_iter()
            .filter(|name| project.module(name).is_none())
            .collect();
        Self {
            project,
            modules,
            unknown,
        }
    }

    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().map(|&idx| &self.project.modules[idx])
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules().map(|module| module.name.as_str())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.module_names().any(|name| name == module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// `true` when every module of the project is in scope.
    pub fn is_whole_project(&self) -> bool {
        self.modules.len() == self.project.modules.len()
    }

    pub fn unknown_modules(&self) -> &[String] {
        &self.unknown
    }
}
