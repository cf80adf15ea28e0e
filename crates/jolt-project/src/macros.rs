use crate::PathVariables;
use std::path::{Path, PathBuf};

pub const PROJECT_DIR_MACRO: &str = "PROJECT_DIR";
pub const MODULE_DIR_MACRO: &str = "MODULE_DIR";
pub const USER_HOME_MACRO: &str = "USER_HOME";

/// Expands `$NAME$` path macros found in project and module files.
#[derive(Debug, Clone)]
pub(crate) struct PathMacros<'a> {
    project_dir: &'a Path,
    module_dir: Option<&'a Path>,
    variables: &'a PathVariables,
}

impl<'a> PathMacros<'a> {
    pub(crate) fn new(project_dir: &'a Path, variables: &'a PathVariables) -> Self {
        Self {
            project_dir,
            module_dir: None,
            variables,
        }
    }

    pub(crate) fn for_module<'b>(&'b self, module_dir: &'b Path) -> PathMacros<'b> {
        PathMacros {
            project_dir: self.project_dir,
            module_dir: Some(module_dir),
            variables: self.variables,
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            PROJECT_DIR_MACRO => Some(self.project_dir.to_string_lossy().into_owned()),
            MODULE_DIR_MACRO => self
                .module_dir
                .map(|dir| dir.to_string_lossy().into_owned()),
            USER_HOME_MACRO => self.variables.get(name).cloned().or_else(|| {
                std::env::var_os("HOME")
                    .or_else(|| std::env::var_os("USERPROFILE"))
                    .map(|home| home.to_string_lossy().into_owned())
            }),
            _ => self.variables.get(name).cloned(),
        }
    }

    pub(crate) fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('$') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('$') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            let is_macro_name = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
            match self.lookup(name).filter(|_| is_macro_name) {
                Some(value) => {
                    out.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    if is_macro_name {
                        tracing::debug!(
                            target: "jolt.project",
                            macro_name = name,
                            "unknown path macro left unexpanded"
                        );
                        out.push('$');
                        out.push_str(name);
                        out.push('$');
                        rest = &after[end + 1..];
                    } else {
                        out.push('$');
                        rest = after;
                    }
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Convert a `file://` or `jar://...!/` url into a filesystem path.
    pub(crate) fn url_to_path(&self, url: &str) -> PathBuf {
        let stripped = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("jar://"))
            .unwrap_or(url);
        let stripped = stripped
            .strip_suffix("!/")
            .or_else(|| stripped.strip_suffix('!'))
            .unwrap_or(stripped);
        PathBuf::from(self.expand(stripped))
    }
}
