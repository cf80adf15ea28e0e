use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// An IDEA project written to a temporary directory.
///
/// Every module `<m>` lives in `<base>/<m>/<m>.iml`, has a single `src/`
/// source root, and inherits the project output `<base>/out`.
pub struct ProjectFixture {
    tmp: TempDir,
    base_dir: PathBuf,
    path: PathBuf,
}

impl ProjectFixture {
    /// `<tmp>/<name>/.idea/{modules.xml,misc.xml}`.
    pub fn directory_based(name: &str, modules: &[&str]) -> Self {
        let modules: Vec<(&str, &[&str])> = modules.iter().map(|m| (*m, &[][..])).collect();
        Self::directory_based_with_deps(name, &modules)
    }

    /// Like [`ProjectFixture::directory_based`] with module-to-module dependencies.
    pub fn directory_based_with_deps(name: &str, modules: &[(&str, &[&str])]) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join(name);
        let idea = base_dir.join(".idea");
        fs::create_dir_all(&idea).expect("create .idea");

        write(&idea.join("modules.xml"), &project_xml(&module_manager(modules)));
        write(&idea.join("misc.xml"), &project_xml(ROOT_MANAGER));
        write_modules(&base_dir, modules);

        Self {
            tmp,
            path: base_dir.clone(),
            base_dir,
        }
    }

    /// `<tmp>/<name>/<name>.ipr`.
    pub fn file_based(name: &str, modules: &[&str]) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join(name);
        fs::create_dir_all(&base_dir).expect("create project dir");

        let modules: Vec<(&str, &[&str])> = modules.iter().map(|m| (*m, &[][..])).collect();
        let components = format!("{}{}", module_manager(&modules), ROOT_MANAGER);
        let path = base_dir.join(format!("{name}.ipr"));
        write(&path, &project_xml(&components));
        write_modules(&base_dir, &modules);

        Self {
            tmp,
            base_dir,
            path,
        }
    }

    /// Path to hand to the build server (project directory or `.ipr` file).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory `$PROJECT_DIR$` expands to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Root of the temporary directory; handy for sibling cache directories.
    pub fn temp_dir(&self) -> &Path {
        self.tmp.path()
    }

    pub fn write(&self, rel: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.base_dir.join(rel);
        write(&path, contents);
        path
    }
}

/// Contents of a Java module file with the given module dependencies.
pub fn module_file(module_deps: &[&str]) -> String {
    let mut entries = String::from(
        "    <orderEntry type=\"inheritedJdk\" />\n    <orderEntry type=\"sourceFolder\" forTests=\"false\" />\n",
    );
    for dep in module_deps {
        entries.push_str(&format!(
            "    <orderEntry type=\"module\" module-name=\"{dep}\" />\n"
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<module type="JAVA_MODULE" version="4">
  <component name="NewModuleRootManager" inherit-compiler-output="true">
    <content url="file://$MODULE_DIR$">
      <sourceFolder url="file://$MODULE_DIR$/src" isTestSource="false" />
    </content>
{entries}  </component>
</module>
"#
    )
}

const ROOT_MANAGER: &str = r#"  <component name="ProjectRootManager" version="2" project-jdk-name="17" project-jdk-type="JavaSDK">
    <output url="file://$PROJECT_DIR$/out" />
  </component>
"#;

fn module_manager(modules: &[(&str, &[&str])]) -> String {
    let mut out = String::from("  <component name=\"ProjectModuleManager\">\n    <modules>\n");
    for (module, _) in modules {
        out.push_str(&format!(
            "      <module fileurl=\"file://$PROJECT_DIR$/{module}/{module}.iml\" filepath=\"$PROJECT_DIR$/{module}/{module}.iml\" />\n"
        ));
    }
    out.push_str("    </modules>\n  </component>\n");
    out
}

fn project_xml(components: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project version=\"4\">\n{components}</project>\n")
}

fn write_modules(base_dir: &Path, modules: &[(&str, &[&str])]) {
    for (module, deps) in modules {
        let dir = base_dir.join(module);
        fs::create_dir_all(dir.join("src")).expect("create module src");
        write(&dir.join(format!("{module}.iml")), &module_file(deps));
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write fixture file");
}
