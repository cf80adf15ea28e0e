//! Readers for the XML component files of IDEA projects and modules.

use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::loader::ProjectError;
use crate::macros::PathMacros;
use crate::{LibraryLevel, Module, ModuleDependency};

const MODULE_MANAGER: &str = "ProjectModuleManager";
const ROOT_MANAGER: &str = "ProjectRootManager";
const LIBRARY_TABLE: &str = "libraryTable";
const MODULE_ROOT_MANAGER: &str = "NewModuleRootManager";
const MODULE_FILE_EXTENSION: &str = "iml";

/// Project-level configuration gathered from one `.ipr` file or from the
/// files of an `.idea/` directory. Urls are still unexpanded.
#[derive(Debug, Default)]
pub(crate) struct ProjectComponents {
    pub(crate) module_files: Vec<String>,
    pub(crate) project_sdk: Option<String>,
    pub(crate) output_url: Option<String>,
    pub(crate) libraries: Vec<RawLibrary>,
}

#[derive(Debug)]
pub(crate) struct RawLibrary {
    pub(crate) name: String,
    pub(crate) class_urls: Vec<String>,
}

pub(crate) fn read_project_file_components(
    project_file: &Path,
) -> Result<ProjectComponents, ProjectError> {
    let text = read_xml(project_file)?;
    let doc = parse_xml(project_file, &text)?;
    let root = doc.root_element();

    let mut components = ProjectComponents::default();
    if let Some(manager) = find_component(root, MODULE_MANAGER) {
        components.module_files = module_file_refs(manager);
    }
    if let Some(manager) = find_component(root, ROOT_MANAGER) {
        read_root_manager(manager, &mut components);
    }
    if let Some(table) = find_component(root, LIBRARY_TABLE) {
        components.libraries = libraries_in(table);
    }
    Ok(components)
}

pub(crate) fn read_directory_components(
    config_dir: &Path,
) -> Result<ProjectComponents, ProjectError> {
    let mut components = ProjectComponents::default();

    let modules_xml = config_dir.join("modules.xml");
    if modules_xml.is_file() {
        let text = read_xml(&modules_xml)?;
        let doc = parse_xml(&modules_xml, &text)?;
        if let Some(manager) = find_component(doc.root_element(), MODULE_MANAGER) {
            components.module_files = module_file_refs(manager);
        }
    }

    let misc_xml = config_dir.join("misc.xml");
    if misc_xml.is_file() {
        let text = read_xml(&misc_xml)?;
        let doc = parse_xml(&misc_xml, &text)?;
        if let Some(manager) = find_component(doc.root_element(), ROOT_MANAGER) {
            read_root_manager(manager, &mut components);
        }
    }

    let libraries_dir = config_dir.join("libraries");
    if libraries_dir.is_dir() {
        let mut files = std::fs::read_dir(&libraries_dir)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|entry| entry.path()))
                    .collect::<std::io::Result<Vec<_>>>()
            })
            .map_err(|source| ProjectError::Io {
                path: libraries_dir.clone(),
                source,
            })?;
        files.retain(|path| path.extension().is_some_and(|ext| ext == "xml"));
        files.sort();

        for file in files {
            let text = read_xml(&file)?;
            let doc = parse_xml(&file, &text)?;
            if let Some(table) = find_component(doc.root_element(), LIBRARY_TABLE) {
                components.libraries.extend(libraries_in(table));
            }
        }
    }

    Ok(components)
}

pub(crate) fn read_module_file(
    module_file: &Path,
    macros: &PathMacros<'_>,
    project_output: Option<&Path>,
) -> Result<Module, ProjectError> {
    let name = module_file
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|_| {
            module_file
                .extension()
                .is_some_and(|ext| ext == MODULE_FILE_EXTENSION)
        })
        .ok_or_else(|| ProjectError::Invalid {
            path: module_file.to_path_buf(),
            reason: format!("module files must have the `.{MODULE_FILE_EXTENSION}` extension"),
        })?
        .to_string();
    let module_dir = module_file.parent().unwrap_or(Path::new(".")).to_path_buf();
    let macros = macros.for_module(&module_dir);

    let text = read_xml(module_file)?;
    let doc = parse_xml(module_file, &text)?;
    let mut module = Module::new(name, module_dir.clone());

    let Some(manager) = find_component(doc.root_element(), MODULE_ROOT_MANAGER) else {
        // Non-Java modules have no root manager; they contribute nothing to compile.
        return Ok(module);
    };

    if manager.attribute("inherit-compiler-output") == Some("true") {
        if let Some(out) = project_output {
            module.output_dir = Some(out.join("production").join(&module.name));
            module.test_output_dir = Some(out.join("test").join(&module.name));
        }
    } else {
        for child in manager.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "output" => {
                    module.output_dir = child.attribute("url").map(|url| macros.url_to_path(url));
                }
                "output-test" => {
                    module.test_output_dir =
                        child.attribute("url").map(|url| macros.url_to_path(url));
                }
                _ => {}
            }
        }
    }

    for content in manager.children().filter(|n| n.has_tag_name("content")) {
        for folder in content
            .children()
            .filter(|n| n.has_tag_name("sourceFolder"))
        {
            let Some(url) = folder.attribute("url") else {
                continue;
            };
            let path = macros.url_to_path(url);
            if folder.attribute("isTestSource") == Some("true") {
                module.test_source_roots.push(path);
            } else {
                module.source_roots.push(path);
            }
        }
    }

    for entry in manager.children().filter(|n| n.has_tag_name("orderEntry")) {
        if let Some(dep) = order_entry(entry, module_file, &macros)? {
            module.dependencies.push(dep);
        }
    }

    Ok(module)
}

fn order_entry(
    entry: Node<'_, '_>,
    module_file: &Path,
    macros: &PathMacros<'_>,
) -> Result<Option<ModuleDependency>, ProjectError> {
    let invalid = |reason: &str| ProjectError::Invalid {
        path: module_file.to_path_buf(),
        reason: reason.to_string(),
    };

    let dep = match entry.attribute("type") {
        Some("module") => ModuleDependency::Module {
            name: entry
                .attribute("module-name")
                .ok_or_else(|| invalid("module order entry without `module-name`"))?
                .to_string(),
        },
        Some("library") => {
            let name = entry
                .attribute("name")
                .ok_or_else(|| invalid("library order entry without `name`"))?
                .to_string();
            let level = match entry.attribute("level") {
                Some("application") => LibraryLevel::Application,
                Some("project") | None => LibraryLevel::Project,
                Some(other) => {
                    tracing::debug!(
                        target: "jolt.project",
                        module_file = %module_file.display(),
                        level = other,
                        library = %name,
                        "ignoring library with unsupported level"
                    );
                    return Ok(None);
                }
            };
            ModuleDependency::Library { name, level }
        }
        Some("module-library") => {
            let classpath = entry
                .children()
                .filter(|n| n.has_tag_name("library"))
                .flat_map(class_urls)
                .map(|url| macros.url_to_path(&url))
                .collect();
            ModuleDependency::ModuleLibrary { classpath }
        }
        Some("jdk") => ModuleDependency::Sdk {
            name: entry
                .attribute("jdkName")
                .ok_or_else(|| invalid("jdk order entry without `jdkName`"))?
                .to_string(),
        },
        Some("inheritedJdk") => ModuleDependency::InheritedSdk,
        _ => return Ok(None),
    };
    Ok(Some(dep))
}

fn read_root_manager(manager: Node<'_, '_>, components: &mut ProjectComponents) {
    components.project_sdk = manager
        .attribute("project-jdk-name")
        .map(str::to_string)
        .filter(|name| !name.is_empty());
    components.output_url = manager
        .children()
        .find(|n| n.has_tag_name("output"))
        .and_then(|n| n.attribute("url"))
        .map(str::to_string);
}

fn module_file_refs(manager: Node<'_, '_>) -> Vec<String> {
    manager
        .descendants()
        .filter(|n| n.has_tag_name("module"))
        .filter_map(|n| {
            n.attribute("filepath")
                .map(str::to_string)
                .or_else(|| {
                    n.attribute("fileurl")
                        .map(|url| url.strip_prefix("file://").unwrap_or(url).to_string())
                })
        })
        .collect()
}

fn libraries_in(table: Node<'_, '_>) -> Vec<RawLibrary> {
    table
        .children()
        .filter(|n| n.has_tag_name("library"))
        .filter_map(|library| {
            let name = library.attribute("name")?.to_string();
            Some(RawLibrary {
                name,
                class_urls: class_urls(library),
            })
        })
        .collect()
}

fn class_urls(library: Node<'_, '_>) -> Vec<String> {
    library
        .children()
        .filter(|n| n.has_tag_name("CLASSES"))
        .flat_map(|classes| classes.children().filter(|n| n.has_tag_name("root")))
        .filter_map(|root| root.attribute("url").map(str::to_string))
        .collect()
}

/// The `<component name=..>` element that is `root` itself or one of its children.
///
/// Files under `.idea/libraries/` use the component as the document root.
fn find_component<'a, 'input>(root: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    if is_component(root, name) {
        return Some(root);
    }
    root.children().find(|n| is_component(*n, name))
}

fn is_component(node: Node<'_, '_>, name: &str) -> bool {
    node.has_tag_name("component") && node.attribute("name") == Some(name)
}

fn read_xml(path: &Path) -> Result<String, ProjectError> {
    std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_xml<'input>(path: &Path, text: &'input str) -> Result<Document<'input>, ProjectError> {
    Document::parse(text).map_err(|source| ProjectError::Xml {
        path: PathBuf::from(path),
        source,
    })
}
