use std::path::PathBuf;
use std::sync::Arc;

use jolt_build::BuildError;
use jolt_core::{BuildParameters, NullMessageHandler};
use jolt_project::{GlobalLibrary, LibraryLevel, PathVariables, ProjectError};
use jolt_test_utils::ProjectFixture;

use super::support::{server_for, RecordingBuilder, ALL_MODULES};

#[test]
fn loading_twice_returns_the_cached_descriptor() {
    let fixture = ProjectFixture::directory_based("MyProj", &["core", "ui", "test"]);
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()));

    let first = server.get_or_load(fixture.path()).unwrap();
    let second = server.get_or_load(fixture.path()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name, "myproj");
    assert_eq!(server.state().cached_project_count(), 1);
}

#[test]
fn build_requests_reuse_the_cached_descriptor() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()));
    let before = server.get_or_load(fixture.path()).unwrap();

    server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap();

    assert!(Arc::ptr_eq(&before, &server.get_or_load(fixture.path()).unwrap()));
}

#[test]
fn set_globals_forces_a_reload() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()));
    let before = server.get_or_load(fixture.path()).unwrap();
    assert!(before.global_libraries.is_empty());

    server.set_globals(
        vec![
            GlobalLibrary::library("guava", vec![PathBuf::from("/libs/guava.jar")]),
            GlobalLibrary::sdk("17", "/opt/jdk-17", Vec::new()),
        ],
        PathVariables::new(),
    );
    let after = server.get_or_load(fixture.path()).unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(server.generation(), 1);
    assert!(after.library("guava", LibraryLevel::Application).is_some());
    let core = after.module("core").expect("core module");
    assert_eq!(
        after.module_sdk(core).map(|sdk| sdk.home.clone()),
        Some(PathBuf::from("/opt/jdk-17"))
    );
}

#[test]
fn clear_project_cache_only_evicts_the_given_projects() {
    let first = ProjectFixture::directory_based("first", &["core"]);
    let second = ProjectFixture::file_based("second", &["core"]);
    let server = server_for(&first, Arc::new(RecordingBuilder::default()));

    let a = server.get_or_load(first.path()).unwrap();
    let b = server.get_or_load(second.path()).unwrap();

    server.clear_project_cache([first.path()]);

    assert!(!Arc::ptr_eq(&a, &server.get_or_load(first.path()).unwrap()));
    assert!(Arc::ptr_eq(&b, &server.get_or_load(second.path()).unwrap()));
    assert_eq!(server.generation(), 0);
}

#[test]
fn project_names_follow_the_layout() {
    let dir = ProjectFixture::directory_based("MyProj", &[]);
    let file = ProjectFixture::file_based("MyProj", &[]);
    let server = server_for(&dir, Arc::new(RecordingBuilder::default()));

    assert_eq!(server.get_or_load(dir.path()).unwrap().name, "myproj");
    assert_eq!(server.get_or_load(file.path()).unwrap().name, "myproj");
}

#[test]
fn failed_loads_are_not_cached() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());
    let modules_xml = std::fs::read_to_string(fixture.base_dir().join(".idea/modules.xml")).unwrap();
    fixture.write(".idea/modules.xml", "<project><component");

    let err = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap_err();
    assert!(
        matches!(err, BuildError::Project(ProjectError::Xml { .. })),
        "unexpected error: {err:?}"
    );
    assert_eq!(server.state().cached_project_count(), 0);
    assert!(builder.runs().is_empty());

    fixture.write(".idea/modules.xml", &modules_xml);
    let project = server.get_or_load(fixture.path()).unwrap();
    assert_eq!(project.module_names().collect::<Vec<_>>(), ["core"]);
}

#[test]
fn missing_project_is_a_configuration_error() {
    let fixture = ProjectFixture::directory_based("app", &[]);
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()));

    let err = server
        .start_build(
            &fixture.temp_dir().join("does-not-exist"),
            ALL_MODULES,
            &BuildParameters::rebuild(),
            &NullMessageHandler,
        )
        .unwrap_err();
    assert!(
        matches!(err, BuildError::Project(ProjectError::MissingProjectFile { .. })),
        "unexpected error: {err:?}"
    );
}
