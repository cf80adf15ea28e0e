use std::sync::Arc;

use jolt_build::{BuildContext, BuilderError, IncrementalBuilder};
use jolt_core::{
    BuildMessage, BuildParameters, BuildType, CollectingMessageHandler, MessageKind,
    NullMessageHandler,
};
use jolt_mappings::Mappings;
use jolt_test_utils::ProjectFixture;

use super::support::{mappings_root, server_for, CountingHook, FailingHook, RecordingBuilder, ALL_MODULES};

#[test]
fn named_modules_restrict_the_scope() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui", "test"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());

    let outcome = server
        .start_build(fixture.path(), ["core"], &BuildParameters::rebuild(), &NullMessageHandler)
        .unwrap();

    assert_eq!(outcome.modules, ["core"]);
    assert_eq!(builder.last_run().modules, ["core"]);
}

#[test]
fn empty_module_set_builds_every_module() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui", "test"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());

    let outcome = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::rebuild(), &NullMessageHandler)
        .unwrap();

    assert_eq!(outcome.modules, ["core", "ui", "test"]);
    assert_eq!(builder.last_run().modules, ["core", "ui", "test"]);
}

#[test]
fn unknown_modules_are_reported_as_warnings() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());
    let messages = CollectingMessageHandler::new();

    let outcome = server
        .start_build(fixture.path(), ["ui", "docs"], &BuildParameters::rebuild(), &messages)
        .unwrap();

    assert_eq!(outcome.modules, ["ui"]);
    assert_eq!(outcome.warnings, 1);
    let warnings = messages.messages_of_kind(MessageKind::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].text.contains("docs"), "{}", warnings[0]);
}

#[test]
fn first_make_runs_as_rebuild_and_later_makes_are_incremental() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui", "test"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());

    let first = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap();
    assert_eq!(first.requested, BuildType::Make);
    assert_eq!(first.build_type, BuildType::Rebuild);
    assert!(first.was_escalated());

    let second = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap();
    assert_eq!(second.build_type, BuildType::Make);
    assert!(!second.was_escalated());

    let run = builder.last_run();
    assert!(run.incremental);
    assert_eq!(run.known_units, 3);
}

#[test]
fn deleted_store_turns_make_into_rebuild() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());
    let make = BuildParameters::make();

    server.start_build(fixture.path(), ALL_MODULES, &make, &NullMessageHandler).unwrap();
    let root = mappings_root(&server, fixture.path());
    assert!(root.is_dir());
    std::fs::remove_dir_all(&root).unwrap();

    let outcome = server.start_build(fixture.path(), ALL_MODULES, &make, &NullMessageHandler).unwrap();

    assert_eq!(outcome.build_type, BuildType::Rebuild);
    let run = builder.last_run();
    assert!(!run.incremental);
    assert_eq!(run.known_units, 0);
}

#[test]
fn rebuild_starts_from_empty_mappings() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());

    server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap();
    server
        .start_build(fixture.path(), ["core"], &BuildParameters::rebuild(), &NullMessageHandler)
        .unwrap();

    let run = builder.last_run();
    assert_eq!(run.build_type, BuildType::Rebuild);
    assert_eq!(run.known_units, 0);

    let mappings = Mappings::open(mappings_root(&server, fixture.path())).unwrap();
    assert_eq!(mappings.units().collect::<Vec<_>>(), ["core.Main"]);
}

#[test]
fn clean_removes_outputs_without_touching_mappings() {
    let fixture = ProjectFixture::directory_based("app", &["core", "ui"]);
    let builder = Arc::new(RecordingBuilder::default());
    let server = server_for(&fixture, builder.clone());
    let core_class = fixture.write("out/production/core/com/acme/Core.class", "");
    let core_test_class = fixture.write("out/test/core/com/acme/CoreTest.class", "");
    let ui_class = fixture.write("out/production/ui/com/acme/Ui.class", "");
    let messages = CollectingMessageHandler::new();

    let outcome = server
        .start_build(fixture.path(), ["core"], &BuildParameters::clean(), &messages)
        .unwrap();

    assert_eq!(outcome.build_type, BuildType::Clean);
    assert!(!core_class.exists());
    assert!(!core_test_class.exists());
    assert!(ui_class.exists());
    assert!(builder.runs().is_empty());
    assert!(!mappings_root(&server, fixture.path()).exists());
    assert_eq!(messages.messages_of_kind(MessageKind::Progress).len(), 2);
}

#[test]
fn hooks_run_once_per_build() {
    let fixture = ProjectFixture::directory_based("MyProj", &["core"]);
    let hook = Arc::new(CountingHook::default());
    let failing = Arc::new(FailingHook {
        calls: Default::default(),
    });
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()))
        .with_hook(failing.clone())
        .with_hook(hook.clone());

    for params in [BuildParameters::make(), BuildParameters::clean()] {
        server
            .start_build(fixture.path(), ALL_MODULES, &params, &NullMessageHandler)
            .unwrap();
    }

    // A failing hook neither fails the build nor stops later hooks.
    assert_eq!(hook.calls(), ["myproj", "myproj"]);
    assert_eq!(failing.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

struct DiagnosticBuilder;

impl IncrementalBuilder for DiagnosticBuilder {
    fn build(&self, context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
        let src = context.project().base_dir.join("core/src/Main.java");
        context.report(BuildMessage::error("javac", "cannot find symbol").at(&src, 3, 9));
        context.report(BuildMessage::warning("javac", "unchecked call").at(&src, 7, 1));
        context.report(BuildMessage::info("javac", "1 error, 1 warning"));
        Ok(())
    }
}

#[test]
fn builder_messages_reach_the_handler_and_are_counted() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let server = server_for(&fixture, Arc::new(DiagnosticBuilder));
    let messages = CollectingMessageHandler::new();

    let outcome = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::rebuild(), &messages)
        .unwrap();

    assert_eq!(outcome.errors, 1);
    assert_eq!(outcome.warnings, 1);
    assert!(outcome.has_errors());
    let received = messages.messages();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].line, Some(3));
}

#[test]
fn build_parameters_are_passed_through() {
    struct OptionsBuilder;

    impl IncrementalBuilder for OptionsBuilder {
        fn build(&self, context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
            match context.parameters().option("javac.release") {
                Some("17") => Ok(()),
                other => Err(BuilderError::failed(format!("unexpected release {other:?}"))),
            }
        }
    }

    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let server = server_for(&fixture, Arc::new(OptionsBuilder));
    let params = BuildParameters::rebuild().with_option("javac.release", "17");

    server
        .start_build(fixture.path(), ALL_MODULES, &params, &NullMessageHandler)
        .unwrap();
}
