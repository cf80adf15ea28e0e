use std::sync::{Arc, Mutex};

use jolt_core::{BuildParameters, NullMessageHandler};
use jolt_test_utils::ProjectFixture;
use tracing::field::{Field, Visit};
use tracing::Event;
use tracing_subscriber::{layer::Context, prelude::*, EnvFilter, Layer};

use super::support::{server_for, RecordingBuilder, ALL_MODULES};

#[derive(Debug, Clone)]
struct CapturedEvent {
    target: String,
    message: String,
}

#[derive(Clone, Default)]
struct CapturingLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturingLayer {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }
}

impl<S> Layer<S> for CapturingLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(CapturedEvent {
                target: event.metadata().target().to_string(),
                message: visitor.message,
            });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

#[test]
fn build_events_use_dotted_targets() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let server = server_for(&fixture, Arc::new(RecordingBuilder::default()));

    let all = CapturingLayer::default();
    let filtered = CapturingLayer::default();
    let subscriber = tracing_subscriber::registry()
        .with(all.clone())
        .with(filtered.clone().with_filter(EnvFilter::new("jolt.build=trace")));
    let _guard = tracing::subscriber::set_default(subscriber);

    server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap();

    let events = all.events();
    assert!(
        events
            .iter()
            .any(|event| event.target == "jolt.build" && event.message == "build started"),
        "{events:?}"
    );
    assert!(
        events.iter().any(|event| event.target == "jolt.mappings"),
        "{events:?}"
    );
    assert!(
        events.iter().all(|event| event.target.starts_with("jolt.")),
        "{events:?}"
    );

    let passed = filtered.events();
    assert!(!passed.is_empty());
    assert!(
        passed.iter().all(|event| event.target.starts_with("jolt.build")),
        "{passed:?}"
    );
    assert!(passed.iter().any(|event| event.message == "build finished"), "{passed:?}");
}
