use std::sync::atomic::{AtomicUsize, Ordering};

use jolt_core::{BuildMessage, MessageHandler, MessageKind};

/// Forwards build messages to the caller's handler, counting errors and
/// warnings and mirroring everything into `tracing`.
pub(crate) struct MessageDispatcher<'a> {
    handler: &'a dyn MessageHandler,
    project: &'a str,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl<'a> MessageDispatcher<'a> {
    pub(crate) fn new(handler: &'a dyn MessageHandler, project: &'a str) -> Self {
        Self {
            handler,
            project,
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    pub(crate) fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub(crate) fn warnings(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }
}

impl MessageHandler for MessageDispatcher<'_> {
    fn process_message(&self, message: &BuildMessage) {
        match message.kind {
            MessageKind::Error => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            MessageKind::Warning => {
                self.warnings.fetch_add(1, Ordering::Relaxed);
            }
            MessageKind::Info | MessageKind::Progress => {}
        }
        tracing::debug!(
            target: "jolt.build.messages",
            project = self.project,
            kind = message.kind.as_str(),
            source = %message.source,
            "{}",
            message.text
        );
        self.handler.process_message(message);
    }
}
