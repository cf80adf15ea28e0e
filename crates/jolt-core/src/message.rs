use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
    Info,
    Progress,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
            MessageKind::Info => "info",
            MessageKind::Progress => "progress",
        }
    }
}

/// A structured message emitted while a build runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMessage {
    /// Producer of the message, e.g. a compiler name or [`crate::SERVER_MESSAGE_SOURCE`].
    pub source: String,
    pub kind: MessageKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// 1-based line in `source_path`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based column in `source_path`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl BuildMessage {
    pub fn new(source: impl Into<String>, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            text: text.into(),
            source_path: None,
            line: None,
            column: None,
        }
    }

    pub fn error(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source, MessageKind::Error, text)
    }

    pub fn warning(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source, MessageKind::Warning, text)
    }

    pub fn info(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source, MessageKind::Info, text)
    }

    pub fn progress(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source, MessageKind::Progress, text)
    }

    pub fn at(mut self, path: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        self.source_path = Some(path.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for BuildMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: ", self.source, self.kind.as_str())?;
        if let Some(path) = &self.source_path {
            write!(f, "{}", path.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
                if let Some(column) = self.column {
                    write!(f, ":{column}")?;
                }
            }
            f.write_str(": ")?;
        }
        f.write_str(&self.text)
    }
}

/// Receives messages produced during a build.
///
/// Delivery is fire-and-forget: handlers cannot reject or acknowledge a
/// message. Handlers may be invoked from the build worker thread.
pub trait MessageHandler: Send + Sync {
    fn process_message(&self, message: &BuildMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(&BuildMessage) + Send + Sync,
{
    fn process_message(&self, message: &BuildMessage) {
        self(message)
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageHandler;

impl MessageHandler for NullMessageHandler {
    fn process_message(&self, _message: &BuildMessage) {}
}

/// Stores every received message in arrival order.
#[derive(Debug, Default)]
pub struct CollectingMessageHandler {
    messages: Mutex<Vec<BuildMessage>>,
}

impl CollectingMessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<BuildMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages_of_kind(&self, kind: MessageKind) -> Vec<BuildMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.kind == kind)
            .collect()
    }
}

impl MessageHandler for CollectingMessageHandler {
    fn process_message(&self, message: &BuildMessage) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());
    }
}
