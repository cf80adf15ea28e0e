//! Core shared types for Jolt.
//!
//! This crate is intentionally small: build request parameters and the
//! message types that flow from a running build back to its caller.

mod message;
mod params;

pub use message::{
    BuildMessage, CollectingMessageHandler, MessageHandler, MessageKind, NullMessageHandler,
};
pub use params::{BuildParameters, BuildType};

/// Version of the Jolt build server, embedded into persisted artifacts.
pub const JOLT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Message source used for diagnostics produced by the build server itself
/// (as opposed to a compiler backend).
pub const SERVER_MESSAGE_SOURCE: &str = "jolt";
