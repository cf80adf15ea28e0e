//! Utilities shared by Jolt tests.
//!
//! Contains on-disk project fixtures (directory-based and `.ipr` projects
//! with `.iml` modules) and helpers for tests that mutate process
//! environment variables.

mod env;
mod fixtures;

pub use env::{env_lock, EnvVarGuard};
pub use fixtures::{module_file, ProjectFixture};
