//! ATF - test automation client
//!
//! Checks out test tasks from a remote project-management service, runs
//! their cases as ordered step scripts and produces hierarchical
//! pass/fail reports (task -> case -> step -> checkpoint).

pub mod action;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod loader;
pub mod model;
pub mod report;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{CancelToken, Executor, RunContext};
