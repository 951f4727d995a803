//! Action runners: perform a step and capture what it printed
//!
//! A runner either returns the observed outputs in order or a fault when the
//! action could not run to completion. Value mismatches are never faults.

mod shell;

pub use shell::ShellRunner;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::common::format_duration_ms;
use crate::model::TestStep;

/// Why a step's action could not complete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionFault {
    #[error("failed to start action: {0}")]
    Spawn(String),

    #[error("action exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("action terminated by signal")]
    Signal,

    #[error("action timed out after {}", format_duration_ms(.0.as_millis() as i64))]
    Timeout(Duration),
}

/// Executes the action behind a checkpoint-bearing step
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Run the step and return its observed outputs in order
    async fn run(&self, step: &TestStep) -> std::result::Result<Vec<String>, ActionFault>;
}
