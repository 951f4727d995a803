//! Artifact loaders: resolve task and case ids into definitions
//!
//! Loaders fail with `Error::NotFound` when the artifact does not exist and
//! with `Error::Transport` (or a parse error) when it exists but cannot be
//! fetched.

pub mod checkout;
mod file;
mod http;

pub use checkout::{checkout, update, CheckoutSummary};
pub use file::FileLoader;
pub use http::HttpLoader;

use async_trait::async_trait;

use crate::common::Result;
use crate::model::{CaseLog, TestCase, TestTask};

/// Source of task and case definitions
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    async fn load_task(&self, task_id: u32) -> Result<TestTask>;

    async fn load_case(&self, case_id: &str) -> Result<TestCase>;
}

/// The remote project-management service
///
/// Besides serving definitions it can enumerate cases by product, module or
/// suite and accepts the results of task runs.
#[async_trait]
pub trait RemoteService: ArtifactLoader {
    /// Case ids of a product, optionally narrowed to one module
    async fn product_cases(&self, product: &str, module: Option<&str>) -> Result<Vec<String>>;

    /// Case ids of a test suite
    async fn suite_cases(&self, suite: &str) -> Result<Vec<String>>;

    /// Record one case run against its task; returns the remote result id
    async fn submit_result(&self, log: &CaseLog) -> Result<u32>;
}

/// Which cases a checkout brings into the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Task(u32),
    Product {
        product: String,
        module: Option<String>,
    },
    Suite(String),
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Task(id) => write!(f, "task {}", id),
            Selection::Product {
                product,
                module: Some(module),
            } => write!(f, "product {} module {}", product, module),
            Selection::Product { product, .. } => write!(f, "product {}", product),
            Selection::Suite(suite) => write!(f, "suite {}", suite),
        }
    }
}
