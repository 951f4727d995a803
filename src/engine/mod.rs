//! Execution engine: runs tasks and compares outcomes
//!
//! The executor walks a task's case references, runs each case's steps in
//! order through an action runner, compares observed values against the
//! expected checkpoints and streams case logs into the report aggregator.

mod cancel;
pub mod checkpoint;
pub mod comparator;
mod context;
mod executor;

pub use cancel::CancelToken;
pub use comparator::compare;
pub use context::RunContext;
pub use executor::Executor;
