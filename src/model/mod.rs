//! Data model: artifacts to run and the outcome tree they produce

mod artifact;
mod log;
mod result;

pub use artifact::{Module, Product, StepType, TestCase, TestCaseInTask, TestStep, TestTask};
pub use log::{CaseIdentity, CaseLog, CaseStatus, CheckPointLog, SkipReason, StepLog, TestReport};
pub(crate) use log::ReportParts;
pub use result::{checkpoint_key, CaseResult, Drift};
