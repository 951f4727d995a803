//! Outcome tree: what happened when a task ran
//!
//! Mirrors the artifact tree (task -> case -> step -> checkpoint). Statuses
//! are computed by the constructors from the children and cannot be set
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::result::Drift;

/// Outcome of a whole case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Pass => write!(f, "pass"),
            CaseStatus::Fail => write!(f, "fail"),
            CaseStatus::Skip => write!(f, "skip"),
        }
    }
}

/// Why a case was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The case id does not exist in the catalog
    NotFound,
    /// The case exists but could not be fetched or parsed
    LoadFailed,
}

/// The atomic expected-vs-actual comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPointLog {
    numb: usize,
    expect: String,
    actual: String,
    status: bool,
}

impl CheckPointLog {
    pub(crate) fn new(numb: usize, expect: String, actual: String, status: bool) -> Self {
        Self {
            numb,
            expect,
            actual,
            status,
        }
    }

    /// 1-based position within the step's expected text
    pub fn numb(&self) -> usize {
        self.numb
    }

    pub fn expect(&self) -> &str {
        &self.expect
    }

    pub fn actual(&self) -> &str {
        &self.actual
    }

    pub fn status(&self) -> bool {
        self.status
    }
}

/// Recorded outcome of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    id: String,
    name: String,
    status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fault: Option<String>,
    #[serde(rename = "checkpoints")]
    check_points: Vec<CheckPointLog>,
}

impl StepLog {
    /// A step that ran; passes iff every checkpoint passed
    pub fn new(id: impl Into<String>, name: impl Into<String>, check_points: Vec<CheckPointLog>) -> Self {
        let status = check_points.iter().all(CheckPointLog::status);
        Self {
            id: id.into(),
            name: name.into(),
            status,
            fault: None,
            check_points,
        }
    }

    /// A step whose action could not complete; always failing
    pub fn faulted(
        id: impl Into<String>,
        name: impl Into<String>,
        check_points: Vec<CheckPointLog>,
        fault: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: false,
            fault: Some(fault.into()),
            check_points,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn check_points(&self) -> &[CheckPointLog] {
        &self.check_points
    }
}

/// Identity of a case within a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseIdentity {
    pub id: String,
    pub id_in_task: String,
    pub task_id: u32,
    pub path: String,
    pub version: String,
}

/// Recorded outcome of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseLog {
    id: String,
    id_in_task: String,
    task_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zentao_result_id: Option<u32>,
    path: String,
    version: String,
    status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    steps: Vec<StepLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drift: Option<Drift>,
}

impl CaseLog {
    /// A case that resolved and ran: fails if any step failed
    pub fn executed(identity: CaseIdentity, steps: Vec<StepLog>) -> Self {
        let status = if steps.iter().all(StepLog::status) {
            CaseStatus::Pass
        } else {
            CaseStatus::Fail
        };
        Self::build(identity, status, None, None, steps)
    }

    /// A case that could not be resolved or loaded
    pub fn skipped(identity: CaseIdentity, reason: SkipReason, message: impl Into<String>) -> Self {
        Self::build(
            identity,
            CaseStatus::Skip,
            Some(reason),
            Some(message.into()),
            Vec::new(),
        )
    }

    fn build(
        identity: CaseIdentity,
        status: CaseStatus,
        skip_reason: Option<SkipReason>,
        message: Option<String>,
        steps: Vec<StepLog>,
    ) -> Self {
        Self {
            id: identity.id,
            id_in_task: identity.id_in_task,
            task_id: identity.task_id,
            zentao_result_id: None,
            path: identity.path,
            version: identity.version,
            status,
            skip_reason,
            message,
            steps,
            drift: None,
        }
    }

    /// Attach baseline drift; diagnostic only, the status is unaffected
    pub fn with_drift(mut self, drift: Drift) -> Self {
        self.drift = Some(drift);
        self
    }

    /// Link the log to a result record on the remote service
    pub fn with_result_id(mut self, result_id: u32) -> Self {
        self.zentao_result_id = Some(result_id);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_in_task(&self) -> &str {
        &self.id_in_task
    }

    pub fn task_id(&self) -> u32 {
        self.task_id
    }

    pub fn zentao_result_id(&self) -> Option<u32> {
        self.zentao_result_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn steps(&self) -> &[StepLog] {
        &self.steps
    }

    pub fn drift(&self) -> Option<&Drift> {
        self.drift.as_ref()
    }
}

/// Finalized report of one run
///
/// Only the report aggregator builds these; once built they are read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    path: String,
    env: String,
    pass: usize,
    fail: usize,
    skip: usize,
    total: usize,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// Milliseconds between start and end
    duration: i64,
    #[serde(default)]
    cancelled: bool,
    cases: Vec<CaseLog>,
}

/// Counters handed over by the aggregator when it finalizes
pub(crate) struct ReportParts {
    pub path: String,
    pub env: String,
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cancelled: bool,
    pub cases: Vec<CaseLog>,
}

impl TestReport {
    pub(crate) fn from_parts(parts: ReportParts) -> Self {
        Self {
            total: parts.pass + parts.fail + parts.skip,
            duration: (parts.end_time - parts.start_time).num_milliseconds(),
            path: parts.path,
            env: parts.env,
            pass: parts.pass,
            fail: parts.fail,
            skip: parts.skip,
            start_time: parts.start_time,
            end_time: parts.end_time,
            cancelled: parts.cancelled,
            cases: parts.cases,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn pass(&self) -> usize {
        self.pass
    }

    pub fn fail(&self) -> usize {
        self.fail
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Run duration in milliseconds
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Whether the run was cut short by cancellation
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn cases(&self) -> &[CaseLog] {
        &self.cases
    }

    /// First log of a case id; a task may reference the same case more
    /// than once, see `run` and `runs_of`
    pub fn case(&self, id: &str) -> Option<&CaseLog> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Log of the run with the given id within the task
    pub fn run(&self, id_in_task: &str) -> Option<&CaseLog> {
        self.cases.iter().find(|c| c.id_in_task == id_in_task)
    }

    /// Every log of a case id, in completion order
    pub fn runs_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a CaseLog> + 'a {
        self.cases.iter().filter(move |c| c.id == id)
    }

    /// Link case runs to remote result records, keyed by run id in the task
    pub fn with_result_ids(mut self, ids: &BTreeMap<String, u32>) -> Self {
        self.cases = self
            .cases
            .into_iter()
            .map(|log| match ids.get(&log.id_in_task) {
                Some(&result_id) => log.with_result_id(result_id),
                None => log,
            })
            .collect();
        self
    }

    /// Whether every executed case passed
    pub fn is_success(&self) -> bool {
        self.fail == 0
    }
}
