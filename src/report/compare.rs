//! Checkpoint-by-checkpoint comparison of two reports

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{checkpoint_key, CaseStatus, TestReport};

/// What happened to one checkpoint between two runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// Failing before, passing now
    Fixed,
    /// Passing before, failing now
    Regressed,
    /// Same status, different observed text
    ActualChanged,
    /// Only in the newer report
    Added,
    /// Only in the older report
    Removed,
}

/// One checkpoint difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointDelta {
    /// Run id of the case within its task
    pub run: String,
    pub case: String,
    pub checkpoint: String,
    pub change: Change,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// One case whose overall status changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseDelta {
    pub run: String,
    pub case: String,
    pub before: Option<CaseStatus>,
    pub after: Option<CaseStatus>,
}

/// Differences between two runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportDiff {
    pub cases: Vec<CaseDelta>,
    pub checkpoints: Vec<CheckpointDelta>,
}

impl ReportDiff {
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.checkpoints.is_empty()
    }
}

struct Observed<'a> {
    status: bool,
    actual: &'a str,
}

/// A case run is identified by its id within the task and the case id
type RunKey<'a> = (&'a str, &'a str);

fn index(report: &TestReport) -> BTreeMap<(RunKey<'_>, String), Observed<'_>> {
    let mut map = BTreeMap::new();
    for case in report.cases() {
        for step in case.steps() {
            for cp in step.check_points() {
                map.insert(
                    (
                        (case.id_in_task(), case.id()),
                        checkpoint_key(step.id(), cp.numb()),
                    ),
                    Observed {
                        status: cp.status(),
                        actual: cp.actual(),
                    },
                );
            }
        }
    }
    map
}

fn statuses(report: &TestReport) -> BTreeMap<RunKey<'_>, CaseStatus> {
    report
        .cases()
        .iter()
        .map(|c| ((c.id_in_task(), c.id()), c.status()))
        .collect()
}

/// Compare an older report against a newer one
///
/// Runs are matched by their id within the task and their case id, so a
/// case referenced twice by one task is compared run by run.
pub fn compare_reports(base: &TestReport, head: &TestReport) -> ReportDiff {
    let mut diff = ReportDiff::default();

    let base_status = statuses(base);
    let head_status = statuses(head);

    let mut runs: Vec<RunKey<'_>> = base_status.keys().chain(head_status.keys()).copied().collect();
    runs.sort_unstable();
    runs.dedup();
    for key in runs {
        let before = base_status.get(&key).copied();
        let after = head_status.get(&key).copied();
        if before != after {
            diff.cases.push(CaseDelta {
                run: key.0.to_string(),
                case: key.1.to_string(),
                before,
                after,
            });
        }
    }

    let before = index(base);
    let after = index(head);

    for (key, old) in &before {
        let new = after.get(key);
        let change = match new {
            None => Change::Removed,
            Some(new) if !old.status && new.status => Change::Fixed,
            Some(new) if old.status && !new.status => Change::Regressed,
            Some(new) if old.actual != new.actual => Change::ActualChanged,
            Some(_) => continue,
        };
        let ((run, case), checkpoint) = key;
        diff.checkpoints.push(CheckpointDelta {
            run: run.to_string(),
            case: case.to_string(),
            checkpoint: checkpoint.clone(),
            change,
            before: Some(old.actual.to_string()),
            after: new.map(|n| n.actual.to_string()),
        });
    }

    for (key, new) in &after {
        if !before.contains_key(key) {
            let ((run, case), checkpoint) = key;
            diff.checkpoints.push(CheckpointDelta {
                run: run.to_string(),
                case: case.to_string(),
                checkpoint: checkpoint.clone(),
                change: Change::Added,
                before: None,
                after: Some(new.actual.to_string()),
            });
        }
    }

    diff
}
