//! Submitting a finished report to the remote service

use std::collections::BTreeMap;

use crate::loader::RemoteService;
use crate::model::{CaseStatus, TestReport};

/// Outcome of submitting a report
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubmitSummary {
    /// Run id in task and the result id the service assigned
    pub submitted: Vec<(String, u32)>,
    /// Runs not sent: skipped cases, runs outside a task, runs already linked
    pub skipped: Vec<String>,
    /// Runs the service rejected, with the reason
    pub failed: Vec<(String, String)>,
}

/// Send every submittable case run of a report and link the result ids
///
/// A failed submission leaves that run unlinked so a later attempt can
/// retry it; the other runs are still sent.
pub async fn submit_report(
    remote: &dyn RemoteService,
    report: TestReport,
) -> (TestReport, SubmitSummary) {
    let mut summary = SubmitSummary::default();
    let mut ids = BTreeMap::new();

    for log in report.cases() {
        let run = log.id_in_task().to_string();
        if log.status() == CaseStatus::Skip
            || log.task_id() == 0
            || log.zentao_result_id().is_some()
        {
            summary.skipped.push(run);
            continue;
        }

        match remote.submit_result(log).await {
            Ok(result_id) => {
                tracing::debug!(case = %log.id(), run = %run, result_id, "Submitted case result");
                ids.insert(run.clone(), result_id);
                summary.submitted.push((run, result_id));
            }
            Err(e) => {
                tracing::warn!(case = %log.id(), run = %run, "Cannot submit case result: {}", e);
                summary.failed.push((run, e.to_string()));
            }
        }
    }

    (report.with_result_ids(&ids), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, Result};
    use crate::loader::ArtifactLoader;
    use crate::model::{CaseIdentity, CaseLog, SkipReason, StepLog, TestCase, TestTask};
    use crate::report::ReportAggregator;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hands out ascending result ids; rejects case "bad"
    #[derive(Default)]
    struct RecordingRemote {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArtifactLoader for RecordingRemote {
        async fn load_task(&self, task_id: u32) -> Result<TestTask> {
            Err(Error::task_not_found(task_id))
        }

        async fn load_case(&self, case_id: &str) -> Result<TestCase> {
            Err(Error::case_not_found(case_id))
        }
    }

    #[async_trait]
    impl RemoteService for RecordingRemote {
        async fn product_cases(&self, _product: &str, _module: Option<&str>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn suite_cases(&self, _suite: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn submit_result(&self, log: &CaseLog) -> Result<u32> {
            if log.id() == "bad" {
                return Err(Error::Transport("rejected".to_string()));
            }
            let mut seen = self.seen.lock().unwrap();
            seen.push(log.id_in_task().to_string());
            Ok(1000 + seen.len() as u32)
        }
    }

    fn identity(id: &str, run: &str, task_id: u32) -> CaseIdentity {
        CaseIdentity {
            id: id.to_string(),
            id_in_task: run.to_string(),
            task_id,
            version: "1".to_string(),
            ..Default::default()
        }
    }

    fn report() -> TestReport {
        let agg = ReportAggregator::new("r", "e");
        agg.record(CaseLog::executed(identity("501", "11", 3), vec![StepLog::new("1", "a", vec![])]))
            .unwrap();
        agg.record(CaseLog::executed(identity("bad", "12", 3), vec![]))
            .unwrap();
        agg.record(CaseLog::skipped(identity("404", "13", 3), SkipReason::NotFound, "gone"))
            .unwrap();
        agg.record(CaseLog::executed(identity("77", "1", 0), vec![]))
            .unwrap();
        agg.finalize(false).unwrap()
    }

    #[tokio::test]
    async fn test_submission_links_result_ids() {
        let remote = RecordingRemote::default();
        let (report, summary) = submit_report(&remote, report()).await;

        assert_eq!(summary.submitted, vec![("11".to_string(), 1001)]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "12");
        assert_eq!(summary.skipped, vec!["13".to_string(), "1".to_string()]);

        assert_eq!(report.run("11").unwrap().zentao_result_id(), Some(1001));
        assert_eq!(report.run("12").unwrap().zentao_result_id(), None);
        assert_eq!(report.total(), 4);
    }

    #[tokio::test]
    async fn test_linked_runs_are_not_sent_twice() {
        let remote = RecordingRemote::default();
        let (report, _) = submit_report(&remote, report()).await;
        let (report, summary) = submit_report(&remote, report).await;

        assert!(summary.submitted.is_empty());
        assert!(summary.skipped.contains(&"11".to_string()));
        assert_eq!(remote.seen.lock().unwrap().len(), 1);
        assert_eq!(report.run("11").unwrap().zentao_result_id(), Some(1001));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cases"][0]["zentao_result_id"], 1001);
    }
}
