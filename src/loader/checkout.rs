//! Copying definitions from the remote service into a workspace
//!
//! A checkout writes the selected cases (and, for a task, the task file) as
//! YAML. An update repeats the checkout for what the workspace already holds.

use std::collections::BTreeSet;

use super::{ArtifactLoader, FileLoader, RemoteService, Selection};
use crate::common::Result;

/// What a checkout or update wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    /// Tasks written to the workspace
    pub tasks: Vec<u32>,
    /// Case ids written to the workspace
    pub written: Vec<String>,
    /// Case ids that could not be fetched, with the reason
    pub failed: Vec<(String, String)>,
}

impl CheckoutSummary {
    fn merge(&mut self, other: CheckoutSummary) {
        self.tasks.extend(other.tasks);
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }
}

/// Check out the selected cases into a workspace
///
/// Cases that cannot be fetched are reported and left out. A task file is
/// written regardless, so a run of the task records them as skipped.
pub async fn checkout(
    remote: &dyn RemoteService,
    workspace: &FileLoader,
    selection: &Selection,
) -> Result<CheckoutSummary> {
    tracing::info!("Checking out {} into {}", selection, workspace.root().display());

    match selection {
        Selection::Task(task_id) => checkout_task(remote, workspace, *task_id).await,
        Selection::Product { product, module } => {
            let ids = remote.product_cases(product, module.as_deref()).await?;
            fetch_cases(remote, workspace, ids.into_iter().map(|id| (id, None))).await
        }
        Selection::Suite(suite) => {
            let ids = remote.suite_cases(suite).await?;
            fetch_cases(remote, workspace, ids.into_iter().map(|id| (id, None))).await
        }
    }
}

/// Refresh a workspace from the remote service
///
/// With a task id only that task is checked out again. Otherwise every task
/// in the workspace is, followed by the cases that belong to none of them;
/// those keep the task they were checked out for.
pub async fn update(
    remote: &dyn RemoteService,
    workspace: &FileLoader,
    task: Option<u32>,
) -> Result<CheckoutSummary> {
    if let Some(task_id) = task {
        return checkout_task(remote, workspace, task_id).await;
    }

    let mut summary = CheckoutSummary::default();
    let mut covered = BTreeSet::new();

    for task_id in workspace.list_tasks().await? {
        let refreshed = checkout_task(remote, workspace, task_id).await?;
        covered.extend(refreshed.written.iter().cloned());
        covered.extend(refreshed.failed.iter().map(|(id, _)| id.clone()));
        summary.merge(refreshed);
    }

    let mut loose = Vec::new();
    for id in workspace.list_cases().await? {
        if covered.contains(&id) {
            continue;
        }
        let run = match workspace.load_case(&id).await {
            Ok(local) if !local.task_id().is_empty() => {
                Some((local.task_id().to_string(), local.id_in_task().to_string()))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(case = %id, "Replacing unreadable local case: {}", e);
                None
            }
        };
        loose.push((id, run));
    }
    summary.merge(fetch_cases(remote, workspace, loose).await?);

    Ok(summary)
}

async fn checkout_task(
    remote: &dyn RemoteService,
    workspace: &FileLoader,
    task_id: u32,
) -> Result<CheckoutSummary> {
    let task = remote.load_task(task_id).await?;
    workspace.save_task(&task).await?;

    let runs = task
        .runs()
        .map(|run| (run.case.clone(), Some((task.id().to_string(), run.id.clone()))))
        .collect::<Vec<_>>();
    let mut summary = fetch_cases(remote, workspace, runs).await?;
    summary.tasks.push(task_id);
    Ok(summary)
}

/// Fetch cases and write them, tagged with their task run when known
async fn fetch_cases(
    remote: &dyn RemoteService,
    workspace: &FileLoader,
    cases: impl IntoIterator<Item = (String, Option<(String, String)>)>,
) -> Result<CheckoutSummary> {
    let mut summary = CheckoutSummary::default();

    for (id, run) in cases {
        match remote.load_case(&id).await {
            Ok(case) => {
                let case = match run {
                    Some((task_id, id_in_task)) => case.with_task(task_id, id_in_task),
                    None => case,
                };
                let path = workspace.save_case(&case).await?;
                tracing::debug!("Wrote case {} to {}", id, path.display());
                summary.written.push(id);
            }
            Err(e) => {
                tracing::warn!(case = %id, "Cannot check out case: {}", e);
                summary.failed.push((id, e.to_string()));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::model::{CaseLog, StepType, TestCase, TestCaseInTask, TestStep, TestTask};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRemote {
        tasks: HashMap<u32, TestTask>,
        cases: Mutex<HashMap<String, TestCase>>,
        products: HashMap<(String, Option<String>), Vec<String>>,
        suites: HashMap<String, Vec<String>>,
    }

    impl FakeRemote {
        fn with_case(self, id: &str, expect: &str) -> Self {
            self.cases.lock().unwrap().insert(id.to_string(), case(id, expect));
            self
        }
    }

    #[async_trait]
    impl ArtifactLoader for FakeRemote {
        async fn load_task(&self, task_id: u32) -> Result<TestTask> {
            self.tasks
                .get(&task_id)
                .cloned()
                .ok_or_else(|| Error::task_not_found(task_id))
        }

        async fn load_case(&self, case_id: &str) -> Result<TestCase> {
            self.cases
                .lock()
                .unwrap()
                .get(case_id)
                .cloned()
                .ok_or_else(|| Error::case_not_found(case_id))
        }
    }

    #[async_trait]
    impl RemoteService for FakeRemote {
        async fn product_cases(&self, product: &str, module: Option<&str>) -> Result<Vec<String>> {
            Ok(self
                .products
                .get(&(product.to_string(), module.map(str::to_string)))
                .cloned()
                .unwrap_or_default())
        }

        async fn suite_cases(&self, suite: &str) -> Result<Vec<String>> {
            Ok(self.suites.get(suite).cloned().unwrap_or_default())
        }

        async fn submit_result(&self, _log: &CaseLog) -> Result<u32> {
            Err(Error::Internal("not used".to_string()))
        }
    }

    fn case(id: &str, expect: &str) -> TestCase {
        TestCase::new(
            id,
            format!("case {}", id),
            vec![TestStep {
                id: "1".to_string(),
                desc: "echo".to_string(),
                expect: expect.to_string(),
                kind: StepType::Step,
                parent: None,
                command: Some(format!("echo {}", expect)),
            }],
        )
        .unwrap()
    }

    fn task(id: u32, cases: &[&str]) -> TestTask {
        let runs = cases.iter().enumerate().map(|(i, case)| {
            let seq = i as u32 + 1;
            (
                seq,
                TestCaseInTask {
                    id: format!("{}{}", id, seq),
                    title: case.to_string(),
                    case: case.to_string(),
                },
            )
        });
        TestTask::new(id, "T", "task", "1", "1", runs)
    }

    #[tokio::test]
    async fn test_task_checkout_tags_cases_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FileLoader::new(dir.path());
        let mut remote = FakeRemote::default().with_case("501", "a");
        remote.tasks.insert(3, task(3, &["501", "502"]));

        let summary = checkout(&remote, &workspace, &Selection::Task(3)).await.unwrap();

        assert_eq!(summary.tasks, vec![3]);
        assert_eq!(summary.written, vec!["501".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "502");

        let local = workspace.load_case("501").await.unwrap();
        assert_eq!(local.task_id(), "3");
        assert_eq!(local.id_in_task(), "31");
        assert_eq!(workspace.load_task(3).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_product_module_and_suite_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FileLoader::new(dir.path());
        let mut remote = FakeRemote::default()
            .with_case("1", "a")
            .with_case("2", "b")
            .with_case("3", "c");
        remote
            .products
            .insert(("9".to_string(), Some("4".to_string())), vec!["1".to_string(), "2".to_string()]);
        remote.suites.insert("s1".to_string(), vec!["3".to_string()]);

        let by_module = Selection::Product {
            product: "9".to_string(),
            module: Some("4".to_string()),
        };
        let summary = checkout(&remote, &workspace, &by_module).await.unwrap();
        assert_eq!(summary.written, vec!["1".to_string(), "2".to_string()]);
        assert!(summary.tasks.is_empty());

        checkout(&remote, &workspace, &Selection::Suite("s1".to_string()))
            .await
            .unwrap();
        assert_eq!(workspace.list_cases().await.unwrap(), vec!["1", "2", "3"]);
        assert!(workspace.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_refreshes_tasks_and_loose_cases() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FileLoader::new(dir.path());
        let mut remote = FakeRemote::default().with_case("501", "a").with_case("600", "x");
        remote.tasks.insert(3, task(3, &["501"]));

        checkout(&remote, &workspace, &Selection::Task(3)).await.unwrap();
        workspace
            .save_case(&case("600", "x").with_task("8", "81"))
            .await
            .unwrap();

        remote.cases.lock().unwrap().insert("501".to_string(), case("501", "edited"));
        remote.cases.lock().unwrap().insert("600".to_string(), case("600", "y"));

        let summary = update(&remote, &workspace, None).await.unwrap();
        assert_eq!(summary.tasks, vec![3]);
        assert_eq!(summary.written, vec!["501".to_string(), "600".to_string()]);

        let refreshed = workspace.load_case("501").await.unwrap();
        assert_eq!(refreshed.steps()[0].expect, "edited");
        assert_eq!(refreshed.id_in_task(), "31");

        let loose = workspace.load_case("600").await.unwrap();
        assert_eq!(loose.steps()[0].expect, "y");
        assert_eq!((loose.task_id(), loose.id_in_task()), ("8", "81"));
    }

    #[tokio::test]
    async fn test_update_of_unknown_task_fails() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FileLoader::new(dir.path());
        let err = update(&FakeRemote::default(), &workspace, Some(5))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
