//! Checked-out workspace on disk
//!
//! Layout:
//! ```text
//! <root>/tasks/<task id>.yaml
//! <root>/cases/<case id>.yaml
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::ArtifactLoader;
use crate::common::paths::sanitize_file_component;
use crate::common::{Error, Result};
use crate::model::{TestCase, TestTask};

/// Loads tasks and cases from YAML files in a workspace directory
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn task_path(&self, task_id: u32) -> PathBuf {
        self.root.join("tasks").join(format!("{}.yaml", task_id))
    }

    pub fn case_path(&self, case_id: &str) -> PathBuf {
        self.root
            .join("cases")
            .join(format!("{}.yaml", sanitize_file_component(case_id)))
    }

    /// Write a task definition into the workspace
    pub async fn save_task(&self, task: &TestTask) -> Result<PathBuf> {
        let path = self.task_path(task.id());
        write_yaml(&path, task).await?;
        Ok(path)
    }

    /// Write a case definition into the workspace
    pub async fn save_case(&self, case: &TestCase) -> Result<PathBuf> {
        let path = self.case_path(case.id());
        write_yaml(&path, case).await?;
        Ok(path)
    }

    /// Case ids present in the workspace, sorted
    pub async fn list_cases(&self) -> Result<Vec<String>> {
        let mut ids = yaml_stems(&self.root.join("cases")).await?;
        ids.sort();
        Ok(ids)
    }

    /// Task ids present in the workspace, ascending
    pub async fn list_tasks(&self) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = yaml_stems(&self.root.join("tasks"))
            .await?
            .iter()
            .filter_map(|stem| stem.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// File stems of the `.yaml` files in a directory; a missing directory is empty
async fn yaml_stems(dir: &Path) -> Result<Vec<String>> {
    let mut stems = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stems),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
    }
    Ok(stems)
}

async fn read_file(path: &Path, not_found: Error) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found),
        Err(e) => Err(Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        }),
    }
}

async fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[async_trait]
impl ArtifactLoader for FileLoader {
    async fn load_task(&self, task_id: u32) -> Result<TestTask> {
        let path = self.task_path(task_id);
        let content = read_file(&path, Error::task_not_found(task_id)).await?;
        let task: TestTask = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded task {} from {}", task_id, path.display());
        Ok(task)
    }

    async fn load_case(&self, case_id: &str) -> Result<TestCase> {
        let path = self.case_path(case_id);
        let content = read_file(&path, Error::case_not_found(case_id)).await?;
        let case: TestCase = serde_yaml::from_str(&content)?;
        Ok(case.with_source(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StepType, TestCaseInTask, TestStep};

    fn sample_case(id: &str) -> TestCase {
        TestCase::new(
            id,
            "Echo works",
            vec![TestStep {
                id: "1".to_string(),
                desc: "echo".to_string(),
                expect: "hello".to_string(),
                kind: StepType::Step,
                parent: None,
                command: Some("echo hello".to_string()),
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new(dir.path());

        let task = TestTask::new(
            3,
            "T3",
            "Smoke",
            "1",
            "1",
            vec![(
                1,
                TestCaseInTask {
                    id: "11".to_string(),
                    title: "Echo works".to_string(),
                    case: "501".to_string(),
                },
            )],
        );
        loader.save_task(&task).await.unwrap();
        loader.save_case(&sample_case("501")).await.unwrap();

        let loaded = loader.load_task(3).await.unwrap();
        assert_eq!(loaded.name(), "Smoke");
        assert_eq!(loaded.runs().next().unwrap().case, "501");

        let case = loader.load_case("501").await.unwrap();
        assert_eq!(case.steps()[0].command.as_deref(), Some("echo hello"));
        assert_eq!(case.source(), Some(loader.case_path("501").as_path()));

        assert_eq!(loader.list_cases().await.unwrap(), vec!["501".to_string()]);
        assert_eq!(loader.list_tasks().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new(dir.path());
        assert!(loader.load_task(1).await.unwrap_err().is_not_found());
        assert!(loader.load_case("404").await.unwrap_err().is_not_found());
        assert!(loader.list_cases().await.unwrap().is_empty());
        assert!(loader.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_case_is_not_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new(dir.path());
        std::fs::create_dir_all(dir.path().join("cases")).unwrap();
        std::fs::write(loader.case_path("7"), "id: [not, a, string").unwrap();

        let err = loader.load_case("7").await.unwrap_err();
        assert!(!err.is_not_found());
    }
}
