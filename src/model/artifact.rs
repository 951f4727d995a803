//! Artifact model: what to run
//!
//! Tasks and cases keep their children in an owning, ordered sequence. The
//! lookup indexes (`seq -> run`, `step id -> step`) are derived from that
//! sequence once, when the artifact is constructed or deserialized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::common::{ArtifactKind, Error, Result};

/// A product on the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// A module of a product; groups tasks and cases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: u32,
    pub code: String,
    pub name: String,
}

/// Reference from a task to a case in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseInTask {
    /// Run identifier inside the task
    pub id: String,
    pub title: String,
    /// Stable case identifier
    pub case: String,
}

/// A named run unit: an ordered collection of case references
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct TestTask {
    id: u32,
    code: String,
    name: String,
    product: String,
    project: String,
    runs: Vec<(u32, TestCaseInTask)>,
    by_seq: HashMap<u32, usize>,
}

/// Serialized form of a task: runs keyed by their sequence number
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskRecord {
    id: u32,
    #[serde(default)]
    code: String,
    name: String,
    #[serde(default)]
    product: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    runs: BTreeMap<u32, TestCaseInTask>,
}

impl From<TaskRecord> for TestTask {
    fn from(record: TaskRecord) -> Self {
        TestTask::new(
            record.id,
            record.code,
            record.name,
            record.product,
            record.project,
            record.runs,
        )
    }
}

impl From<TestTask> for TaskRecord {
    fn from(task: TestTask) -> Self {
        TaskRecord {
            id: task.id,
            code: task.code,
            name: task.name,
            product: task.product,
            project: task.project,
            runs: task.runs.into_iter().collect(),
        }
    }
}

impl TestTask {
    /// Build a task; runs are ordered by sequence number, a repeated
    /// sequence number keeps its last reference
    pub fn new(
        id: u32,
        code: impl Into<String>,
        name: impl Into<String>,
        product: impl Into<String>,
        project: impl Into<String>,
        runs: impl IntoIterator<Item = (u32, TestCaseInTask)>,
    ) -> Self {
        let ordered: BTreeMap<u32, TestCaseInTask> = runs.into_iter().collect();
        let runs: Vec<(u32, TestCaseInTask)> = ordered.into_iter().collect();
        let by_seq = runs
            .iter()
            .enumerate()
            .map(|(pos, (seq, _))| (*seq, pos))
            .collect();

        Self {
            id,
            code: code.into(),
            name: name.into(),
            product: product.into(),
            project: project.into(),
            runs,
            by_seq,
        }
    }

    /// A task assembled locally from case ids, without a remote counterpart
    pub fn adhoc(cases: &[String]) -> Self {
        let runs = cases.iter().enumerate().map(|(i, case)| {
            let seq = i as u32 + 1;
            (
                seq,
                TestCaseInTask {
                    id: seq.to_string(),
                    title: case.clone(),
                    case: case.clone(),
                },
            )
        });
        Self::new(0, "adhoc", "Ad-hoc run", "", "", runs)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Case references in sequence order
    pub fn runs(&self) -> impl Iterator<Item = &TestCaseInTask> {
        self.runs.iter().map(|(_, run)| run)
    }

    /// Look up a case reference by its sequence number
    pub fn run(&self, seq: u32) -> Option<&TestCaseInTask> {
        self.by_seq.get(&seq).map(|&pos| &self.runs[pos].1)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// How a step is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// A verifiable step with its own action
    #[default]
    Step,
    /// Narrative heading that owns nested items; executes as a no-op
    Group,
    /// A verifiable step nested under a group
    Item,
}

/// One action within a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    pub id: String,
    #[serde(default)]
    pub desc: String,
    /// Expected output, one checkpoint per line (or per configured delimiter)
    #[serde(default)]
    pub expect: String,
    #[serde(rename = "type", default)]
    pub kind: StepType,
    /// Owning group step, if nested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Shell command that performs the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl TestStep {
    /// Narrative steps are documentation only
    pub fn is_narrative(&self) -> bool {
        self.kind == StepType::Group
    }
}

/// An ordered script of steps with expected outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CaseRecord", into = "CaseRecord")]
pub struct TestCase {
    id: String,
    id_in_task: String,
    task_id: String,
    title: String,
    version: String,
    steps: Vec<TestStep>,
    index: HashMap<String, usize>,
    source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CaseRecord {
    id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id_in_task: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    task_id: String,
    title: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    steps: Vec<TestStep>,
}

fn default_version() -> String {
    "1".to_string()
}

impl TryFrom<CaseRecord> for TestCase {
    type Error = Error;

    fn try_from(record: CaseRecord) -> Result<Self> {
        let mut case = TestCase::new(record.id, record.title, record.steps)?;
        case.id_in_task = record.id_in_task;
        case.task_id = record.task_id;
        case.version = record.version;
        Ok(case)
    }
}

impl From<TestCase> for CaseRecord {
    fn from(case: TestCase) -> Self {
        CaseRecord {
            id: case.id,
            id_in_task: case.id_in_task,
            task_id: case.task_id,
            title: case.title,
            version: case.version,
            steps: case.steps,
        }
    }
}

impl TestCase {
    /// Build a case from its ordered steps
    ///
    /// Fails when step ids repeat or a step names a parent that does not
    /// appear earlier in the sequence.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        steps: Vec<TestStep>,
    ) -> Result<Self> {
        let id = id.into();
        let mut index = HashMap::with_capacity(steps.len());
        let mut seen = HashSet::with_capacity(steps.len());

        for (pos, step) in steps.iter().enumerate() {
            if let Some(parent) = &step.parent {
                if !seen.contains(parent.as_str()) {
                    return Err(Error::invalid_artifact(
                        ArtifactKind::Case,
                        &id,
                        format!("step '{}' references unknown parent '{}'", step.id, parent),
                    ));
                }
            }
            if index.insert(step.id.clone(), pos).is_some() {
                return Err(Error::invalid_artifact(
                    ArtifactKind::Case,
                    &id,
                    format!("duplicate step id '{}'", step.id),
                ));
            }
            seen.insert(step.id.as_str());
        }

        Ok(Self {
            id,
            id_in_task: String::new(),
            task_id: String::new(),
            title: title.into(),
            version: default_version(),
            steps,
            index,
            source: None,
        })
    }

    /// Record the run context the case was checked out for
    pub fn with_task(mut self, task_id: impl Into<String>, id_in_task: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self.id_in_task = id_in_task.into();
        self
    }

    /// Remember where the case was loaded from
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_in_task(&self) -> &str {
        &self.id_in_task
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&TestStep> {
        self.index.get(id).map(|&pos| &self.steps[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, kind: StepType, parent: Option<&str>) -> TestStep {
        TestStep {
            id: id.to_string(),
            desc: format!("step {}", id),
            expect: String::new(),
            kind,
            parent: parent.map(str::to_string),
            command: None,
        }
    }

    fn run(id: &str, case: &str) -> TestCaseInTask {
        TestCaseInTask {
            id: id.to_string(),
            title: format!("case {}", case),
            case: case.to_string(),
        }
    }

    #[test]
    fn test_task_runs_follow_sequence_order() {
        let task = TestTask::new(
            7,
            "T7",
            "Nightly",
            "1",
            "2",
            vec![(30, run("r30", "c3")), (10, run("r10", "c1")), (20, run("r20", "c2"))],
        );
        let cases: Vec<&str> = task.runs().map(|r| r.case.as_str()).collect();
        assert_eq!(cases, vec!["c1", "c2", "c3"]);
        assert_eq!(task.run(20).unwrap().id, "r20");
        assert!(task.run(99).is_none());
        assert_eq!(task.len(), 3);
    }

    #[test]
    fn test_task_yaml_uses_keyed_runs() {
        let yaml = r#"
id: 12
code: T12
name: Smoke
product: "3"
runs:
  2:
    id: "102"
    title: Logout
    case: "502"
  1:
    id: "101"
    title: Login
    case: "501"
"#;
        let task: TestTask = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.id(), 12);
        assert_eq!(task.runs().next().unwrap().case, "501");

        let again: TestTask = serde_yaml::from_str(&serde_yaml::to_string(&task).unwrap()).unwrap();
        assert_eq!(again.run(2).unwrap().title, "Logout");
    }

    #[test]
    fn test_adhoc_task() {
        let task = TestTask::adhoc(&["5".to_string(), "9".to_string()]);
        assert_eq!(task.id(), 0);
        let ids: Vec<&str> = task.runs().map(|r| r.case.as_str()).collect();
        assert_eq!(ids, vec!["5", "9"]);
    }

    #[test]
    fn test_case_index_matches_order() {
        let case = TestCase::new(
            "1",
            "Login",
            vec![
                step("1", StepType::Group, None),
                step("2", StepType::Item, Some("1")),
                step("3", StepType::Item, Some("1")),
                step("4", StepType::Step, None),
            ],
        )
        .unwrap();

        for s in case.steps() {
            assert_eq!(case.step(&s.id).unwrap(), s);
        }
        assert_eq!(case.step("2").unwrap().parent.as_deref(), Some("1"));
        assert!(case.step("1").unwrap().is_narrative());
        assert!(!case.step("4").unwrap().is_narrative());
    }

    #[test]
    fn test_case_rejects_duplicate_step_ids() {
        let err = TestCase::new(
            "1",
            "Dup",
            vec![step("1", StepType::Step, None), step("1", StepType::Step, None)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArtifact { .. }));
    }

    #[test]
    fn test_case_rejects_forward_parent() {
        let err = TestCase::new(
            "1",
            "Forward",
            vec![step("2", StepType::Item, Some("1")), step("1", StepType::Group, None)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown parent"));
    }

    #[test]
    fn test_case_yaml_defaults() {
        let yaml = r#"
id: "501"
title: Login works
steps:
  - id: "1"
    desc: open the login page
    expect: "200"
    command: echo 200
  - id: "2"
    type: group
    desc: credentials
"#;
        let case: TestCase = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(case.version(), "1");
        assert_eq!(case.steps().len(), 2);
        assert_eq!(case.steps()[0].kind, StepType::Step);
        assert_eq!(case.steps()[1].kind, StepType::Group);
        assert_eq!(case.steps()[0].command.as_deref(), Some("echo 200"));
    }
}
