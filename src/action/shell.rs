//! Shell action runner
//!
//! Runs a step's `command` through the configured shell. Every non-blank
//! stdout line is one observed value.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{ActionFault, ActionRunner};
use crate::common::{Error, Result};
use crate::model::TestStep;

/// Runs step commands with `<shell> -c <command>`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    work_dir: Option<PathBuf>,
}

impl ShellRunner {
    /// Resolve the shell from PATH (or accept an absolute path)
    pub fn new(shell: &str) -> Result<Self> {
        let shell = which::which(shell).map_err(|e| {
            Error::Config(format!("Shell '{}' not found: {}", shell, e))
        })?;
        Ok(Self {
            shell,
            work_dir: None,
        })
    }

    /// Run commands from this directory (usually the checked-out workspace)
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl ActionRunner for ShellRunner {
    async fn run(&self, step: &TestStep) -> std::result::Result<Vec<String>, ActionFault> {
        let Some(command) = step.command.as_deref() else {
            tracing::debug!(step = %step.id, "Step has no command, nothing observed");
            return Ok(Vec::new());
        };

        tracing::debug!(step = %step.id, "$ {}", command);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout or abort must not leak the child.
            .kill_on_drop(true);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| ActionFault::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => ActionFault::Exit {
                    code,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                },
                None => ActionFault::Signal,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepType;

    fn step(command: Option<&str>) -> TestStep {
        TestStep {
            id: "1".to_string(),
            desc: "run".to_string(),
            expect: String::new(),
            kind: StepType::Step,
            parent: None,
            command: command.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_captures_stdout_lines() {
        let runner = ShellRunner::new("sh").unwrap();
        let outputs = runner
            .run(&step(Some("echo first; echo; echo 'second  '")))
            .await
            .unwrap();
        assert_eq!(outputs, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_fault() {
        let runner = ShellRunner::new("sh").unwrap();
        let fault = runner
            .run(&step(Some("echo broken >&2; exit 3")))
            .await
            .unwrap_err();
        assert_eq!(
            fault,
            ActionFault::Exit {
                code: 3,
                stderr: "broken".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_command_observes_nothing() {
        let runner = ShellRunner::new("sh").unwrap();
        assert!(runner.run(&step(None)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here\n").unwrap();
        let runner = ShellRunner::new("sh").unwrap().with_work_dir(dir.path());
        let outputs = runner.run(&step(Some("cat marker.txt"))).await.unwrap();
        assert_eq!(outputs, vec!["here".to_string()]);
    }

    #[test]
    fn test_unknown_shell() {
        assert!(ShellRunner::new("definitely-not-a-shell-xyz").is_err());
    }
}
