//! Explicit run context handed to the executor and the report sink

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::config::Config;
use crate::common::paths::sanitize_file_component;

/// Settings for one run, resolved from config and command-line overrides
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Execution environment tag recorded in the report
    pub env: String,
    /// Directory that holds finalized reports
    pub report_dir: PathBuf,
    /// Maximum number of cases executing at once
    pub workers: usize,
    /// Bound on a single step's action
    pub step_timeout: Duration,
    /// Cancel the whole run after this long
    pub task_timeout: Option<Duration>,
    /// Checkpoint separator inside expected text
    pub checkpoint_delimiter: Option<String>,
    /// Interface language, carried into reports for the sink
    pub language: String,
}

impl RunContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            env: config.run.env.clone(),
            report_dir: config.paths.report_dir(),
            workers: config.run.workers.max(1),
            step_timeout: Duration::from_secs(config.run.step_timeout_secs.max(1)),
            task_timeout: config.run.task_timeout_secs.map(Duration::from_secs),
            checkpoint_delimiter: config.run.checkpoint_delimiter.clone(),
            language: config.language.clone(),
        }
    }

    /// Where the report of a run of `task_id` started at `started` is written
    ///
    /// Reports are grouped by environment: `<report dir>/<env>/task-<id>-<timestamp>.json`
    pub fn report_path(&self, task_id: u32, started: DateTime<Utc>) -> PathBuf {
        self.env_dir().join(format!(
            "task-{}-{}.json",
            task_id,
            started.format("%Y%m%d-%H%M%S%3f")
        ))
    }

    fn env_dir(&self) -> PathBuf {
        self.report_dir.join(sanitize_file_component(&self.env))
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_path_layout() {
        let ctx = RunContext {
            env: "ci linux".to_string(),
            report_dir: PathBuf::from("/tmp/reports"),
            ..RunContext::default()
        };
        let started = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        assert_eq!(
            ctx.report_path(42, started),
            PathBuf::from("/tmp/reports/ci_linux/task-42-20240517-083000000.json")
        );
    }

    #[test]
    fn test_from_config_clamps_workers() {
        let mut config = Config::default();
        config.run.workers = 0;
        config.run.task_timeout_secs = Some(90);
        let ctx = RunContext::from_config(&config);
        assert_eq!(ctx.workers, 1);
        assert_eq!(ctx.task_timeout, Some(Duration::from_secs(90)));
    }
}
