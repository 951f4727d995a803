//! Report sinks: where a finalized report goes
//!
//! A sink receives the complete, immutable report exactly once per run.

use async_trait::async_trait;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::common::{format_duration_ms, Error, Result};
use crate::model::{CaseStatus, TestReport};

/// Consumer of a finalized report
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &TestReport) -> Result<()>;
}

/// Writes the report as pretty-printed JSON to `report.path()`
#[derive(Debug, Default, Clone)]
pub struct JsonFileSink;

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn write(&self, report: &TestReport) -> Result<()> {
        write_report(Path::new(report.path()), report).await?;
        tracing::info!("Report written to {}", report.path());
        Ok(())
    }
}

/// Write a report as pretty JSON to an explicit path
pub async fn write_report(path: &Path, report: &TestReport) -> Result<()> {
    let write_err = |e: &dyn std::fmt::Display| Error::ReportWrite {
        path: path.display().to_string(),
        error: e.to_string(),
    };

    let json = serde_json::to_string_pretty(report).map_err(|e| write_err(&e))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_err(&e))?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|e| write_err(&e))
}

/// Read a report written by `JsonFileSink`
pub async fn read_report(path: &Path) -> Result<TestReport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
    Ok(serde_json::from_str(&content)?)
}

/// Prints a colored summary to stdout
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    language: String,
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(language: impl Into<String>, verbose: bool) -> Self {
        Self {
            language: language.into(),
            verbose,
        }
    }
}

#[async_trait]
impl ReportSink for ConsoleSink {
    async fn write(&self, report: &TestReport) -> Result<()> {
        print_summary(report, &self.language, self.verbose);
        Ok(())
    }
}

/// Fan a report out to several sinks
///
/// Every sink is attempted; the first failure is returned.
pub struct SinkChain {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl SinkChain {
    pub fn new(sinks: Vec<Box<dyn ReportSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ReportSink for SinkChain {
    async fn write(&self, report: &TestReport) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write(report).await {
                tracing::error!("Report sink failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct Labels {
    report: &'static str,
    pass: &'static str,
    fail: &'static str,
    skip: &'static str,
    total: &'static str,
    duration: &'static str,
    cancelled: &'static str,
    drift: &'static str,
}

fn labels(language: &str) -> Labels {
    match language {
        "zh" => Labels {
            report: "测试报告",
            pass: "通过",
            fail: "失败",
            skip: "跳过",
            total: "总计",
            duration: "耗时",
            cancelled: "运行已取消，仅统计已完成的用例",
            drift: "期望结果已变更",
        },
        _ => Labels {
            report: "Test Report",
            pass: "Pass",
            fail: "Fail",
            skip: "Skip",
            total: "Total",
            duration: "Duration",
            cancelled: "Run cancelled; counts cover completed cases only",
            drift: "expectations changed",
        },
    }
}

/// Print a report summary: one line per case, failing checkpoints indented
pub fn print_summary(report: &TestReport, language: &str, verbose: bool) {
    let l = labels(language);

    println!(
        "\n{} {} ({})",
        l.report.blue().bold(),
        report.path().dimmed(),
        report.env()
    );

    for case in report.cases() {
        let mark = match case.status() {
            CaseStatus::Pass => "✓".green(),
            CaseStatus::Fail => "✗".red(),
            CaseStatus::Skip => "-".yellow(),
        };
        println!("  {} {} {}", mark, case.id().white().bold(), case.path().dimmed());

        if let Some(message) = case.message() {
            println!("      {}", message.yellow());
        }

        for step in case.steps() {
            if step.status() && !verbose {
                continue;
            }
            let step_mark = if step.status() { "✓".green() } else { "✗".red() };
            println!("    {} {} {}", step_mark, step.id(), step.name().dimmed());
            if let Some(fault) = step.fault() {
                println!("        {}", fault.red());
            }
            for cp in step.check_points() {
                if cp.status() && !verbose {
                    continue;
                }
                println!(
                    "        [{}] expect {:?}, actual {:?}",
                    cp.numb(),
                    cp.expect(),
                    cp.actual()
                );
            }
        }

        if let Some(drift) = case.drift().filter(|d| !d.is_empty()) {
            println!("      {} {}: {}", "!".yellow(), l.drift, drift.len());
        }
    }

    if report.cancelled() {
        println!("\n{}", l.cancelled.yellow());
    }

    println!(
        "\n{}: {}  {}: {}  {}: {}  {}: {}  {}: {}\n",
        l.total,
        report.total(),
        l.pass,
        report.pass().to_string().green(),
        l.fail,
        report.fail().to_string().red(),
        l.skip,
        report.skip().to_string().yellow(),
        l.duration,
        format_duration_ms(report.duration())
    );
}

/// Most recently written report under a directory, searched recursively
pub async fn latest_report_in(dir: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let modified = metadata.modified()?;
                if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                    newest = Some((modified, path));
                }
            }
        }
    }

    Ok(newest.map(|(_, p)| p))
}
