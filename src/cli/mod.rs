//! CLI command handling
//!
//! Dispatches CLI commands and formats their output. Returns the process
//! exit code: 0 on success, 1 when results could not all be submitted, 2 when
//! cases failed, 130 when a run was cancelled.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

use crate::action::ShellRunner;
use crate::commands::Commands;
use crate::common::config::{Config, SettingsUpdate};
use crate::common::{Error, Result};
use crate::engine::{CancelToken, Executor, RunContext};
use crate::loader::{self, ArtifactLoader, CheckoutSummary, FileLoader, HttpLoader, Selection};
use crate::model::TestTask;
use crate::report::sink::{latest_report_in, print_summary, read_report, write_report};
use crate::report::{
    compare_reports, submit_report, BaselineStore, Change, ConsoleSink, JsonFileSink, SinkChain,
};

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_CASES_FAILED: i32 = 2;
pub const EXIT_CANCELLED: i32 = 130;

/// Options of the `run` command after parsing
#[derive(Debug, Default)]
pub struct RunOptions {
    pub dir: Option<PathBuf>,
    pub task: Option<u32>,
    pub cases: Vec<String>,
    pub env: Option<String>,
    pub workers: Option<usize>,
    pub timeout: Option<u64>,
    pub task_timeout: Option<u64>,
    pub no_baseline: bool,
    pub verbose: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<i32> {
    let config = Config::load()?;

    match command {
        Commands::Run {
            dir,
            task,
            cases,
            env,
            workers,
            timeout,
            task_timeout,
            no_baseline,
            verbose,
        } => {
            let options = RunOptions {
                dir,
                task,
                cases,
                env,
                workers,
                timeout,
                task_timeout,
                no_baseline,
                verbose,
            };
            run(&config, options).await
        }

        Commands::Checkout {
            task,
            product,
            module,
            suite,
            dir,
        } => {
            let selection = match (task, product, suite) {
                (Some(task), _, _) => Selection::Task(task),
                (None, Some(product), _) => Selection::Product { product, module },
                (None, None, Some(suite)) => Selection::Suite(suite),
                (None, None, None) => {
                    return Err(Error::Config(
                        "Choose what to check out with -t, -p or -s".to_string(),
                    ))
                }
            };
            let remote = HttpLoader::new(&config.zentao)?;
            let workspace = FileLoader::new(dir.unwrap_or_else(|| config.paths.workspace_dir()));
            let summary = loader::checkout(&remote, &workspace, &selection).await?;
            print_checkout(&format!("Checked out {}", selection), &summary, &workspace);
            Ok(EXIT_OK)
        }

        Commands::Update { task, dir } => {
            let remote = HttpLoader::new(&config.zentao)?;
            let workspace = FileLoader::new(dir.unwrap_or_else(|| config.paths.workspace_dir()));
            let summary = loader::update(&remote, &workspace, task).await?;
            print_checkout("Updated", &summary, &workspace);
            Ok(EXIT_OK)
        }

        Commands::Ci { path } => {
            let path = match path {
                Some(path) => path,
                None => latest_report(&config).await?,
            };
            let remote = HttpLoader::new(&config.zentao)?;
            let report = read_report(&path).await?;
            let (report, summary) = submit_report(&remote, report).await;
            if !summary.submitted.is_empty() {
                write_report(&path, &report).await?;
            }

            for (run, result_id) in &summary.submitted {
                println!("  {} run {} -> result {}", "✓".green(), run, result_id);
            }
            for (run, reason) in &summary.failed {
                println!("  {} run {}: {}", "✗".red(), run, reason);
            }
            println!(
                "Submitted {} case results ({} skipped, {} failed)",
                summary.submitted.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
            Ok(if summary.failed.is_empty() { EXIT_OK } else { EXIT_ERROR })
        }

        Commands::List { product, dir } => {
            if let Some(dir) = dir {
                let cases = FileLoader::new(dir).list_cases().await?;
                if cases.is_empty() {
                    println!("No cases checked out");
                }
                for id in cases {
                    println!("  {}", id);
                }
                return Ok(EXIT_OK);
            }

            let remote = HttpLoader::new(&config.zentao)?;
            match product {
                Some(product) => {
                    let modules = remote.modules(&product).await?;
                    println!("Modules of product {}:", product);
                    for m in &modules {
                        println!("  {:>6}  {:<16} {}", m.id, m.code, m.name);
                    }
                }
                None => {
                    let products = remote.products().await?;
                    println!("Products:");
                    for p in &products {
                        println!("  {:>6}  {:<16} {}", p.id, p.code, p.name);
                    }
                }
            }
            Ok(EXIT_OK)
        }

        Commands::View { path, verbose } => {
            let path = match path {
                Some(path) => path,
                None => latest_report(&config).await?,
            };
            let report = read_report(&path).await?;
            print_summary(&report, &config.language, verbose);
            Ok(EXIT_OK)
        }

        Commands::Diff { base, head, json } => {
            let base = read_report(&base).await?;
            let head = read_report(&head).await?;
            let diff = compare_reports(&base, &head);

            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else if diff.is_empty() {
                println!("No differences");
            } else {
                for case in &diff.cases {
                    println!(
                        "  case {} (run {}): {} -> {}",
                        case.case.white().bold(),
                        case.run,
                        case.before.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                        case.after.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    );
                }
                for cp in &diff.checkpoints {
                    let label = match cp.change {
                        Change::Fixed => "fixed".green(),
                        Change::Regressed => "regressed".red(),
                        Change::ActualChanged => "changed".yellow(),
                        Change::Added => "added".cyan(),
                        Change::Removed => "removed".dimmed(),
                    };
                    println!(
                        "  {}/{} {} [{}] {:?} -> {:?}",
                        cp.case,
                        cp.run,
                        cp.checkpoint,
                        label,
                        cp.before.as_deref().unwrap_or(""),
                        cp.after.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(EXIT_OK)
        }

        Commands::Set {
            language,
            url,
            account,
            password,
            env,
            workers,
            step_timeout,
        } => {
            let mut config = config;
            config.apply(SettingsUpdate {
                language,
                url,
                account,
                password,
                env,
                workers,
                step_timeout_secs: step_timeout,
            })?;
            let path = config.save()?;
            println!("Configuration saved to {}", path.display());
            print_config(&config);
            Ok(EXIT_OK)
        }

        Commands::Config => {
            print_config(&config);
            Ok(EXIT_OK)
        }
    }
}

/// Run a task from the workspace and report it
pub async fn run(config: &Config, options: RunOptions) -> Result<i32> {
    let mut ctx = RunContext::from_config(config);
    if let Some(env) = options.env {
        ctx.env = env;
    }
    if let Some(workers) = options.workers {
        ctx.workers = workers.max(1);
    }
    if let Some(secs) = options.timeout {
        ctx.step_timeout = std::time::Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = options.task_timeout {
        ctx.task_timeout = Some(std::time::Duration::from_secs(secs));
    }

    let dir = options.dir.unwrap_or_else(|| config.paths.workspace_dir());
    let loader = Arc::new(FileLoader::new(&dir));

    let task = match options.task {
        Some(id) => loader.load_task(id).await?,
        None if !options.cases.is_empty() => TestTask::adhoc(&options.cases),
        None => TestTask::adhoc(&loader.list_cases().await?),
    };
    if task.is_empty() {
        return Err(Error::Config(format!(
            "Nothing to run: no cases in {}",
            dir.display()
        )));
    }

    let runner = Arc::new(ShellRunner::new(&config.run.shell)?.with_work_dir(&dir));

    let progress = ProgressBar::new(task.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("  [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Received Ctrl+C, cancelling run");
                cancel.cancel();
            }
        });
    }
    if let Some(limit) = ctx.task_timeout {
        cancel.cancel_after(limit);
    }

    let sink = SinkChain::new(vec![
        Box::new(JsonFileSink),
        Box::new(ConsoleSink::new(ctx.language.clone(), options.verbose)),
    ]);

    let mut executor = Executor::new(loader, runner, ctx).with_progress(progress);
    if !options.no_baseline {
        executor = executor.with_baseline(BaselineStore::new(config.paths.baseline_dir()));
    }

    let report = executor.run_and_report(&task, &cancel, &sink).await?;

    Ok(if report.cancelled() {
        EXIT_CANCELLED
    } else if report.is_success() {
        EXIT_OK
    } else {
        EXIT_CASES_FAILED
    })
}

/// Most recent report under the configured report directory
async fn latest_report(config: &Config) -> Result<PathBuf> {
    let dir = config.paths.report_dir();
    latest_report_in(&dir)
        .await?
        .ok_or_else(|| Error::Config(format!("No reports found in {}", dir.display())))
}

fn print_checkout(action: &str, summary: &CheckoutSummary, workspace: &FileLoader) {
    for (case, reason) in &summary.failed {
        println!("  {} case {}: {}", "!".yellow(), case, reason);
    }
    println!(
        "{} {} ({} cases) into {}",
        "✓".green(),
        action,
        summary.written.len(),
        workspace.root().display()
    );
}

fn print_config(config: &Config) {
    println!("{}", "Current configuration:".cyan());
    for (key, value) in config.describe() {
        println!("  {}: {}", key, value);
    }
}
