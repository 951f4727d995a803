//! Task executor
//!
//! Cases of a task run concurrently, bounded by the configured number of
//! workers. Steps inside a case run strictly in order; the first faulting
//! step ends the case. Every finished case is recorded with the aggregator
//! as soon as it completes.

use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::cancel::CancelToken;
use super::checkpoint;
use super::context::RunContext;
use crate::action::{ActionFault, ActionRunner};
use crate::common::{Error, Result};
use crate::loader::ArtifactLoader;
use crate::model::{
    CaseIdentity, CaseLog, CaseResult, SkipReason, StepLog, TestCase, TestCaseInTask, TestReport,
    TestStep, TestTask,
};
use crate::report::{BaselineStore, ReportAggregator, ReportSink};

/// Runs tasks and produces reports
pub struct Executor {
    worker: CaseWorker,
    progress: Option<ProgressBar>,
}

/// Everything a spawned case needs; cheap to clone
#[derive(Clone)]
struct CaseWorker {
    loader: Arc<dyn ArtifactLoader>,
    runner: Arc<dyn ActionRunner>,
    ctx: Arc<RunContext>,
    baseline: Option<Arc<BaselineStore>>,
}

impl Executor {
    pub fn new(
        loader: Arc<dyn ArtifactLoader>,
        runner: Arc<dyn ActionRunner>,
        ctx: RunContext,
    ) -> Self {
        Self {
            worker: CaseWorker {
                loader,
                runner,
                ctx: Arc::new(ctx),
                baseline: None,
            },
            progress: None,
        }
    }

    /// Compare each case against its stored baseline and update it
    pub fn with_baseline(mut self, store: BaselineStore) -> Self {
        self.worker.baseline = Some(Arc::new(store));
        self
    }

    /// Advance a progress bar as cases finish
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.worker.ctx
    }

    /// Run a task, finalize its report and hand it to the sink once
    ///
    /// Sink failures are returned; the report is still complete in memory
    /// and logged.
    pub async fn run_and_report(
        &self,
        task: &TestTask,
        cancel: &CancelToken,
        sink: &dyn ReportSink,
    ) -> Result<TestReport> {
        let report = self.run_task(task, cancel).await?;
        sink.write(&report).await?;
        Ok(report)
    }

    /// Run every case of a task and return the finalized report
    ///
    /// On cancellation no further cases are dispatched, in-flight cases are
    /// aborted (and not counted), and the report is finalized with the cases
    /// that completed.
    pub async fn run_task(&self, task: &TestTask, cancel: &CancelToken) -> Result<TestReport> {
        let ctx = &self.worker.ctx;
        let started = chrono::Utc::now();
        let report_path = ctx.report_path(task.id(), started);
        let aggregator = Arc::new(ReportAggregator::new(
            report_path.display().to_string(),
            ctx.env.clone(),
        ));
        aggregator.start()?;

        tracing::info!(
            task = task.id(),
            cases = task.len(),
            workers = ctx.workers,
            "Running task '{}'",
            task.name()
        );
        if let Some(pb) = &self.progress {
            pb.set_length(task.len() as u64);
        }

        let permits = Arc::new(Semaphore::new(ctx.workers.max(1)));
        let mut in_flight = JoinSet::new();
        let mut cancelled = false;

        for run in task.runs() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => permit
                    .map_err(|e| Error::Internal(format!("worker pool closed: {}", e)))?,
            };

            let worker = self.worker.clone();
            let aggregator = Arc::clone(&aggregator);
            let progress = self.progress.clone();
            let run = run.clone();
            let task_id = task.id();

            in_flight.spawn(async move {
                let log = worker.run_case(task_id, &run).await;
                if let Some(pb) = &progress {
                    pb.set_message(format!("{} {}", log.id(), log.status()));
                    pb.inc(1);
                }
                if let Err(e) = aggregator.record(log) {
                    tracing::error!(case = %run.case, "Failed to record case: {}", e);
                }
                drop(permit);
            });
        }

        if !cancelled {
            cancelled = drain(&mut in_flight, cancel).await;
        } else {
            abort_all(&mut in_flight).await;
        }

        if cancelled {
            tracing::warn!(
                completed = aggregator.recorded()?,
                "Run cancelled, finalizing with completed cases"
            );
        }
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let report = aggregator.finalize(cancelled)?;
        tracing::info!(
            pass = report.pass(),
            fail = report.fail(),
            skip = report.skip(),
            "Task {} finished in {}ms",
            task.id(),
            report.duration()
        );
        Ok(report)
    }
}

/// Wait for in-flight cases; returns true if cancellation cut the wait short
async fn drain(in_flight: &mut JoinSet<()>, cancel: &CancelToken) -> bool {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort_all(in_flight).await;
                return true;
            }
            next = in_flight.join_next() => match next {
                None => return false,
                Some(Err(e)) if e.is_panic() => {
                    tracing::error!("Case worker panicked: {}", e);
                }
                Some(_) => {}
            },
        }
    }
}

async fn abort_all(in_flight: &mut JoinSet<()>) {
    in_flight.abort_all();
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("Case worker panicked: {}", e);
            }
        }
    }
}

impl CaseWorker {
    /// Resolve and execute one case; never fails, problems are recorded
    async fn run_case(&self, task_id: u32, run: &TestCaseInTask) -> CaseLog {
        let case = match self.loader.load_case(&run.case).await {
            Ok(case) => case,
            Err(e) => {
                let reason = if e.is_not_found() {
                    SkipReason::NotFound
                } else {
                    SkipReason::LoadFailed
                };
                tracing::warn!(case = %run.case, "Skipping case: {}", e);
                let identity = CaseIdentity {
                    id: run.case.clone(),
                    id_in_task: run.id.clone(),
                    task_id,
                    ..Default::default()
                };
                return CaseLog::skipped(identity, reason, e.to_string());
            }
        };

        let steps = self.run_steps(&case).await;
        let identity = CaseIdentity {
            id: case.id().to_string(),
            id_in_task: run.id.clone(),
            task_id,
            path: case
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            version: case.version().to_string(),
        };
        let log = CaseLog::executed(identity, steps);
        tracing::info!(case = %log.id(), status = %log.status(), "{}", case.title());

        match &self.baseline {
            Some(store) => self.apply_baseline(store, &case, log).await,
            None => log,
        }
    }

    /// Execute steps in order, stopping after the first fault
    async fn run_steps(&self, case: &TestCase) -> Vec<StepLog> {
        let mut logs = Vec::with_capacity(case.steps().len());

        for step in case.steps() {
            if step.is_narrative() {
                logs.push(StepLog::new(&step.id, &step.desc, Vec::new()));
                continue;
            }

            let expects = checkpoint::split_expect(
                &step.expect,
                self.ctx.checkpoint_delimiter.as_deref(),
            );

            match self.run_action(step).await {
                Ok(actuals) => {
                    if actuals.len() > expects.len() {
                        tracing::debug!(
                            case = %case.id(),
                            step = %step.id,
                            "Ignoring {} surplus outputs",
                            actuals.len() - expects.len()
                        );
                    }
                    logs.push(StepLog::new(
                        &step.id,
                        &step.desc,
                        checkpoint::pair(&expects, &actuals),
                    ));
                }
                Err(fault) => {
                    tracing::warn!(case = %case.id(), step = %step.id, "Step fault: {}", fault);
                    logs.push(StepLog::faulted(
                        &step.id,
                        &step.desc,
                        checkpoint::unobserved(&expects),
                        fault.to_string(),
                    ));
                    let skipped = case.steps().len() - logs.len();
                    if skipped > 0 {
                        tracing::debug!(case = %case.id(), "Skipping {} remaining steps", skipped);
                    }
                    break;
                }
            }
        }

        logs
    }

    async fn run_action(&self, step: &TestStep) -> std::result::Result<Vec<String>, ActionFault> {
        let limit = self.ctx.step_timeout;
        match tokio::time::timeout(limit, self.runner.run(step)).await {
            Ok(result) => result,
            Err(_) => Err(ActionFault::Timeout(limit)),
        }
    }

    /// Attach drift against the stored baseline, then store this run
    async fn apply_baseline(&self, store: &BaselineStore, case: &TestCase, log: CaseLog) -> CaseLog {
        let delimiter = self.ctx.checkpoint_delimiter.as_deref();
        let current = CaseResult::collect(case, &log, |step| {
            checkpoint::split_expect(&step.expect, delimiter)
        });

        match store.exchange(current.clone()).await {
            Ok(Some(previous)) => {
                let drift = current.drift_from(&previous);
                if !drift.is_empty() {
                    tracing::info!(case = %case.id(), keys = drift.len(), "Expectations drifted");
                }
                log.with_drift(drift)
            }
            Ok(None) => log,
            Err(e) => {
                tracing::warn!(case = %case.id(), "Cannot update baseline: {}", e);
                log
            }
        }
    }
}
