//! Streaming report aggregation
//!
//! Case logs arrive from concurrent workers in any order. Each `record` is
//! one increment-and-append under the lock; `finalize` freezes the counts
//! exactly once.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::common::{Error, Result};
use crate::model::{CaseLog, CaseStatus, ReportParts, TestReport};

#[derive(Debug, Default)]
struct Tally {
    pass: usize,
    fail: usize,
    skip: usize,
    start_time: Option<DateTime<Utc>>,
    cases: Vec<CaseLog>,
    finalized: bool,
}

/// Folds case logs into a `TestReport`
#[derive(Debug)]
pub struct ReportAggregator {
    path: String,
    env: String,
    tally: Mutex<Tally>,
}

impl ReportAggregator {
    pub fn new(path: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            env: env.into(),
            tally: Mutex::new(Tally::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tally>> {
        self.tally
            .lock()
            .map_err(|_| Error::Internal("report aggregator lock poisoned".to_string()))
    }

    /// Mark the start of the run; the first call wins
    pub fn start(&self) -> Result<DateTime<Utc>> {
        let mut tally = self.lock()?;
        if tally.finalized {
            return Err(Error::AlreadyFinalized);
        }
        Ok(*tally.start_time.get_or_insert_with(Utc::now))
    }

    /// Count and keep one case log
    pub fn record(&self, log: CaseLog) -> Result<()> {
        let mut tally = self.lock()?;
        if tally.finalized {
            return Err(Error::AlreadyFinalized);
        }

        tally.start_time.get_or_insert_with(Utc::now);
        match log.status() {
            CaseStatus::Pass => tally.pass += 1,
            CaseStatus::Fail => tally.fail += 1,
            CaseStatus::Skip => tally.skip += 1,
        }
        tracing::debug!(case = %log.id(), status = %log.status(), "Case recorded");
        tally.cases.push(log);
        Ok(())
    }

    /// Number of case logs recorded so far
    pub fn recorded(&self) -> Result<usize> {
        Ok(self.lock()?.cases.len())
    }

    /// Freeze the counts and produce the report
    ///
    /// A second call fails with `AlreadyFinalized` and leaves the first
    /// report untouched.
    pub fn finalize(&self, cancelled: bool) -> Result<TestReport> {
        let mut tally = self.lock()?;
        if tally.finalized {
            return Err(Error::AlreadyFinalized);
        }
        tally.finalized = true;

        let end_time = Utc::now();
        let start_time = tally.start_time.unwrap_or(end_time);

        Ok(TestReport::from_parts(ReportParts {
            path: self.path.clone(),
            env: self.env.clone(),
            pass: tally.pass,
            fail: tally.fail,
            skip: tally.skip,
            start_time,
            end_time,
            cancelled,
            cases: std::mem::take(&mut tally.cases),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::comparator::check;
    use crate::model::{CaseIdentity, SkipReason, StepLog};
    use std::sync::Arc;

    fn identity(id: &str) -> CaseIdentity {
        CaseIdentity {
            id: id.to_string(),
            version: "1".to_string(),
            ..Default::default()
        }
    }

    fn case(id: &str, status: CaseStatus) -> CaseLog {
        match status {
            CaseStatus::Pass => CaseLog::executed(
                identity(id),
                vec![StepLog::new("1", "s", vec![check(1, "a", "a")])],
            ),
            CaseStatus::Fail => CaseLog::executed(
                identity(id),
                vec![StepLog::new("1", "s", vec![check(1, "a", "b")])],
            ),
            CaseStatus::Skip => CaseLog::skipped(identity(id), SkipReason::NotFound, "missing"),
        }
    }

    #[test]
    fn test_counts_match_cases() {
        let agg = ReportAggregator::new("report.json", "local");
        agg.start().unwrap();
        agg.record(case("1", CaseStatus::Pass)).unwrap();
        agg.record(case("2", CaseStatus::Fail)).unwrap();
        agg.record(case("3", CaseStatus::Skip)).unwrap();
        agg.record(case("4", CaseStatus::Pass)).unwrap();

        let report = agg.finalize(false).unwrap();
        assert_eq!(report.pass(), 2);
        assert_eq!(report.fail(), 1);
        assert_eq!(report.skip(), 1);
        assert_eq!(report.total(), 4);
        assert_eq!(report.total(), report.cases().len());
        assert_eq!(
            report.duration(),
            (report.end_time() - report.start_time()).num_milliseconds()
        );
        assert!(!report.cancelled());
        assert_eq!(report.env(), "local");
    }

    #[test]
    fn test_first_record_sets_start_time() {
        let agg = ReportAggregator::new("r", "e");
        agg.record(case("1", CaseStatus::Pass)).unwrap();
        let report = agg.finalize(false).unwrap();
        assert!(report.start_time() <= report.end_time());
    }

    #[test]
    fn test_empty_run_has_zero_duration() {
        let agg = ReportAggregator::new("r", "e");
        let report = agg.finalize(true).unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.duration(), 0);
        assert!(report.cancelled());
    }

    #[test]
    fn test_finalize_twice_is_rejected() {
        let agg = ReportAggregator::new("r", "e");
        agg.record(case("1", CaseStatus::Fail)).unwrap();
        let first = agg.finalize(false).unwrap();

        assert!(matches!(agg.finalize(false), Err(Error::AlreadyFinalized)));
        assert!(matches!(
            agg.record(case("2", CaseStatus::Pass)),
            Err(Error::AlreadyFinalized)
        ));
        assert!(matches!(agg.start(), Err(Error::AlreadyFinalized)));

        assert_eq!(first.fail(), 1);
        assert_eq!(first.total(), 1);
    }

    #[test]
    fn test_concurrent_producers() {
        let agg = Arc::new(ReportAggregator::new("r", "e"));
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let agg = Arc::clone(&agg);
                scope.spawn(move || {
                    for i in 0..50 {
                        let status = match i % 3 {
                            0 => CaseStatus::Pass,
                            1 => CaseStatus::Fail,
                            _ => CaseStatus::Skip,
                        };
                        agg.record(case(&format!("{}-{}", worker, i), status)).unwrap();
                    }
                });
            }
        });

        let report = agg.finalize(false).unwrap();
        assert_eq!(report.total(), 400);
        assert_eq!(report.cases().len(), 400);
        assert_eq!(report.pass() + report.fail() + report.skip(), 400);
        assert_eq!(report.pass(), 8 * 17);
        assert_eq!(report.fail(), 8 * 17);
        assert_eq!(report.skip(), 8 * 16);
    }
}
