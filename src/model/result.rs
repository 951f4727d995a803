//! Case results and baseline drift
//!
//! A `CaseResult` holds two maps keyed by `"<step id>.<checkpoint numb>"`:
//! the expected text, taken from the case definition, and the observed text,
//! taken from the steps that ran to completion. Comparing the expected map
//! against a previously stored result shows which expectations were edited
//! since the last run, however far either run got.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::artifact::{TestCase, TestStep};
use super::log::CaseLog;

/// Expected and observed text of one case at one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case: String,
    pub version: String,
    /// Expected text per checkpoint key
    pub steps: BTreeMap<String, String>,
    /// Last observed text per checkpoint key
    pub reals: BTreeMap<String, String>,
}

/// Checkpoint keys whose expected text differs from the baseline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl Drift {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len() + self.added.len() + self.removed.len()
    }
}

/// Key of one checkpoint inside a case
pub fn checkpoint_key(step_id: &str, numb: usize) -> String {
    format!("{}.{}", step_id, numb)
}

impl CaseResult {
    /// Build the result of one run of `case`
    ///
    /// `expects` splits a step's expected text into checkpoint strings.
    /// Narrative steps have no checkpoints. Faulted steps and steps that never
    /// ran contribute no observed values.
    pub fn collect<F>(case: &TestCase, log: &CaseLog, expects: F) -> Self
    where
        F: Fn(&TestStep) -> Vec<String>,
    {
        let mut steps = BTreeMap::new();
        for step in case.steps().iter().filter(|s| !s.is_narrative()) {
            for (i, expect) in expects(step).into_iter().enumerate() {
                steps.insert(checkpoint_key(&step.id, i + 1), expect);
            }
        }

        let mut reals = BTreeMap::new();
        for step in log.steps().iter().filter(|s| s.fault().is_none()) {
            for cp in step.check_points() {
                reals.insert(checkpoint_key(step.id(), cp.numb()), cp.actual().to_string());
            }
        }

        Self {
            case: case.id().to_string(),
            version: case.version().to_string(),
            steps,
            reals,
        }
    }

    /// Fill observed values this run did not produce from an earlier result
    pub fn carry_reals(&mut self, previous: &CaseResult) {
        for key in self.steps.keys() {
            if self.reals.contains_key(key) {
                continue;
            }
            if let Some(real) = previous.reals.get(key) {
                self.reals.insert(key.clone(), real.clone());
            }
        }
    }

    /// Expected-text changes relative to an earlier result of the same case
    pub fn drift_from(&self, previous: &CaseResult) -> Drift {
        let mut drift = Drift::default();

        for (key, expect) in &self.steps {
            match previous.steps.get(key) {
                Some(old) if old != expect => drift.changed.push(key.clone()),
                Some(_) => {}
                None => drift.added.push(key.clone()),
            }
        }
        for key in previous.steps.keys() {
            if !self.steps.contains_key(key) {
                drift.removed.push(key.clone());
            }
        }

        drift
    }
}
