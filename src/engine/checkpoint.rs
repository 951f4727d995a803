//! Splitting expected text into checkpoints and pairing observed values

use super::comparator;
use crate::model::CheckPointLog;

/// Split a step's expected text into ordered checkpoint strings
///
/// Without a delimiter every non-blank line is one checkpoint. With a
/// delimiter the text is cut at each occurrence and blank pieces dropped.
pub fn split_expect(expect: &str, delimiter: Option<&str>) -> Vec<String> {
    let pieces: Vec<&str> = match delimiter.filter(|d| !d.is_empty()) {
        Some(delim) => expect.split(delim).collect(),
        None => expect.lines().collect(),
    };

    pieces
        .into_iter()
        .map(|p| p.trim_matches(|c| c == '\r' || c == '\n'))
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Pair expectations with observed values by position
///
/// Expectations without an observed value fail with an empty actual.
/// Observed values beyond the last expectation are not recorded.
pub fn pair(expects: &[String], actuals: &[String]) -> Vec<CheckPointLog> {
    expects
        .iter()
        .enumerate()
        .map(|(i, expect)| match actuals.get(i) {
            Some(actual) => comparator::check(i + 1, expect, actual),
            None => CheckPointLog::new(i + 1, expect.clone(), String::new(), false),
        })
        .collect()
}

/// Expectations recorded against a step whose action never produced output
pub fn unobserved(expects: &[String]) -> Vec<CheckPointLog> {
    pair(expects, &[])
}
