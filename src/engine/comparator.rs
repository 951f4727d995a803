//! Expected-vs-actual comparison
//!
//! Equality is exact after normalizing line endings and trailing whitespace.
//! There is no fuzzy or semantic matching.

use crate::model::CheckPointLog;

/// Normalize text for comparison: `\r\n` and `\r` become `\n`, trailing
/// whitespace is removed from every line and from the end
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.lines().map(str::trim_end).collect();
    lines.join("\n").trim_end().to_string()
}

/// Decide whether an observed value satisfies an expectation
pub fn compare(expected: &str, actual: &str) -> bool {
    normalize(expected) == normalize(actual)
}

/// Compare and record; both texts are kept verbatim
pub fn check(numb: usize, expected: &str, actual: &str) -> CheckPointLog {
    let status = compare(expected, actual);
    CheckPointLog::new(numb, expected.to_string(), actual.to_string(), status)
}
