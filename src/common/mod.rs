//! Common utilities shared by every command

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{ArtifactKind, Error, Result};

/// Milliseconds as a human readable duration ("850ms", "3.2s", "2m05s")
pub fn format_duration_ms(ms: i64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
