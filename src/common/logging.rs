//! Logging and tracing configuration
//!
//! Interactive commands log compactly to stderr. Test runs additionally append
//! a detailed log to a file so a finished run can be inspected afterwards.

use std::path::PathBuf;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::paths;

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("atf=debug,warn")
        } else {
            EnvFilter::new("atf=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for a test run (file + stderr logging)
///
/// Logs go to both `<data dir>/logs/atf.log` and stderr. Falls back to stderr
/// only when the log file cannot be opened.
pub fn init_run(verbose: bool) -> Option<PathBuf> {
    if let Some(log_file) = run_log_path() {
        let opened = paths::ensure_parent(&log_file).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
        });

        match opened {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE);

                let stderr_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .compact();

                tracing_subscriber::registry()
                    .with(default_filter(verbose))
                    .with(file_layer)
                    .with(stderr_layer)
                    .init();

                return Some(log_file);
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file: {}", e);
            }
        }
    }

    init_cli(verbose);
    None
}

/// Get the path to the run log file
pub fn run_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("atf.log"))
}
