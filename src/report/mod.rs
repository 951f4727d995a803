//! Report aggregation, persistence and comparison

mod aggregator;
pub mod baseline;
pub mod compare;
pub mod sink;
pub mod submit;

pub use aggregator::ReportAggregator;
pub use baseline::BaselineStore;
pub use compare::{compare_reports, Change, ReportDiff};
pub use sink::{ConsoleSink, JsonFileSink, ReportSink, SinkChain};
pub use submit::{submit_report, SubmitSummary};
