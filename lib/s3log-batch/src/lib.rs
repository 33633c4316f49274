//! Parallel batch scheduling and diagnostic collection across a tree of raw
//! S3 log files.

pub mod error_collector;
pub mod scheduler;

pub use error_collector::ErrorCollector;
pub use scheduler::{discover_raw_log_files, run, ScheduleConfig, TaskOutcome};
