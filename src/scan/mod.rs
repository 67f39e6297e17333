//! Scan orchestration
//!
//! [`scheduler::Scheduler`] drives cycles and [`executor::ScanExecutor`] does
//! the per-organization work. [`failures::FailureRegistry`] tracks
//! consecutive failures between cycles.

pub mod executor;
pub mod failures;
pub mod scheduler;

pub use scheduler::{build_executor, connect_queue, run_module};
