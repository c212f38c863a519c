//! The coordinator: job state, leases and the RPC service over them.
//!
//! There is exactly one coordinator per job and it keeps no persistent
//! state. If it crashes the job has to be restarted from scratch; workers
//! give up once their RPC retries are exhausted.

pub mod job;
pub mod lease;
pub mod queue;
pub mod service;

pub use job::{JobState, Phase, ReportOutcome, TaskState, TaskStatus};
pub use service::{serve, serve_on, CoordinatorService};
