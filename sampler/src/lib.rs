//! Parallel execution of independent Monte-Carlo jobs.
//!
//! Every job is a pure function of its `job_id`: it derives its own seed,
//! builds its own state and returns a value or an error. Jobs never share
//! mutable state, so results are identical regardless of thread count or
//! completion order. Results are always returned in `job_id` order.

pub mod parallel;

pub use parallel::{JobFailure, ParallelRunner, SamplerError, logging_progress_reporter};
