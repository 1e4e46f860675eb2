//! Parallel map over independent jobs
//!
//! # Example: 100 seeded samples
//!
//! ```rust
//! use sampler::{ParallelRunner, logging_progress_reporter};
//!
//! let results = ParallelRunner::new(100, |job_id| {
//!     let seed = 42 + job_id as u64;
//!     Ok::<u64, String>(seed * 2)
//! })
//! .progress(logging_progress_reporter(10))
//! .num_threads(4)
//! .run()
//! .unwrap();
//!
//! assert_eq!(results.len(), 100);
//! assert_eq!(results[3].as_ref().ok(), Some(&90));
//! ```
//!
//! # Error Handling
//!
//! A job either returns `Err(E)` or panics. Both are captured per job as a
//! [`JobFailure`] and the remaining jobs keep running, so one bad seed does
//! not abort a whole batch. Deciding whether a failed job is fatal is up to
//! the caller.

use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors raised by the runner itself (not by individual jobs)
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single job produced no value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobFailure<E: fmt::Display> {
    #[error("job {job_id} failed: {error}")]
    Failed { job_id: usize, error: E },
    #[error("job {job_id} panicked: {message}")]
    Panicked { job_id: usize, message: String },
}

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Executes `num_jobs` independent jobs in parallel
///
/// The job function must be `Fn(usize) -> Result<S, E> + Send + Sync`: it
/// receives the job id and returns a fresh result.
pub struct ParallelRunner<S, E, F>
where
    F: Fn(usize) -> Result<S, E> + Send + Sync,
    S: Send,
    E: Send + fmt::Display,
{
    num_jobs: usize,
    job: F,
    num_threads: Option<usize>,
    batch_size: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl<S, E, F> ParallelRunner<S, E, F>
where
    F: Fn(usize) -> Result<S, E> + Send + Sync,
    S: Send,
    E: Send + fmt::Display,
{
    pub fn new(num_jobs: usize, job: F) -> Self {
        ParallelRunner {
            num_jobs,
            job,
            num_threads: None,
            batch_size: None,
            progress_callback: None,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global pool
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Run jobs in consecutive batches of at most `n`
    ///
    /// Bounds how many jobs are in flight at once for very large runs. Job
    /// ids stay global, so seeds derived from them do not change.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n.max(1));
        self
    }

    /// Set a callback invoked with `(completed, total)` after every job
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Execute all jobs and return their results in `job_id` order
    pub fn run(self) -> Result<Vec<Result<S, JobFailure<E>>>, SamplerError> {
        match self.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
                Ok(pool.install(|| self.execute()))
            }
            None => Ok(self.execute()),
        }
    }

    fn execute(&self) -> Vec<Result<S, JobFailure<E>>> {
        let completed = AtomicUsize::new(0);
        let batch_size = self.batch_size.unwrap_or(self.num_jobs).max(1);

        let mut results = Vec::with_capacity(self.num_jobs);
        for batch_start in (0..self.num_jobs).step_by(batch_size) {
            let batch_end = (batch_start + batch_size).min(self.num_jobs);
            results.par_extend(
                (batch_start..batch_end)
                    .into_par_iter()
                    .map(|job_id| self.run_job(job_id, &completed)),
            );
        }
        results
    }

    fn run_job(&self, job_id: usize, completed: &AtomicUsize) -> Result<S, JobFailure<E>> {
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.job)(job_id)));

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref callback) = self.progress_callback {
            callback(done, self.num_jobs);
        }

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(JobFailure::Failed { job_id, error }),
            Err(panic) => Err(JobFailure::Panicked {
                job_id,
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Progress callback that logs every `interval` completed jobs
pub fn logging_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            tracing::info!(completed, total, "sampling progress");
        }
    }
}
