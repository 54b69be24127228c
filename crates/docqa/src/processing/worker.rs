//! Bounded pool for CPU-bound work (PDF parsing, chunking)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Runs blocking closures on tokio's blocking threads, at most `workers` at a time
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BlockingPool {
    /// Create a pool allowing `workers` concurrent jobs (at least one)
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Maximum concurrent jobs
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` on a blocking thread once a worker slot is free.
    ///
    /// The slot is held by the job itself, so it stays taken until the work
    /// finishes even if the caller stops waiting. A panic becomes `Error::Internal`.
    pub async fn run<F, T>(&self, name: &str, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::internal("worker pool is closed"))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                tracing::error!(job = name, "blocking job panicked");
                Err(Error::internal(format!("{} panicked", name)))
            }
            Err(e) => Err(Error::internal(format!("{} was cancelled: {}", name, e))),
        }
    }
}

/// Bound a future by a deadline, reporting `Error::Timeout` when it passes
pub async fn run_with_timeout<F, T>(what: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation = what,
                limit_secs = limit.as_secs(),
                "operation timed out"
            );
            Err(Error::Timeout(format!(
                "{} exceeded {}s",
                what,
                limit.as_secs()
            )))
        }
    }
}
