//! Bounded-concurrency job pool

use dropsy_types::{ChangeKind, Error, ExitStatus, FileRecord, Parallelism, Result};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Status recorded for a job whose task panicked
const PANICKED_STATUS: ExitStatus = -1;

/// One job that finished with a non-zero status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// File the job was working on
    pub path: PathBuf,
    /// Exit status reported by the job
    pub status: ExitStatus,
}

/// Result of one dispatch phase, available once every job finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Phase this outcome belongs to
    pub kind: ChangeKind,
    /// Number of jobs that ran
    pub completed: usize,
    /// Jobs that failed, in completion order
    pub failures: Vec<JobFailure>,
}

impl PhaseOutcome {
    /// Whether every job succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into the number of completed jobs, or a transfer error
    pub fn into_result(self) -> Result<usize> {
        match self.failures.first() {
            None => Ok(self.completed),
            Some(first) => Err(Error::Transfer {
                path: first.path.clone(),
                status: first.status,
                failed: self.failures.len(),
                total: self.completed,
            }),
        }
    }
}

/// Job pool running at most `limit` jobs at once
///
/// Submission waits for a free slot, and a slot frees up as soon as any running
/// job completes. [`JobPool::run_category`] returns only after the whole phase
/// has drained; failures never cancel the jobs still running.
#[derive(Debug, Clone)]
pub struct JobPool {
    semaphore: Arc<Semaphore>,
    limit: Parallelism,
}

impl JobPool {
    /// Create a new pool
    pub fn new(limit: Parallelism) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.get())),
            limit,
        }
    }

    /// Maximum number of concurrent jobs
    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Run one job per item and wait for all of them
    ///
    /// `submit` is called once per item, in order, right before its job is
    /// spawned; the future it returns is the job.
    pub async fn run_category<F, Fut>(
        &self,
        kind: ChangeKind,
        items: &[FileRecord],
        mut submit: F,
    ) -> Result<PhaseOutcome>
    where
        F: FnMut(FileRecord) -> Fut,
        Fut: Future<Output = ExitStatus> + Send + 'static,
    {
        let mut jobs = JoinSet::new();
        let mut paths = HashMap::with_capacity(items.len());
        let mut failures = Vec::new();

        for record in items {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::other(format!("Failed to acquire job slot: {}", e)))?;

            let path = record.path.clone();
            let job = submit(record.clone());
            let handle = jobs.spawn(async move {
                let status = job.await;
                drop(permit);
                status
            });
            paths.insert(handle.id(), path);
        }

        debug!("Submitted {} {} jobs, waiting for the barrier", items.len(), kind);

        while let Some(joined) = jobs.join_next_with_id().await {
            let (id, status) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("A {} job did not complete: {}", kind, e);
                    (e.id(), PANICKED_STATUS)
                }
            };
            let path = paths.remove(&id).unwrap_or_default();

            if status != 0 {
                warn!("{} job for '{}' exited with status {}", kind, path.display(), status);
                failures.push(JobFailure { path, status });
            }
        }

        Ok(PhaseOutcome {
            kind,
            completed: items.len(),
            failures,
        })
    }
}
