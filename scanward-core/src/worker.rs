//! Background execution of queued scans.

use std::{fmt, sync::Arc};

use chrono::Utc;
use scanward_model::{JobId, JobStatus, ScanOutcome};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::SubmitError,
    executor::{ScanExecutor, ScanInvocation},
    registry::{JobRegistry, JobTransition},
};

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of scans allowed to run at once.
    pub worker_count: usize,
    /// Accepted jobs that may wait for a free worker.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            queue_capacity: 1024,
        }
    }
}

/// One scan, from `running` to its terminal state. Consumed on execution,
/// so a job can only ever be run once.
pub struct JobRun {
    job_id: JobId,
    invocation: ScanInvocation,
    registry: Arc<dyn JobRegistry>,
    executor: Arc<dyn ScanExecutor>,
}

impl fmt::Debug for JobRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRun")
            .field("job_id", &self.job_id)
            .field("target", &self.invocation.target)
            .field("timeout", &self.invocation.timeout)
            .finish()
    }
}

impl JobRun {
    pub fn new(
        job_id: JobId,
        invocation: ScanInvocation,
        registry: Arc<dyn JobRegistry>,
        executor: Arc<dyn ScanExecutor>,
    ) -> Self {
        Self {
            job_id,
            invocation,
            registry,
            executor,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Runs the scan and records the outcome. Returns the terminal status
    /// written, or `None` if the job could not be moved to `running`.
    pub async fn execute(self) -> Option<JobStatus> {
        let job_id = self.job_id;

        match self
            .registry
            .update(&job_id, JobTransition::Running { at: Utc::now() })
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(%job_id, "job disappeared before it started");
            }
            Err(err) => {
                error!(%job_id, error = %err, "job could not be started");
                return None;
            }
        }

        let outcome = self.executor.run(&self.invocation).await;
        let status = if outcome.is_success() {
            JobStatus::Done
        } else {
            JobStatus::Error
        };

        match self.registry.complete(&job_id, Utc::now(), &outcome) {
            Ok(true) => {
                info!(
                    %job_id,
                    target = %self.invocation.target,
                    %status,
                    exit_code = outcome.exit_code,
                    "scan finished"
                );
            }
            Ok(false) => {
                warn!(%job_id, "job removed before its result was recorded");
            }
            Err(err) => {
                error!(%job_id, error = %err, "could not record scan result");
            }
        }

        Some(status)
    }

    /// Runs [`JobRun::execute`] in its own task. If the scan panics the job
    /// is still finished, as an `error` with [`PANICKED_MESSAGE`].
    pub async fn execute_isolated(self) -> Option<JobStatus> {
        let job_id = self.job_id;
        let registry = Arc::clone(&self.registry);

        let err = match tokio::spawn(self.execute()).await {
            Ok(status) => return status,
            Err(err) => err,
        };
        error!(%job_id, error = %err, "scan task failed");
        match registry.complete(&job_id, Utc::now(), &ScanOutcome::failed(PANICKED_MESSAGE)) {
            Ok(true) => Some(JobStatus::Error),
            Ok(false) => None,
            Err(err) => {
                warn!(%job_id, error = %err, "could not record failed scan task");
                None
            }
        }
    }
}

/// Error recorded for a job whose scan task panicked.
pub const PANICKED_MESSAGE: &str = "scan task panicked";

/// Fixed set of tasks draining a bounded FIFO of [`JobRun`]s.
///
/// Workers exit once every sender is dropped and the queue is empty.
#[derive(Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<JobRun>,
    config: WorkerConfig,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the workers. Must be called within a Tokio runtime.
    pub fn start(config: WorkerConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(worker_loop(worker_id, receiver))
            })
            .collect();

        info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            "scan worker pool started"
        );

        Self {
            sender,
            config,
            workers,
        }
    }

    pub fn config(&self) -> WorkerConfig {
        self.config
    }

    /// Claims a queue slot without waiting. The slot is released if the
    /// permit is dropped unused.
    pub fn reserve(&self) -> Result<mpsc::Permit<'_, JobRun>, SubmitError> {
        self.sender.try_reserve().map_err(|err| match err {
            mpsc::error::TrySendError::Full(()) => SubmitError::QueueFull {
                capacity: self.config.queue_capacity,
            },
            mpsc::error::TrySendError::Closed(()) => SubmitError::WorkersUnavailable,
        })
    }

    /// Jobs accepted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

async fn worker_loop(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<JobRun>>>) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(run) = next else { break };

        let job_id = run.job_id();
        debug!(worker_id, %job_id, "worker picked up job");

        run.execute_isolated().await;
    }
    debug!(worker_id, "scan worker stopped");
}
