//! Job submission and retrieval.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use scanward_model::{JobId, JobRecord, JobStatus, ResultRecord, ScanRequest};
use tracing::info;

use crate::{
    error::SubmitError,
    executor::{ScanExecutor, ScanInvocation},
    registry::JobRegistry,
    worker::{JobRun, WorkerPool},
};

/// Whether the caller waits for the scan to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMode {
    Sync,
    #[default]
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Applied when a request carries no `max_seconds`.
    pub default_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(900),
        }
    }
}

/// Identifier and status handed back to the submitter: `queued` for
/// asynchronous submissions, the terminal status for synchronous ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Answer to a result query for a known job.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultLookup {
    Ready { job: JobRecord, result: ResultRecord },
    /// The job is still queued or running.
    NotReady { status: JobStatus },
    /// The job is terminal but no result was stored for it.
    NoResult { status: JobStatus },
}

impl ResultLookup {
    pub fn status(&self) -> JobStatus {
        match self {
            ResultLookup::Ready { job, .. } => job.status,
            ResultLookup::NotReady { status } | ResultLookup::NoResult { status } => *status,
        }
    }
}

/// Accepts scan requests, runs them inline or through the worker pool,
/// and answers status queries from the registry.
#[derive(Debug, Clone)]
pub struct ScanOrchestrator {
    registry: Arc<dyn JobRegistry>,
    executor: Arc<dyn ScanExecutor>,
    workers: Arc<WorkerPool>,
    settings: OrchestratorSettings,
}

impl ScanOrchestrator {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        executor: Arc<dyn ScanExecutor>,
        workers: Arc<WorkerPool>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            executor,
            workers,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    pub async fn submit(
        &self,
        request: ScanRequest,
        mode: SubmitMode,
    ) -> Result<SubmitReceipt, SubmitError> {
        let target = request.target.trim();
        if target.is_empty() {
            return Err(SubmitError::EmptyTarget);
        }
        let timeout = match request.max_seconds {
            Some(0) => return Err(SubmitError::InvalidTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => self.settings.default_timeout,
        };
        let invocation = ScanInvocation::new(target, request.args, timeout);

        match mode {
            SubmitMode::Async => {
                let permit = self.workers.reserve()?;
                let job_id = self.register(target);
                info!(%job_id, %target, timeout_secs = timeout.as_secs(), "scan queued");
                permit.send(self.job_run(job_id, invocation));
                Ok(SubmitReceipt {
                    job_id,
                    status: JobStatus::Queued,
                })
            }
            SubmitMode::Sync => {
                let job_id = self.register(target);
                info!(
                    %job_id,
                    %target,
                    timeout_secs = timeout.as_secs(),
                    "scan running inline"
                );

                // Run detached so a dropped request cannot strand the job
                // half way through.
                let status = match self.job_run(job_id, invocation).execute_isolated().await {
                    Some(status) => status,
                    None => self.current_status(&job_id),
                };
                Ok(SubmitReceipt { job_id, status })
            }
        }
    }

    pub fn status(&self, job_id: &JobId) -> Option<JobRecord> {
        self.registry.get(job_id)
    }

    pub fn result(&self, job_id: &JobId) -> Option<ResultLookup> {
        let (job, result) = self.registry.get_with_result(job_id)?;
        let lookup = match result {
            Some(result) => ResultLookup::Ready { job, result },
            None if job.is_terminal() => ResultLookup::NoResult { status: job.status },
            None => ResultLookup::NotReady { status: job.status },
        };
        Some(lookup)
    }

    pub fn list(&self) -> Vec<JobRecord> {
        self.registry.list()
    }

    fn register(&self, target: &str) -> JobId {
        loop {
            let job = JobRecord::queued(JobId::new(), target, Utc::now());
            let job_id = job.job_id;
            if self.registry.add(job) {
                return job_id;
            }
        }
    }

    fn job_run(&self, job_id: JobId, invocation: ScanInvocation) -> JobRun {
        JobRun::new(
            job_id,
            invocation,
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
        )
    }

    fn current_status(&self, job_id: &JobId) -> JobStatus {
        self.registry
            .get(job_id)
            .map(|job| job.status)
            .unwrap_or(JobStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use scanward_model::{SENTINEL_EXIT_CODE, ScanOutcome};
    use tokio::sync::Semaphore;

    use super::*;
    use crate::{
        registry::{InMemoryJobRegistry, JobTransition},
        worker::{PANICKED_MESSAGE, WorkerConfig},
    };

    #[derive(Debug, Default)]
    struct EchoExecutor {
        gate: Option<Arc<Semaphore>>,
    }

    #[async_trait]
    impl ScanExecutor for EchoExecutor {
        async fn run(&self, invocation: &ScanInvocation) -> ScanOutcome {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }
            match invocation.target.as_str() {
                "slow.example" => {
                    tokio::time::sleep(invocation.timeout).await;
                    ScanOutcome::timed_out(invocation.timeout, None)
                }
                "broken.example" => ScanOutcome::failed("failed to launch nmap"),
                "panic.example" => panic!("scanner crashed"),
                target => ScanOutcome::completed(
                    0,
                    format!("<nmaprun><host>{target}</host></nmaprun>"),
                    Some(serde_json::json!({ "nmaprun": { "host": target } })),
                ),
            }
        }
    }

    fn orchestrator(executor: EchoExecutor, config: WorkerConfig) -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(executor),
            Arc::new(WorkerPool::start(config)),
            OrchestratorSettings::default(),
        )
    }

    async fn wait_terminal(orchestrator: &ScanOrchestrator, job_id: JobId) -> JobRecord {
        for _ in 0..300 {
            let job = orchestrator.status(&job_id).unwrap();
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never finished");
    }

    #[tokio::test]
    async fn rejects_blank_target_and_zero_timeout() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());

        let blank = orchestrator
            .submit(ScanRequest::new("   "), SubmitMode::Async)
            .await;
        assert_eq!(blank, Err(SubmitError::EmptyTarget));

        let zero = orchestrator
            .submit(ScanRequest::new("10.0.0.1").with_max_seconds(0), SubmitMode::Sync)
            .await;
        assert_eq!(zero, Err(SubmitError::InvalidTimeout));
        assert!(orchestrator.list().is_empty());
    }

    #[tokio::test]
    async fn sync_submission_returns_terminal_status() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());

        let receipt = orchestrator
            .submit(ScanRequest::new(" 10.0.0.1 "), SubmitMode::Sync)
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Done);

        let job = orchestrator.status(&receipt.job_id).unwrap();
        assert_eq!(job.target, "10.0.0.1");
        match orchestrator.result(&receipt.job_id).unwrap() {
            ResultLookup::Ready { result, .. } => {
                assert_eq!(result.exit_code, Some(0));
                assert_eq!(result.parsed.unwrap()["nmaprun"]["host"], "10.0.0.1");
            }
            other => panic!("expected ready result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_end_in_error_status() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());

        let receipt = orchestrator
            .submit(ScanRequest::new("broken.example"), SubmitMode::Sync)
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Error);
        let job = orchestrator.status(&receipt.job_id).unwrap();
        assert_eq!(job.exit_code, Some(SENTINEL_EXIT_CODE));
        assert_eq!(job.error.as_deref(), Some("failed to launch nmap"));

        let receipt = orchestrator
            .submit(
                ScanRequest::new("slow.example").with_max_seconds(1),
                SubmitMode::Sync,
            )
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Error);
        let job = orchestrator.status(&receipt.job_id).unwrap();
        assert_eq!(job.error.as_deref(), Some("timeout after 1s"));
    }

    #[tokio::test]
    async fn async_result_is_not_ready_until_terminal() {
        let gate = Arc::new(Semaphore::new(0));
        let orchestrator = orchestrator(
            EchoExecutor {
                gate: Some(gate.clone()),
            },
            WorkerConfig::default(),
        );

        let receipt = orchestrator
            .submit(ScanRequest::new("10.0.0.2"), SubmitMode::Async)
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Queued);

        let pending = orchestrator.result(&receipt.job_id).unwrap();
        assert!(matches!(pending, ResultLookup::NotReady { .. }));

        gate.add_permits(1);
        let job = wait_terminal(&orchestrator, receipt.job_id).await;
        assert_eq!(job.status, JobStatus::Done);
        assert!(matches!(
            orchestrator.result(&receipt.job_id),
            Some(ResultLookup::Ready { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_ids_are_absent() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());
        let job_id = JobId::new();
        assert!(orchestrator.status(&job_id).is_none());
        assert!(orchestrator.result(&job_id).is_none());
    }

    #[tokio::test]
    async fn full_queue_registers_nothing() {
        let gate = Arc::new(Semaphore::new(0));
        let orchestrator = orchestrator(
            EchoExecutor {
                gate: Some(gate.clone()),
            },
            WorkerConfig {
                worker_count: 1,
                queue_capacity: 1,
            },
        );

        let first = orchestrator
            .submit(ScanRequest::new("10.0.0.1"), SubmitMode::Async)
            .await
            .unwrap();
        // wait until the only worker holds the first job
        for _ in 0..200 {
            if orchestrator.status(&first.job_id).unwrap().status == JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        orchestrator
            .submit(ScanRequest::new("10.0.0.2"), SubmitMode::Async)
            .await
            .unwrap();

        let rejected = orchestrator
            .submit(ScanRequest::new("10.0.0.3"), SubmitMode::Async)
            .await;
        assert_eq!(rejected, Err(SubmitError::QueueFull { capacity: 1 }));
        assert_eq!(orchestrator.list().len(), 2);

        gate.add_permits(2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_get_distinct_ids() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                let mode = if i % 2 == 0 {
                    SubmitMode::Async
                } else {
                    SubmitMode::Sync
                };
                tokio::spawn(async move {
                    orchestrator
                        .submit(ScanRequest::new(format!("10.1.0.{i}")), mode)
                        .await
                        .unwrap()
                        .job_id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 32);

        for job_id in ids {
            let job = wait_terminal(&orchestrator, job_id).await;
            assert_eq!(job.status, JobStatus::Done);
            assert!(job.started_at.unwrap() >= job.created_at);
            assert!(job.finished_at.unwrap() >= job.started_at.unwrap());
        }
    }

    #[tokio::test]
    async fn sync_submission_reports_error_when_scan_panics() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());

        let receipt = orchestrator
            .submit(ScanRequest::new("panic.example"), SubmitMode::Sync)
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Error);

        match orchestrator.result(&receipt.job_id).unwrap() {
            ResultLookup::Ready { job, result } => {
                assert_eq!(job.status, JobStatus::Error);
                assert_eq!(result.exit_code, Some(SENTINEL_EXIT_CODE));
                assert_eq!(result.error.as_deref(), Some(PANICKED_MESSAGE));
            }
            other => panic!("expected ready result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_job_without_result_reports_no_result() {
        let orchestrator = orchestrator(EchoExecutor::default(), WorkerConfig::default());
        let registry = orchestrator.registry();

        let job = JobRecord::queued(JobId::new(), "10.0.0.4", Utc::now());
        let job_id = job.job_id;
        registry.add(job);
        registry
            .update(&job_id, JobTransition::Running { at: Utc::now() })
            .unwrap();
        registry
            .update(
                &job_id,
                JobTransition::Finished {
                    at: Utc::now(),
                    outcome: ScanOutcome::completed(0, String::new(), None),
                },
            )
            .unwrap();

        assert_eq!(
            orchestrator.result(&job_id),
            Some(ResultLookup::NoResult {
                status: JobStatus::Done
            })
        );
    }
}
