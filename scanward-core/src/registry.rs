//! Concurrent storage for job and result records.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scanward_model::{JobId, JobRecord, ResultRecord, ScanOutcome, TransitionError};
use tracing::debug;

/// A lifecycle step applied to a stored [`JobRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    Running { at: DateTime<Utc> },
    Finished { at: DateTime<Utc>, outcome: ScanOutcome },
}

impl JobTransition {
    fn apply(self, job: &mut JobRecord) -> Result<(), TransitionError> {
        match self {
            JobTransition::Running { at } => job.mark_running(at),
            JobTransition::Finished { at, outcome } => job.finish(at, &outcome),
        }
    }
}

/// Thread-safe store of job records and their results, keyed by job id.
///
/// The registry knows nothing about scanning; it only guarantees that every
/// write is applied atomically and that readers see whole records. Writes
/// against an id that is no longer present are silent no-ops (reported as
/// `Ok(false)` / `false`), since a late completion may race with retention
/// cleanup.
pub trait JobRegistry: Send + Sync + fmt::Debug {
    /// Inserts a new record. Returns `false`, leaving the existing record
    /// untouched, if the id is already taken.
    fn add(&self, job: JobRecord) -> bool;

    /// Applies `transition` to the stored record.
    fn update(
        &self,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<bool, TransitionError>;

    /// Applies the terminal transition for `outcome` and stores the matching
    /// [`ResultRecord`] in one write, so no reader sees one without the
    /// other.
    fn complete(
        &self,
        job_id: &JobId,
        at: DateTime<Utc>,
        outcome: &ScanOutcome,
    ) -> Result<bool, TransitionError>;

    fn get(&self, job_id: &JobId) -> Option<JobRecord>;

    /// Reads a job and its result under the same lock.
    fn get_with_result(
        &self,
        job_id: &JobId,
    ) -> Option<(JobRecord, Option<ResultRecord>)>;

    /// Snapshot of every job, oldest first.
    fn list(&self) -> Vec<JobRecord>;

    /// Inserts or overwrites the result for `result.job_id`. Ignored when
    /// the job itself is unknown.
    fn set_result(&self, result: ResultRecord) -> bool;

    fn get_result(&self, job_id: &JobId) -> Option<ResultRecord>;

    /// Drops terminal jobs (and their results) that finished before
    /// `cutoff`. Jobs still queued or running are never removed.
    fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<JobId, JobRecord>,
    results: HashMap<JobId, ResultRecord>,
}

/// In-process [`JobRegistry`] guarded by a single reader/writer lock over
/// both tables.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    tables: RwLock<Tables>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for InMemoryJobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (jobs, results) = self
            .tables
            .try_read()
            .map(|tables| (tables.jobs.len(), tables.results.len()))
            .unwrap_or_default();

        f.debug_struct("InMemoryJobRegistry")
            .field("jobs", &jobs)
            .field("results", &results)
            .finish()
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn add(&self, job: JobRecord) -> bool {
        let mut tables = self.tables.write();
        if tables.jobs.contains_key(&job.job_id) {
            return false;
        }
        tables.jobs.insert(job.job_id, job);
        true
    }

    fn update(
        &self,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<bool, TransitionError> {
        let mut tables = self.tables.write();
        let Some(job) = tables.jobs.get_mut(job_id) else {
            debug!(%job_id, "update for unknown job ignored");
            return Ok(false);
        };

        // Apply to a copy so a rejected transition leaves nothing behind.
        let mut next = job.clone();
        transition.apply(&mut next)?;
        *job = next;
        Ok(true)
    }

    fn complete(
        &self,
        job_id: &JobId,
        at: DateTime<Utc>,
        outcome: &ScanOutcome,
    ) -> Result<bool, TransitionError> {
        let mut tables = self.tables.write();
        let Some(job) = tables.jobs.get_mut(job_id) else {
            debug!(%job_id, "completion for unknown job ignored");
            return Ok(false);
        };

        let mut next = job.clone();
        next.finish(at, outcome)?;
        *job = next;
        tables
            .results
            .insert(*job_id, ResultRecord::from_outcome(*job_id, outcome));
        Ok(true)
    }

    fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        self.tables.read().jobs.get(job_id).cloned()
    }

    fn get_with_result(
        &self,
        job_id: &JobId,
    ) -> Option<(JobRecord, Option<ResultRecord>)> {
        let tables = self.tables.read();
        let job = tables.jobs.get(job_id)?.clone();
        let result = tables.results.get(job_id).cloned();
        Some((job, result))
    }

    fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> =
            self.tables.read().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    fn set_result(&self, result: ResultRecord) -> bool {
        let mut tables = self.tables.write();
        if !tables.jobs.contains_key(&result.job_id) {
            debug!(job_id = %result.job_id, "result for unknown job ignored");
            return false;
        }
        tables.results.insert(result.job_id, result);
        true
    }

    fn get_result(&self, job_id: &JobId) -> Option<ResultRecord> {
        self.tables.read().results.get(job_id).cloned()
    }

    fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write();
        let expired: Vec<JobId> = tables
            .jobs
            .values()
            .filter(|job| {
                job.is_terminal()
                    && job.finished_at.is_some_and(|finished| finished < cutoff)
            })
            .map(|job| job.job_id)
            .collect();

        for job_id in &expired {
            tables.jobs.remove(job_id);
            tables.results.remove(job_id);
        }
        expired.len()
    }

    fn len(&self) -> usize {
        self.tables.read().jobs.len()
    }
}
