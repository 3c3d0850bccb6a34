use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::TransitionError, ids::JobId, result::ScanOutcome};

/// Lifecycle stage of a scan job. Ordering follows the state machine, so
/// `a < b` means `a` happens before `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// `done` and `error` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable lifecycle state of one submitted scan.
///
/// Fields are only changed through the `mark_*` transitions, which keep the
/// timestamps and exit code consistent with `status`:
/// `started_at` is set once the job reached `running`, `finished_at` and
/// `exit_code` once it reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub target: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn queued(job_id: JobId, target: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            target: target.into(),
            status: JobStatus::Queued,
            created_at,
            started_at: None,
            finished_at: None,
            exit_code: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_running(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure(JobStatus::Queued, JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn mark_done(&mut self, at: DateTime<Utc>, exit_code: i32) -> Result<(), TransitionError> {
        self.ensure(JobStatus::Running, JobStatus::Done)?;
        self.status = JobStatus::Done;
        self.finished_at = Some(at);
        self.exit_code = Some(exit_code);
        self.error = None;
        Ok(())
    }

    pub fn mark_error(
        &mut self,
        at: DateTime<Utc>,
        exit_code: i32,
        message: Option<String>,
    ) -> Result<(), TransitionError> {
        self.ensure(JobStatus::Running, JobStatus::Error)?;
        self.status = JobStatus::Error;
        self.finished_at = Some(at);
        self.exit_code = Some(exit_code);
        self.error = message;
        Ok(())
    }

    /// Applies the terminal transition matching `outcome`: `done` for a zero
    /// exit code, `error` for anything else.
    pub fn finish(
        &mut self,
        at: DateTime<Utc>,
        outcome: &ScanOutcome,
    ) -> Result<(), TransitionError> {
        if outcome.is_success() {
            self.mark_done(at, outcome.exit_code)
        } else {
            self.mark_error(at, outcome.exit_code, outcome.error.clone())
        }
    }

    fn ensure(&self, expected: JobStatus, to: JobStatus) -> Result<(), TransitionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }
}
