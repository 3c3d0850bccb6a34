use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::JobId;

/// Exit code recorded when the scanner never produced one of its own
/// (timeout or invocation failure). Real process exit codes are never
/// negative.
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// Normalized result of one scanner invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub exit_code: i32,
    pub raw_output: Option<String>,
    pub parsed: Option<Value>,
    pub error: Option<String>,
}

impl ScanOutcome {
    /// The process terminated on its own.
    pub fn completed(exit_code: i32, raw_output: String, parsed: Option<Value>) -> Self {
        Self {
            exit_code,
            raw_output: Some(raw_output),
            parsed,
            error: None,
        }
    }

    /// The process outlived its budget and was killed.
    pub fn timed_out(timeout: Duration, partial_output: Option<String>) -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            raw_output: partial_output.filter(|out| !out.is_empty()),
            parsed: None,
            error: Some(format!("timeout after {}s", timeout.as_secs())),
        }
    }

    /// The process could not be run at all.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            raw_output: None,
            parsed: None,
            error: Some(message.into()),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Output of a finished (or attempted) scan. Written once, together with the
/// job's terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: JobId,
    pub raw_output: Option<String>,
    pub parsed: Option<Value>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl ResultRecord {
    pub fn from_outcome(job_id: JobId, outcome: &ScanOutcome) -> Self {
        Self {
            job_id,
            raw_output: outcome.raw_output.clone(),
            parsed: outcome.parsed.clone(),
            exit_code: Some(outcome.exit_code),
            error: outcome.error.clone(),
        }
    }
}
