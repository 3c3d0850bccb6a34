//! Request and response payloads of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ids::JobId,
    job::{JobRecord, JobStatus},
    result::ResultRecord,
};

/// Body of `POST /scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// IP address or hostname to scan.
    pub target: String,
    /// Extra scanner arguments, e.g. `["-sV", "-p", "80,443"]`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-scan override of the default runtime budget.
    #[serde(default)]
    pub max_seconds: Option<u64>,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            max_seconds: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_seconds(mut self, seconds: u64) -> Self {
        self.max_seconds = Some(seconds);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub count: usize,
}

impl From<Vec<JobRecord>> for JobListResponse {
    fn from(jobs: Vec<JobRecord>) -> Self {
        let count = jobs.len();
        Self { jobs, count }
    }
}

/// Body of `GET /scan/{job_id}/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultResponse {
    // Listed first so untagged deserialization only picks it when `message`
    // is present.
    Pending {
        status: JobStatus,
        message: String,
    },
    Ready {
        status: JobStatus,
        exit_code: Option<i32>,
        error: Option<String>,
        parsed: Option<Value>,
        raw_output: Option<String>,
    },
}

impl ResultResponse {
    pub const NOT_READY: &'static str = "result not ready";
    pub const NO_RESULT: &'static str = "no result";

    pub fn ready(status: JobStatus, result: ResultRecord) -> Self {
        Self::Ready {
            status,
            exit_code: result.exit_code,
            error: result.error,
            parsed: result.parsed,
            raw_output: result.raw_output,
        }
    }

    pub fn not_ready(status: JobStatus) -> Self {
        Self::Pending {
            status,
            message: Self::NOT_READY.to_string(),
        }
    }

    pub fn no_result(status: JobStatus) -> Self {
        Self::Pending {
            status,
            message: Self::NO_RESULT.to_string(),
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            Self::Ready { status, .. } | Self::Pending { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            time: Utc::now(),
        }
    }
}
