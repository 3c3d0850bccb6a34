//! Core data model definitions shared across scanward crates.
#![allow(missing_docs)]

pub mod api;
pub mod auth;
pub mod error;
pub mod ids;
pub mod job;
pub mod result;

// Intentionally curated re-exports for downstream consumers.
pub use api::{HealthResponse, JobListResponse, ResultResponse, ScanRequest, SubmitResponse};
pub use auth::{LoginRequest, RefreshRequest, TokenResponse};
pub use error::TransitionError;
pub use ids::JobId;
pub use job::{JobRecord, JobStatus};
pub use result::{ResultRecord, SENTINEL_EXIT_CODE, ScanOutcome};
