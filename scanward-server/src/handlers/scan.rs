use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use scanward_core::{ResultLookup, SubmitMode};
use scanward_model::{
    JobId, JobListResponse, JobRecord, ResultResponse, ScanRequest, SubmitResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    infra::{
        app_state::AppState,
        errors::{AppError, AppResult},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct SubmitQuery {
    #[serde(default)]
    pub sync: bool,
}

pub async fn submit_scan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<SubmitQuery>,
    Json(request): Json<ScanRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let mode = if query.sync {
        SubmitMode::Sync
    } else {
        SubmitMode::Async
    };
    info!(
        subject = %user.subject,
        target = %request.target,
        sync = query.sync,
        "scan requested"
    );

    let receipt = state.orchestrator.submit(request, mode).await?;
    Ok(Json(SubmitResponse {
        job_id: receipt.job_id,
        status: receipt.status,
    }))
}

pub async fn list_scans(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(state.orchestrator.list().into())
}

pub async fn get_scan(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobRecord>> {
    let job_id = parse_job_id(&job_id)?;
    state
        .orchestrator
        .status(&job_id)
        .map(Json)
        .ok_or_else(job_not_found)
}

pub async fn get_scan_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<ResultResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let response = match state.orchestrator.result(&job_id).ok_or_else(job_not_found)? {
        ResultLookup::Ready { job, result } => ResultResponse::ready(job.status, result),
        ResultLookup::NotReady { status } => ResultResponse::not_ready(status),
        ResultLookup::NoResult { status } => ResultResponse::no_result(status),
    };
    Ok(Json(response))
}

/// Malformed ids can never name a job, so they are reported as not found.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    raw.parse().map_err(|_| job_not_found())
}

fn job_not_found() -> AppError {
    AppError::not_found("job not found")
}
