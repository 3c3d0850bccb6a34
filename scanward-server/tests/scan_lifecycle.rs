use std::{collections::HashSet, time::Duration};

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use futures::future::join_all;
use scanward_core::JobTransition;
use scanward_model::{
    JobId, JobListResponse, JobRecord, JobStatus, ResultResponse, SENTINEL_EXIT_CODE, ScanOutcome,
    SubmitResponse,
};
use scanward_server::infra::startup::NoopStartupHooks;
use serde_json::{Value, json};

mod common;
use common::{
    FAIL_TARGET, HOLD_TARGET, SLOW_TARGET, TestApp, bearer, build_test_app, build_test_app_with,
    test_config,
};

async fn submit(
    app: &TestApp,
    token: &str,
    body: Value,
    sync: bool,
) -> (StatusCode, SubmitResponse) {
    let mut request = app
        .server
        .post("/scan")
        .add_header("Authorization", bearer(token))
        .json(&body);
    if sync {
        request = request.add_query_param("sync", true);
    }
    let response = request.await;
    let status = response.status_code();
    (status, response.json())
}

async fn result(app: &TestApp, token: &str, job_id: &JobId) -> ResultResponse {
    let response = app
        .server
        .get(&format!("/scan/{job_id}/result"))
        .add_header("Authorization", bearer(token))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_scan_is_queued_then_completes() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let (status, receipt) =
        submit(&app, &token, json!({ "target": "10.0.0.1", "args": ["-p", "22"] }), false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt.status, JobStatus::Queued);

    let job = app.wait_for_terminal(&token, &receipt.job_id.to_string()).await?;
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.target, "10.0.0.1");
    assert_eq!(job.exit_code, Some(0));
    assert!(job.started_at.is_some() && job.finished_at.is_some());

    match result(&app, &token, &receipt.job_id).await {
        ResultResponse::Ready {
            status,
            exit_code,
            error,
            parsed,
            raw_output,
        } => {
            assert_eq!(status, JobStatus::Done);
            assert_eq!(exit_code, Some(0));
            assert!(error.is_none());
            assert_eq!(
                parsed.unwrap()["nmaprun"]["host"]["address"]["@addr"],
                "10.0.0.1"
            );
            assert!(raw_output.unwrap().contains("10.0.0.1"));
        }
        other => panic!("expected a ready result, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn sync_scan_returns_terminal_status() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let (status, receipt) = submit(&app, &token, json!({ "target": "10.0.0.2" }), true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt.status, JobStatus::Done);

    // the result is readable as soon as the terminal status is
    assert_eq!(result(&app, &token, &receipt.job_id).await.status(), JobStatus::Done);
    Ok(())
}

#[tokio::test]
async fn failing_and_timed_out_scans_end_in_error() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let (_, failed) = submit(&app, &token, json!({ "target": FAIL_TARGET }), true).await;
    assert_eq!(failed.status, JobStatus::Error);
    let job = app.job(&token, &failed.job_id.to_string()).await;
    assert_eq!(job.exit_code, Some(1));
    assert!(job.error.unwrap().contains("Failed to resolve"));

    let (_, timed_out) =
        submit(&app, &token, json!({ "target": SLOW_TARGET, "max_seconds": 1 }), true).await;
    assert_eq!(timed_out.status, JobStatus::Error);
    match result(&app, &token, &timed_out.job_id).await {
        ResultResponse::Ready { exit_code, error, .. } => {
            assert_eq!(exit_code, Some(SENTINEL_EXIT_CODE));
            assert_eq!(error.as_deref(), Some("timeout after 1s"));
        }
        other => panic!("expected a ready result, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn result_is_not_ready_while_job_runs() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let (_, receipt) = submit(&app, &token, json!({ "target": HOLD_TARGET }), false).await;

    let pending = result(&app, &token, &receipt.job_id).await;
    assert!(matches!(
        pending,
        ResultResponse::Pending { ref message, status }
            if message == ResultResponse::NOT_READY && !status.is_terminal()
    ));

    app.release(1);
    let job = app.wait_for_terminal(&token, &receipt.job_id.to_string()).await?;
    assert_eq!(job.status, JobStatus::Done);
    assert!(matches!(
        result(&app, &token, &receipt.job_id).await,
        ResultResponse::Ready { .. }
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_scan_does_not_block_other_requests() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let held = submit(&app, &token, json!({ "target": HOLD_TARGET }), true);
    let meanwhile = async {
        // Wait until the held job shows up as running, then prove another
        // scan can go all the way through while it is still blocked.
        let mut running = None;
        for _ in 0..300 {
            let list: JobListResponse = app
                .server
                .get("/scan")
                .add_header("Authorization", bearer(&token))
                .await
                .json();
            running = list.jobs.into_iter().find(|job| job.status == JobStatus::Running);
            if running.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let running = running.expect("held job never started");

        let (_, other) = submit(&app, &token, json!({ "target": "10.0.0.3" }), false).await;
        let other = app.wait_for_terminal(&token, &other.job_id.to_string()).await.unwrap();
        assert_eq!(other.status, JobStatus::Done);
        assert_eq!(
            app.job(&token, &running.job_id.to_string()).await.status,
            JobStatus::Running
        );

        app.release(1);
        running.job_id
    };

    let ((status, receipt), held_id) = tokio::join!(held, meanwhile);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt.job_id, held_id);
    assert_eq!(receipt.status, JobStatus::Done);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_distinct_ids() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let submissions = (0..20).map(|i| {
        submit(&app, &token, json!({ "target": format!("10.2.0.{i}") }), i % 4 == 0)
    });
    let receipts = join_all(submissions).await;

    let ids: HashSet<JobId> = receipts.iter().map(|(_, receipt)| receipt.job_id).collect();
    assert_eq!(ids.len(), 20);

    for job_id in &ids {
        let job = app.wait_for_terminal(&token, &job_id.to_string()).await?;
        assert_eq!(job.status, JobStatus::Done);
    }

    let list: JobListResponse = app
        .server
        .get("/scan")
        .add_header("Authorization", bearer(&token))
        .await
        .json();
    assert_eq!(list.count, 20);
    Ok(())
}

#[tokio::test]
async fn finished_job_without_result_reports_no_result() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    let registry = app.state.registry();
    let job = JobRecord::queued(JobId::new(), "10.0.0.5", Utc::now());
    let job_id = job.job_id;
    registry.add(job);
    registry.update(&job_id, JobTransition::Running { at: Utc::now() })?;
    registry.update(
        &job_id,
        JobTransition::Finished {
            at: Utc::now(),
            outcome: ScanOutcome::completed(0, String::new(), None),
        },
    )?;

    let response = app
        .server
        .get(&format!("/scan/{job_id}/result"))
        .add_header("Authorization", bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "done", "message": "no result" }));
    Ok(())
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    for path in [
        format!("/scan/{}", JobId::new()),
        format!("/scan/{}/result", JobId::new()),
        "/scan/not-a-uuid".to_string(),
        "/scan/not-a-uuid/result".to_string(),
    ] {
        let response = app
            .server
            .get(&path)
            .add_header("Authorization", bearer(&token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "job not found", "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn invalid_requests_are_rejected() -> Result<()> {
    let app = build_test_app().await?;
    let token = app.access_token().await;

    for body in [json!({ "target": "" }), json!({ "target": "   " })] {
        let response = app
            .server
            .post("/scan")
            .add_header("Authorization", bearer(&token))
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "target is required");
    }

    let response = app
        .server
        .post("/scan")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "target": "10.0.0.1", "max_seconds": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/scan")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "args": ["-sV"] }))
        .await;
    assert!(response.status_code().is_client_error());

    let list: JobListResponse = app
        .server
        .get("/scan")
        .add_header("Authorization", bearer(&token))
        .await
        .json();
    assert_eq!(list.count, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn saturated_queue_is_reported_as_unavailable() -> Result<()> {
    let app = build_test_app_with(test_config(1, 1), &NoopStartupHooks).await?;
    let token = app.access_token().await;

    let (_, first) = submit(&app, &token, json!({ "target": HOLD_TARGET }), false).await;
    for _ in 0..300 {
        if app.job(&token, &first.job_id.to_string()).await.status == JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let (status, _) = submit(&app, &token, json!({ "target": HOLD_TARGET }), false).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .server
        .post("/scan")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "target": "10.0.0.9" }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    app.release(2);
    Ok(())
}
