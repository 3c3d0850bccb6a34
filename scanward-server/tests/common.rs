use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use scanward_config::{AuthConfig, Config, ConfigMetadata, JwtAlgorithm, ScanConfig, ServerConfig};
use scanward_core::{ScanExecutor, ScanInvocation};
use scanward_model::{JobRecord, LoginRequest, ScanOutcome, TokenResponse};
use scanward_server::{
    AppState, create_app,
    infra::startup::{NoopStartupHooks, StartupHooks},
};
use serde_json::json;
use tokio::sync::Semaphore;

pub const USERNAME: &str = "tester";
pub const PASSWORD: &str = "correct horse battery staple";
pub const SECRET: &str = "integration-test-secret-integration-test";

/// Targets with special behaviour in [`FakeExecutor`].
pub const HOLD_TARGET: &str = "hold.example";
pub const SLOW_TARGET: &str = "slow.example";
pub const FAIL_TARGET: &str = "fail.example";

/// Stands in for nmap. `hold.example` blocks until the test releases the
/// gate, `slow.example` outlives its timeout, `fail.example` exits 1 and
/// anything else succeeds with a tiny report.
#[derive(Debug)]
pub struct FakeExecutor {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl ScanExecutor for FakeExecutor {
    async fn run(&self, invocation: &ScanInvocation) -> ScanOutcome {
        match invocation.target.as_str() {
            HOLD_TARGET => {
                let _permit = self.gate.acquire().await;
                report(&invocation.target)
            }
            SLOW_TARGET => {
                tokio::time::sleep(invocation.timeout).await;
                ScanOutcome::timed_out(invocation.timeout, None)
            }
            FAIL_TARGET => ScanOutcome::completed(1, String::new(), None)
                .with_error("nmap exited with status 1: Failed to resolve"),
            target => report(target),
        }
    }
}

fn report(target: &str) -> ScanOutcome {
    ScanOutcome::completed(
        0,
        format!(r#"<nmaprun><host><address addr="{target}"/></host></nmaprun>"#),
        Some(json!({ "nmaprun": { "host": { "address": { "@addr": target } } } })),
    )
}

#[allow(unused)]
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

// Used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub router: Router,
    pub state: AppState,
    pub gate: Arc<Semaphore>,
}

#[allow(unused)]
impl TestApp {
    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub async fn access_token(&self) -> String {
        self.login().await.access_token
    }

    pub async fn login(&self) -> TokenResponse {
        let response = self
            .server
            .post("/auth/login")
            .json(&LoginRequest {
                username: USERNAME.into(),
                password: PASSWORD.into(),
            })
            .await;
        response.assert_status_ok();
        response.json()
    }

    pub async fn job(&self, token: &str, job_id: &str) -> JobRecord {
        let response = self
            .server
            .get(&format!("/scan/{job_id}"))
            .add_header("Authorization", bearer(token))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Polls the job until it reaches a terminal state.
    pub async fn wait_for_terminal(&self, token: &str, job_id: &str) -> Result<JobRecord> {
        for _ in 0..300 {
            let job = self.job(token, job_id).await;
            if job.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Err(anyhow!("job {job_id} never finished"))
    }
}

#[allow(unused)]
pub fn test_config(workers: usize, queue_capacity: usize) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        scan: ScanConfig {
            nmap_path: PathBuf::from("nmap"),
            max_scan_seconds: 30,
            job_retention_seconds: 3600,
            workers,
            queue_capacity,
        },
        auth: AuthConfig {
            secret_key: SECRET.into(),
            jwt_algorithm: JwtAlgorithm::HS256,
            access_token_expire_minutes: 15,
            refresh_token_expire_hours: 24,
            username: USERNAME.into(),
            password: PASSWORD.into(),
        },
        metadata: ConfigMetadata::default(),
    }
}

#[allow(unused)]
pub async fn build_test_app() -> Result<TestApp> {
    build_test_app_with(test_config(4, 64), &NoopStartupHooks).await
}

#[allow(unused)]
pub async fn build_test_app_with<H: StartupHooks>(config: Config, hooks: &H) -> Result<TestApp> {
    let gate = Arc::new(Semaphore::new(0));
    let executor = Arc::new(FakeExecutor { gate: Arc::clone(&gate) });
    let state = AppState::with_executor(config, executor);
    hooks.run(&state).await?;

    let router = create_app(state.clone());
    let server = TestServer::builder()
        .build(router.clone())
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        router,
        state,
        gate,
    })
}
