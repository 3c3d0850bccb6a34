use std::{fmt, sync::Arc};

use scanward_config::Config;
use scanward_core::{
    InMemoryJobRegistry, JobRegistry, NmapExecutor, OrchestratorSettings, ScanExecutor,
    ScanOrchestrator, WorkerConfig, WorkerPool,
};

use tracing::debug;

use crate::auth::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: ScanOrchestrator,
    pub tokens: Arc<TokenService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wires the registry, worker pool and orchestrator around the real
    /// nmap binary. Must be called within a Tokio runtime.
    pub fn new(config: Config) -> Self {
        let executor = Arc::new(NmapExecutor::new(config.scan.nmap_path.clone()));
        debug!(binary = %executor.binary().display(), "using nmap executor");
        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: Config, executor: Arc<dyn ScanExecutor>) -> Self {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let workers = Arc::new(WorkerPool::start(WorkerConfig {
            worker_count: config.scan.workers,
            queue_capacity: config.scan.queue_capacity,
        }));
        let workers_started = workers.worker_count();
        let orchestrator = ScanOrchestrator::new(
            registry,
            executor,
            workers,
            OrchestratorSettings {
                default_timeout: config.scan.default_timeout(),
            },
        );
        let tokens = Arc::new(TokenService::from_config(&config.auth));
        debug!(
            workers = workers_started,
            queue_capacity = config.scan.queue_capacity,
            default_timeout_secs = orchestrator.settings().default_timeout.as_secs(),
            "scan orchestrator ready"
        );

        Self {
            config: Arc::new(config),
            orchestrator,
            tokens,
        }
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        self.orchestrator.registry()
    }
}
