use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser};
use scanward_config::{ConfigLoader, ConfigLoaderOptions};
use scanward_server::{
    AppState, create_app,
    infra::startup::{ProdStartupHooks, StartupHooks},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "scanward-server")]
#[command(about = "Submit nmap scans over HTTP and poll for their results")]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Path to a scanward.toml configuration file
    #[arg(short, long, env = "SCANWARD_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, env = "SCANWARD_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_server_with_hooks(cli.serve, &ProdStartupHooks).await
}

async fn run_server_with_hooks<H>(args: ServeArgs, hooks: &H) -> anyhow::Result<()>
where
    H: StartupHooks,
{
    let load = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;
    let mut config = load.config;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "loaded configuration file");
    }
    for warning in load.warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    info!(
        nmap = %config.scan.nmap_path.display(),
        workers = config.scan.workers,
        queue_capacity = config.scan.queue_capacity,
        default_timeout_secs = config.scan.max_scan_seconds,
        "scan settings"
    );

    let (host, port) = (config.server.host.clone(), config.server.port);
    let state = AppState::new(config);
    hooks.run(&state).await?;

    let router = create_app(state);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!("Starting scanward server on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("scanward server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
