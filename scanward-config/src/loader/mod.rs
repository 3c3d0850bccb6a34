pub mod error;

use std::{fs, path::PathBuf};

use tracing::debug;

use self::error::ConfigLoadError;
use crate::{
    constants::*,
    models::{
        AuthConfig, Config, ConfigMetadata, ScanConfig, ServerConfig,
        sources::{EnvConfig, FileConfig},
    },
    validation::{self, ConfigWarnings},
};

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, then resolves the configuration from the process
    /// environment and the config file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_from_env(EnvConfig::gather()?)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolves the configuration from an already gathered environment
    /// layer. Does not touch `.env` or the process environment.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No scanward.toml detected; using environment variables and defaults",
                "Create scanward.toml or pass --config to pin settings in a file",
            );
        }

        let config = compose_config(
            file_config.unwrap_or_default(),
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        );
        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
        debug!(path = %path.display(), "loaded configuration file");

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Config {
    let FileConfig {
        server: file_server,
        scan: file_scan,
        auth: file_auth,
    } = file;

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let scan = ScanConfig {
        nmap_path: env
            .nmap_path
            .or(file_scan.nmap_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NMAP_PATH)),
        max_scan_seconds: env
            .max_scan_seconds
            .or(file_scan.max_scan_seconds)
            .unwrap_or(DEFAULT_MAX_SCAN_SECONDS),
        job_retention_seconds: env
            .job_retention_seconds
            .or(file_scan.job_retention_seconds)
            .unwrap_or(DEFAULT_JOB_RETENTION_SECONDS),
        workers: env
            .scan_workers
            .or(file_scan.workers)
            .unwrap_or(DEFAULT_SCAN_WORKERS),
        queue_capacity: env
            .scan_queue_capacity
            .or(file_scan.queue_capacity)
            .unwrap_or(DEFAULT_SCAN_QUEUE_CAPACITY),
    };

    let auth = AuthConfig {
        secret_key: env
            .secret_key
            .or(file_auth.secret_key)
            .unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
        jwt_algorithm: env
            .jwt_algorithm
            .or(file_auth.jwt_algorithm)
            .unwrap_or_default(),
        access_token_expire_minutes: env
            .access_token_expire_minutes
            .or(file_auth.access_token_expire_minutes)
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
        refresh_token_expire_hours: env
            .refresh_token_expire_hours
            .or(file_auth.refresh_token_expire_hours)
            .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRE_HOURS),
        username: env
            .auth_username
            .or(file_auth.username)
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        password: env
            .auth_password
            .or(file_auth.password)
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
    };

    Config {
        server,
        scan,
        auth,
        metadata,
    }
}
