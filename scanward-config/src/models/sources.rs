use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::JwtAlgorithm;
use crate::{loader::error::ConfigLoadError, util::parse_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub scan: FileScanConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nmap_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scan_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_retention_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_algorithm: Option<JwtAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expire_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expire_hours: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub nmap_path: Option<PathBuf>,
    pub max_scan_seconds: Option<u64>,
    pub job_retention_seconds: Option<u64>,
    pub scan_workers: Option<usize>,
    pub scan_queue_capacity: Option<usize>,
    pub secret_key: Option<String>,
    pub jwt_algorithm: Option<JwtAlgorithm>,
    pub access_token_expire_minutes: Option<u64>,
    pub refresh_token_expire_hours: Option<u64>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
}

impl EnvConfig {
    /// Reads the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the environment layer from an arbitrary variable source.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            config_path: var("SCANWARD_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: parse_var(&var, "SERVER_PORT")?,
            nmap_path: var("NMAP_PATH").map(PathBuf::from),
            max_scan_seconds: parse_var(&var, "MAX_SCAN_SECONDS")?,
            job_retention_seconds: parse_var(&var, "JOB_RETENTION_SECONDS")?,
            scan_workers: parse_var(&var, "SCAN_WORKERS")?,
            scan_queue_capacity: parse_var(&var, "SCAN_QUEUE_CAPACITY")?,
            secret_key: var("SECRET_KEY"),
            jwt_algorithm: parse_var(&var, "JWT_ALGORITHM")?,
            access_token_expire_minutes: parse_var(
                &var,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
            )?,
            refresh_token_expire_hours: parse_var(
                &var,
                "REFRESH_TOKEN_EXPIRE_HOURS",
            )?,
            auth_username: var("AUTH_USERNAME"),
            auth_password: var("AUTH_PASSWORD"),
        })
    }
}
