pub mod sources;

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub scan: ScanConfig,
    pub auth: AuthConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Scanner invocation and job housekeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub nmap_path: PathBuf,
    /// Runtime budget for scans that don't request their own.
    pub max_scan_seconds: u64,
    /// How long finished jobs stay queryable.
    pub job_retention_seconds: u64,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl ScanConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.max_scan_seconds)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_seconds)
    }
}

/// HMAC algorithms accepted for signing tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl JwtAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            JwtAlgorithm::HS256 => "HS256",
            JwtAlgorithm::HS384 => "HS384",
            JwtAlgorithm::HS512 => "HS512",
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            other => Err(format!(
                "unsupported algorithm '{other}' (expected HS256, HS384 or HS512)"
            )),
        }
    }
}

/// Token signing settings and the single set of accepted credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub secret_key: String,
    pub jwt_algorithm: JwtAlgorithm,
    pub access_token_expire_minutes: u64,
    pub refresh_token_expire_hours: u64,
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes * 60)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expire_hours * 3600)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .field(
                "refresh_token_expire_hours",
                &self.refresh_token_expire_hours,
            )
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
