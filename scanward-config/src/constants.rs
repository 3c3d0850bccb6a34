//! Built-in defaults. The secret and credentials are only fit for local
//! development; loading them produces a warning.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_NMAP_PATH: &str = "nmap";
pub const DEFAULT_MAX_SCAN_SECONDS: u64 = 900;
pub const DEFAULT_JOB_RETENTION_SECONDS: u64 = 86_400;
pub const DEFAULT_SCAN_WORKERS: usize = 8;
pub const DEFAULT_SCAN_QUEUE_CAPACITY: usize = 1024;

pub const DEFAULT_SECRET_KEY: &str = "scanward-dev-secret-change-me";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 15;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_HOURS: u64 = 24;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Upper bounds accepted by the guard rails. Larger values overflow the
/// timestamp arithmetic done with them.
pub const MAX_MAX_SCAN_SECONDS: u64 = 7 * 86_400;
pub const MAX_JOB_RETENTION_SECONDS: u64 = 10 * 365 * 86_400;
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 365 * 24 * 60;
pub const MAX_REFRESH_TOKEN_EXPIRE_HOURS: u64 = 10 * 365 * 24;

/// Searched in order when no explicit config path is given.
pub const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["scanward.toml", "config/scanward.toml"];
