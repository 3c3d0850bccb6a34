use crate::{
    constants::{
        DEFAULT_PASSWORD, DEFAULT_SECRET_KEY, DEFAULT_USERNAME, MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
        MAX_JOB_RETENTION_SECONDS, MAX_MAX_SCAN_SECONDS, MAX_REFRESH_TOKEN_EXPIRE_HOURS,
    },
    loader::error::ConfigLoadError,
    models::Config,
};

/// Minimum secret length below which HMAC signing is considered weak.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Rejects values the service cannot run with and flags insecure ones.
pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    let scan = &config.scan;
    for (key, value) in [
        ("MAX_SCAN_SECONDS", scan.max_scan_seconds),
        ("SCAN_WORKERS", scan.workers as u64),
        ("SCAN_QUEUE_CAPACITY", scan.queue_capacity as u64),
    ] {
        if value == 0 {
            return Err(ConfigLoadError::invalid(key, value, "must be greater than zero"));
        }
    }
    if scan.nmap_path.as_os_str().is_empty() {
        return Err(ConfigLoadError::invalid("NMAP_PATH", "", "must not be empty"));
    }

    let auth = &config.auth;
    for (key, value) in [
        ("ACCESS_TOKEN_EXPIRE_MINUTES", auth.access_token_expire_minutes),
        ("REFRESH_TOKEN_EXPIRE_HOURS", auth.refresh_token_expire_hours),
    ] {
        if value == 0 {
            return Err(ConfigLoadError::invalid(key, value, "must be greater than zero"));
        }
    }
    for (key, value, max) in [
        (
            "MAX_SCAN_SECONDS",
            scan.max_scan_seconds,
            MAX_MAX_SCAN_SECONDS,
        ),
        (
            "JOB_RETENTION_SECONDS",
            scan.job_retention_seconds,
            MAX_JOB_RETENTION_SECONDS,
        ),
        (
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            auth.access_token_expire_minutes,
            MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
        ),
        (
            "REFRESH_TOKEN_EXPIRE_HOURS",
            auth.refresh_token_expire_hours,
            MAX_REFRESH_TOKEN_EXPIRE_HOURS,
        ),
    ] {
        if value > max {
            return Err(ConfigLoadError::invalid(key, value, format!("must be at most {max}")));
        }
    }
    if auth.username.trim().is_empty() {
        return Err(ConfigLoadError::invalid("AUTH_USERNAME", "", "must not be empty"));
    }
    if auth.password.is_empty() {
        return Err(ConfigLoadError::invalid("AUTH_PASSWORD", "", "must not be empty"));
    }

    if auth.secret_key == DEFAULT_SECRET_KEY {
        warnings.push_with_hint(
            "SECRET_KEY not set; tokens are signed with the built-in development key",
            "Set SECRET_KEY to a random value of at least 32 bytes",
        );
    } else if auth.secret_key.len() < MIN_SECRET_LEN {
        warnings.push(format!("SECRET_KEY is shorter than {MIN_SECRET_LEN} bytes"));
    }

    if auth.username == DEFAULT_USERNAME && auth.password == DEFAULT_PASSWORD {
        warnings.push_with_hint(
            "Using the default admin credentials",
            "Set AUTH_USERNAME and AUTH_PASSWORD",
        );
    }

    if scan.job_retention_seconds == 0 {
        warnings.push("JOB_RETENTION_SECONDS is 0; finished jobs are kept forever");
    }

    Ok(warnings)
}
