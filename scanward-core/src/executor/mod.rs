//! Running the external scanner.

mod nmap;
pub mod xml;

use std::time::Duration;

use async_trait::async_trait;
use scanward_model::ScanOutcome;

pub use nmap::NmapExecutor;

/// Everything needed to launch one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInvocation {
    pub target: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ScanInvocation {
    pub fn new(target: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            args,
            timeout,
        }
    }
}

/// Runs a scan to completion and reports what happened.
///
/// Implementations never fail: timeouts, launch errors and scanner failures
/// are all folded into the returned [`ScanOutcome`].
#[async_trait]
pub trait ScanExecutor: Send + Sync + std::fmt::Debug {
    async fn run(&self, invocation: &ScanInvocation) -> ScanOutcome;
}
