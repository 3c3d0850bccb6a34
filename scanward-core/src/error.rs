use thiserror::Error;

/// Reasons a scan submission is rejected before any job record exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("target is required")]
    EmptyTarget,

    #[error("max_seconds must be greater than zero")]
    InvalidTimeout,

    #[error("scan queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("scan workers are not running")]
    WorkersUnavailable,
}

impl SubmitError {
    /// Whether the caller sent a bad request, as opposed to the service
    /// being unable to take more work.
    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::EmptyTarget | SubmitError::InvalidTimeout)
    }
}
