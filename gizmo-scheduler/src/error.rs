//! Error types for the schedulers.

/// Errors surfaced to callers of the schedulers.
///
/// Admission failures are returned synchronously from `enqueue`; execution
/// failures are stored as the request's result and collected by polling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Rate limit, try again in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request id already in use: {0}")]
    DuplicateRequestId(String),

    #[error("{0}")]
    ExecutionFailed(String),
}

impl SchedulerError {
    /// Whether the request was turned away before being queued.
    pub fn is_admission_failure(&self) -> bool {
        matches!(
            self,
            SchedulerError::RateLimited { .. } | SchedulerError::DuplicateRequestId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
