use thiserror::Error;

/// Top-level pipeline failures. Per-sentence backend trouble never surfaces here;
/// it degrades the affected sentence instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed request (empty text, unknown language under strict mode).
    #[error("{detail}")]
    Validation { detail: String },

    /// The caller cancelled the request; no partial result is produced.
    #[error("request cancelled")]
    Cancelled,

    /// A worker task panicked or was torn down unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            PipelineError::Cancelled
        } else {
            PipelineError::Internal(format!("worker task failed: {}", err))
        }
    }
}
