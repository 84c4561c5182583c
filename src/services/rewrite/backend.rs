// Rewrite Backend
// Seam between the retry engine and whatever proposes sentence rewrites

use super::candidate::RewriteCandidate;
use crate::models::{AcademicLevel, Language};
use crate::services::citations::ProtectedSpans;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// Transport trouble, throttling and server errors may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::MissingContent => false,
        }
    }
}

/// One sentence-level rewrite request. Owned so it can move into worker tasks.
#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub sentence_index: usize,
    pub text: String,
    /// Protected spans relative to `text`; empty when rewriting is unconstrained.
    pub protected: ProtectedSpans,
    pub language: Option<Language>,
    pub level: AcademicLevel,
    /// 0-based; higher attempts ask for progressively milder rewrites.
    pub attempt: u32,
}

#[async_trait]
pub trait RewriteBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the backend has nothing to change at this attempt's intensity.
    async fn rewrite(&self, request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(BackendError::Api { status: 429, message: String::new() }.is_transient());
        assert!(BackendError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!BackendError::Api { status: 401, message: String::new() }.is_transient());
        assert!(!BackendError::MissingContent.is_transient());
    }
}
