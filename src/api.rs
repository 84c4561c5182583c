// API Boundary
// Request defaults, the detect / humanize / analyze operations and error mapping

use crate::error::PipelineError;
use crate::models::{
    AcademicLevel, AnalysisResponse, DetectionResult, DetectionSensitivity, Document, HumanizedResult, PipelineConfig,
    RewriteScope,
};
use crate::services::config_store::RequestDefaults;
use crate::services::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub preserve_citations: bool,
    #[serde(default)]
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub rewrite_scope: RewriteScope,
    #[serde(default)]
    pub sensitivity: DetectionSensitivity,
    #[serde(default)]
    pub strict_language: bool,
}

fn default_language() -> String { "en".to_string() }
fn default_true() -> bool { true }

impl AnalyzeRequest {
    /// Request for `text` carrying the configured defaults.
    pub fn new(text: impl Into<String>, defaults: &RequestDefaults) -> Self {
        Self {
            text: text.into(),
            language: defaults.language.clone(),
            preserve_citations: defaults.preserve_citations,
            academic_level: defaults.academic_level,
            rewrite_scope: defaults.rewrite_scope,
            sensitivity: defaults.sensitivity,
            strict_language: defaults.strict_language,
        }
    }

    pub fn into_document(self) -> Document {
        let config = PipelineConfig {
            preserve_citations: self.preserve_citations,
            academic_level: self.academic_level,
            rewrite_scope: self.rewrite_scope,
            sensitivity: self.sensitivity,
            strict_language: self.strict_language,
        };
        Document::new(self.text, &self.language, config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Error surfaced at the boundary: a status class plus a human-readable detail.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.detail.clone(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = if err.is_validation() { 422 } else { 500 };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    pub detection: DetectionResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HumanizeResponse {
    pub humanized: HumanizedResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn log_failure(operation: &str, err: PipelineError) -> ApiError {
    let err = ApiError::from(err);
    warn!("[API] {} failed status={} detail={}", operation, err.status, err.detail);
    err
}

pub async fn detect(
    pipeline: &Pipeline,
    request: AnalyzeRequest,
    cancel: &CancellationToken,
) -> Result<DetectResponse, ApiError> {
    info!("[API] detect chars={} language={}", request.text.chars().count(), request.language);
    let document = request.into_document();
    let (detection, warnings) = pipeline
        .detect(&document, cancel)
        .await
        .map_err(|e| log_failure("detect", e))?;
    Ok(DetectResponse { detection, warnings })
}

pub async fn humanize(
    pipeline: &Pipeline,
    request: AnalyzeRequest,
    cancel: &CancellationToken,
) -> Result<HumanizeResponse, ApiError> {
    info!("[API] humanize chars={} language={}", request.text.chars().count(), request.language);
    let document = request.into_document();
    let response = pipeline
        .run(&document, cancel)
        .await
        .map_err(|e| log_failure("humanize", e))?;
    Ok(HumanizeResponse {
        humanized: response.humanized,
        warnings: response.warnings,
    })
}

pub async fn analyze(
    pipeline: &Pipeline,
    request: AnalyzeRequest,
    cancel: &CancellationToken,
) -> Result<AnalysisResponse, ApiError> {
    info!("[API] analyze chars={} language={}", request.text.chars().count(), request.language);
    let document = request.into_document();
    pipeline
        .run(&document, cancel)
        .await
        .map_err(|e| log_failure("analyze", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_minimal_json() {
        let request: AnalyzeRequest = serde_json::from_str(r#"{"text": "Hello there."}"#).unwrap();
        assert_eq!(request.language, "en");
        assert!(request.preserve_citations);
        assert_eq!(request.academic_level, AcademicLevel::University);
        assert_eq!(request.rewrite_scope, RewriteScope::FlaggedOnly);
    }

    #[test]
    fn test_error_status_classes() {
        let validation = ApiError::from(PipelineError::validation("text must not be empty"));
        assert_eq!(validation.status, 422);
        assert!(validation.is_client_error());
        assert_eq!(
            serde_json::to_value(validation.body()).unwrap(),
            serde_json::json!({"detail": "text must not be empty"})
        );
        let internal = ApiError::from(PipelineError::Internal("boom".to_string()));
        assert_eq!(internal.status, 500);
        assert!(!internal.is_client_error());
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_at_boundary() {
        let request: AnalyzeRequest = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        let err = analyze(&Pipeline::local(), request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 422);
        assert_eq!(err.detail, "text must not be empty");
    }

    #[tokio::test]
    async fn test_humanize_returns_only_humanized_part() {
        let request = AnalyzeRequest::new("AI has transformed research (Smith, 2020).", &RequestDefaults::default());
        let response = humanize(&Pipeline::local(), request, &CancellationToken::new()).await.unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("detection").is_none());
        assert!(response.humanized.humanized_text.contains("(Smith, 2020)"));
    }
}
