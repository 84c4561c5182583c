// Scholar Humanizer Data Models
// Request-scoped value objects shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Language ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Fr,
    It,
    Es,
    Pl,
    Tr,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::En,
        Language::De,
        Language::Fr,
        Language::It,
        Language::Es,
        Language::Pl,
        Language::Tr,
    ];

    /// Accepts bare codes and region-tagged codes ("en", "EN", "en-US", "pt_BR").
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "de" => Some(Self::De),
            "fr" => Some(Self::Fr),
            "it" => Some(Self::It),
            "es" => Some(Self::Es),
            "pl" => Some(Self::Pl),
            "tr" => Some(Self::Tr),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::It => "it",
            Self::Es => "es",
            Self::Pl => "pl",
            Self::Tr => "tr",
        }
    }
}

/// Language as requested: either one of the enumerated codes or an unknown tag
/// that is processed with the generic punctuation heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageTag {
    Supported(Language),
    Unsupported(String),
}

impl LanguageTag {
    pub fn parse(code: &str) -> Self {
        match Language::from_code(code) {
            Some(lang) => Self::Supported(lang),
            None => Self::Unsupported(code.trim().to_string()),
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            Self::Supported(lang) => Some(*lang),
            Self::Unsupported(_) => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Supported(lang) => lang.code(),
            Self::Unsupported(code) => code.as_str(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============ Pipeline Configuration ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    HighSchool,
    #[default]
    University,
    Phd,
}

impl AcademicLevel {
    pub fn from_str(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "high_school" | "highschool" => Some(Self::HighSchool),
            "university" => Some(Self::University),
            "phd" => Some(Self::Phd),
            _ => None,
        }
    }

    /// Column into per-level lexicon tables.
    pub fn index(&self) -> usize {
        match self {
            Self::HighSchool => 0,
            Self::University => 1,
            Self::Phd => 2,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::HighSchool => "plain vocabulary and short, direct sentences suitable for a high-school reader",
            Self::University => "a neutral undergraduate academic register",
            Self::Phd => "a formal, technical register suitable for doctoral-level writing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewriteScope {
    #[default]
    #[serde(alias = "flagged_only")]
    FlaggedOnly,
    #[serde(alias = "all_sentences")]
    AllSentences,
}

impl RewriteScope {
    pub fn from_str(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "flagged_only" | "flagged" => Some(Self::FlaggedOnly),
            "all_sentences" | "all" => Some(Self::AllSentences),
            _ => None,
        }
    }
}

/// Sensitivity influences the flag floor, not raw probabilities.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl DetectionSensitivity {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub preserve_citations: bool,
    #[serde(default)]
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub rewrite_scope: RewriteScope,
    #[serde(default)]
    pub sensitivity: DetectionSensitivity,
    /// Reject unknown language codes instead of degrading to the generic heuristic.
    #[serde(default)]
    pub strict_language: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preserve_citations: true,
            academic_level: AcademicLevel::University,
            rewrite_scope: RewriteScope::FlaggedOnly,
            sensitivity: DetectionSensitivity::Medium,
            strict_language: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub language: LanguageTag,
    pub config: PipelineConfig,
}

impl Document {
    pub fn new(text: impl Into<String>, language: &str, config: PipelineConfig) -> Self {
        Self {
            text: text.into(),
            language: LanguageTag::parse(language),
            config,
        }
    }
}

// ============ Text Structure ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub index: usize,
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start_offset: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end_offset: usize,
    pub raw_text: String,
}

impl Sentence {
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Parenthetical,
    Narrative,
    Numbered,
    Footnote,
    ReferenceList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedSpan {
    pub start_offset: usize,
    pub end_offset: usize,
    pub kind: CitationKind,
}

// ============ Detection ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub ai_probability: f64,
    pub confidence: f64,
    pub analysis: String,
    pub flagged_sentences: Vec<String>,
}

// ============ Humanization ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteOperation {
    TransitionVaried,
    FillerRemoved,
    VocabularySimplified,
    VocabularyNeutralized,
    VocabularyFormalized,
    SentenceSplit,
    BackendRewrite,
}

impl RewriteOperation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransitionVaried => "varied transition",
            Self::FillerRemoved => "removed filler phrase",
            Self::VocabularySimplified => "simplified vocabulary",
            Self::VocabularyNeutralized => "neutralized formulaic wording",
            Self::VocabularyFormalized => "formalized vocabulary",
            Self::SentenceSplit => "split long sentence",
            Self::BackendRewrite => "rephrased sentence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub sentence_index: usize,
    pub original: String,
    pub rewritten: String,
    pub operation_tags: Vec<RewriteOperation>,
}

impl ChangeRecord {
    /// Human-readable label reported in `changes_made`.
    pub fn label(&self) -> String {
        let ops = self
            .operation_tags
            .iter()
            .map(|op| op.label())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Sentence {}: {}", self.sentence_index + 1, ops)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanizedResult {
    pub original_text: String,
    pub humanized_text: String,
    pub changes_made: Vec<String>,
    pub meaning_preservation_score: f64,
    pub citations_preserved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub detection: DetectionResult,
    pub humanized: HumanizedResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes_accept_region_tags() {
        assert_eq!(Language::from_code("en-US"), Some(Language::En));
        assert_eq!(Language::from_code(" DE "), Some(Language::De));
        assert_eq!(Language::from_code("pt"), None);
        assert_eq!(LanguageTag::parse("xx"), LanguageTag::Unsupported("xx".to_string()));
    }

    #[test]
    fn test_pipeline_config_defaults_from_empty_json() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.preserve_citations);
    }

    #[test]
    fn test_scope_accepts_both_spellings() {
        let a: RewriteScope = serde_json::from_str("\"ALL_SENTENCES\"").unwrap();
        let b: RewriteScope = serde_json::from_str("\"all_sentences\"").unwrap();
        assert_eq!(a, RewriteScope::AllSentences);
        assert_eq!(b, RewriteScope::AllSentences);
    }

    #[test]
    fn test_change_record_label() {
        let record = ChangeRecord {
            sentence_index: 2,
            original: "Furthermore, x.".to_string(),
            rewritten: "Also, x.".to_string(),
            operation_tags: vec![RewriteOperation::TransitionVaried],
        };
        assert_eq!(record.label(), "Sentence 3: varied transition");
    }

    #[test]
    fn test_warnings_skipped_when_empty() {
        let response = AnalysisResponse {
            detection: DetectionResult {
                ai_probability: 0.0,
                confidence: 0.0,
                analysis: String::new(),
                flagged_sentences: vec![],
            },
            humanized: HumanizedResult {
                original_text: "a".to_string(),
                humanized_text: "a".to_string(),
                changes_made: vec![],
                meaning_preservation_score: 100.0,
                citations_preserved: true,
            },
            warnings: vec![],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("warnings"));
    }
}
