// Pipeline Orchestrator
// tokenize -> extract citations -> score -> flag -> rewrite (with retry) -> verify -> assemble

use crate::error::PipelineError;
use crate::models::{
    AcademicLevel, AnalysisResponse, ChangeRecord, DetectionResult, Document, HumanizedResult, LanguageTag,
    PipelineConfig, RewriteScope, Sentence,
};
use crate::services::citations::ProtectedSpans;
use crate::services::config_store::{AppConfig, BackendKind};
use crate::services::detection::{
    aggregate, describe, extract_features, select_flagged, DetectionPolicy, DocumentScore, LogitScorer,
    ScoredSentence, ScoringFunction,
};
use crate::services::lexicon::compiled;
use crate::services::providers::ChatCompletionBackend;
use crate::services::rewrite::{
    align_protected, BackendError, RewriteBackend, RewriteContext, RewriteEngine, RewritePolicy, RuleBasedBackend,
    SentenceJob, SentenceOutcome, SentenceState,
};
use crate::services::segmenter::{degraded_warning, segment, Segmentation};
use crate::services::text_processor::word_count;
use crate::services::verifier::document_fidelity;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything known about a document once detection has finished.
struct Analysis {
    segmentation: Segmentation,
    /// Sentence-relative protected spans, one entry per sentence.
    local: Vec<ProtectedSpans>,
    scored: Vec<ScoredSentence>,
    score: DocumentScore,
    flagged: Vec<usize>,
    warnings: Vec<String>,
}

impl Analysis {
    fn detection_result(&self) -> DetectionResult {
        DetectionResult {
            ai_probability: self.score.ai_probability,
            confidence: self.score.confidence,
            analysis: describe(&self.score, self.flagged.len()),
            flagged_sentences: self
                .flagged
                .iter()
                .map(|&i| self.segmentation.sentences[i].raw_text.clone())
                .collect(),
        }
    }
}

pub struct Pipeline {
    scorer: Arc<dyn ScoringFunction>,
    backend: Arc<dyn RewriteBackend>,
    detection: DetectionPolicy,
    rewrite: RewritePolicy,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::local()
    }
}

impl Pipeline {
    /// Heuristic scorer and the local rule-based rewriter.
    pub fn local() -> Self {
        Self {
            scorer: Arc::new(LogitScorer),
            backend: Arc::new(RuleBasedBackend),
            detection: DetectionPolicy::default(),
            rewrite: RewritePolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn RewriteBackend> = match (config.backend.kind, config.chat_api_key()) {
            (BackendKind::Chat, Some(key)) => Arc::new(ChatCompletionBackend::new(
                config.backend.url(),
                config.backend.model(),
                key,
                config.backend.proxy.as_deref(),
            )?),
            (BackendKind::Chat, None) => {
                warn!("[PIPELINE] chat backend selected without an API key, using rule-based rewrites");
                Arc::new(RuleBasedBackend)
            }
            (BackendKind::Local, _) => Arc::new(RuleBasedBackend),
        };
        Ok(Self {
            scorer: Arc::new(LogitScorer),
            backend,
            detection: config.detection.clone(),
            rewrite: config.rewrite.clone(),
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringFunction>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn RewriteBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_detection_policy(mut self, policy: DetectionPolicy) -> Self {
        self.detection = policy;
        self
    }

    pub fn with_rewrite_policy(mut self, policy: RewritePolicy) -> Self {
        self.rewrite = policy;
        self
    }

    /// Stages through flag selection only.
    pub async fn detect(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<(DetectionResult, Vec<String>), PipelineError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("detect", request_id = %request_id);
        let analysis = self.analyze(document, cancel).instrument(span).await?;
        Ok((analysis.detection_result(), analysis.warnings))
    }

    /// Full run: detection plus the humanized rewrite.
    pub async fn run(&self, document: &Document, cancel: &CancellationToken) -> Result<AnalysisResponse, PipelineError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("pipeline", request_id = %request_id);
        self.run_inner(document, cancel).instrument(span).await
    }

    async fn run_inner(&self, document: &Document, cancel: &CancellationToken) -> Result<AnalysisResponse, PipelineError> {
        let started = Instant::now();
        let mut analysis = self.analyze(document, cancel).await?;
        let detection = analysis.detection_result();
        let config = &document.config;

        let selected = self.select_for_rewrite(&analysis, config.rewrite_scope);
        info!(
            "[PIPELINE] ai_probability={:.1} flagged={} selected={} scope={:?}",
            analysis.score.ai_probability,
            analysis.flagged.len(),
            selected.len(),
            config.rewrite_scope
        );

        let jobs: Vec<SentenceJob> = selected
            .iter()
            .map(|&i| SentenceJob {
                sentence: analysis.segmentation.sentences[i].clone(),
                protected: if config.preserve_citations {
                    analysis.local[i].clone()
                } else {
                    ProtectedSpans::none()
                },
            })
            .collect();

        let engine = RewriteEngine::new(self.backend.clone(), self.rewrite.clone());
        let ctx = RewriteContext {
            language: document.language.language(),
            level: config.academic_level,
        };
        let outcomes = engine.run(jobs, ctx, cancel).await?;

        let humanized = assemble(&document.text, &analysis, &outcomes);
        let degraded = outcomes.iter().filter(|o| o.backend_errors > 0 && o.accepted_text().is_none()).count();
        if degraded > 0 {
            analysis.warnings.push(format!(
                "{} sentence(s) were kept as written because the rewrite backend failed.",
                degraded
            ));
        }

        info!(
            "[PIPELINE] done changes={} fidelity={:.1} citations_preserved={} elapsed_ms={}",
            humanized.changes_made.len(),
            humanized.meaning_preservation_score,
            humanized.citations_preserved,
            started.elapsed().as_millis()
        );

        Ok(AnalysisResponse {
            detection,
            humanized,
            warnings: analysis.warnings,
        })
    }

    async fn analyze(&self, document: &Document, cancel: &CancellationToken) -> Result<Analysis, PipelineError> {
        validate(document)?;
        let text = document.text.as_str();
        let mut warnings = Vec::new();

        let segmentation = segment(text, &document.language);
        if segmentation.degraded {
            warnings.push(degraded_warning(document.language.code()));
        }

        let spans = ProtectedSpans::extract(text);
        let local: Vec<ProtectedSpans> = segmentation.sentences.iter().map(|s| spans.localize(s)).collect();

        let scored = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            scored = self.score_sentences(&segmentation.sentences, &local, &document.language) => scored?,
        };

        let score = aggregate(&scored);
        let flagged = select_flagged(&scored, score.ai_probability, document.config.sensitivity, &self.detection);
        info!(
            "[PIPELINE] scored sentences={} skipped={} spans={} scorer={}",
            score.scored,
            score.skipped,
            spans.len(),
            self.scorer.name()
        );

        Ok(Analysis {
            segmentation,
            local,
            scored,
            score,
            flagged,
            warnings,
        })
    }

    /// Scores sentences on blocking workers; returns once all are done, ordered by index.
    async fn score_sentences(
        &self,
        sentences: &[Sentence],
        local: &[ProtectedSpans],
        language: &LanguageTag,
    ) -> Result<Vec<ScoredSentence>, PipelineError> {
        let lang = language.language();
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        let chunk_size = sentences.len().div_ceil(workers).max(1);

        let mut join_set: JoinSet<Vec<ScoredSentence>> = JoinSet::new();
        let work: Vec<(Sentence, ProtectedSpans)> =
            sentences.iter().cloned().zip(local.iter().cloned()).collect();
        for chunk in work.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let scorer = self.scorer.clone();
            join_set.spawn_blocking(move || {
                let lexicon = compiled(lang);
                chunk
                    .iter()
                    .map(|(sentence, protected)| {
                        let features = extract_features(sentence, protected, lexicon);
                        let weight = features.weight();
                        let score = if features.scorable {
                            scorer.score(&features, lexicon)
                        } else {
                            Default::default()
                        };
                        ScoredSentence {
                            index: sentence.index,
                            weight,
                            score,
                        }
                    })
                    .collect()
            });
        }

        let mut scored = Vec::with_capacity(sentences.len());
        while let Some(res) = join_set.join_next().await {
            scored.extend(res?);
        }
        scored.sort_by_key(|s| s.index);
        Ok(scored)
    }

    fn select_for_rewrite(&self, analysis: &Analysis, scope: RewriteScope) -> Vec<usize> {
        if !self.detection.passes_gate(analysis.score.ai_probability) {
            return Vec::new();
        }
        match scope {
            RewriteScope::FlaggedOnly => analysis.flagged.clone(),
            RewriteScope::AllSentences => analysis
                .scored
                .iter()
                .filter(|s| s.scorable())
                .map(|s| s.index)
                .collect(),
        }
    }
}

fn validate(document: &Document) -> Result<(), PipelineError> {
    if document.text.trim().is_empty() {
        return Err(PipelineError::validation("text must not be empty"));
    }
    if document.config.strict_language {
        if let LanguageTag::Unsupported(code) = &document.language {
            return Err(PipelineError::validation(format!("unsupported language '{}'", code)));
        }
    }
    Ok(())
}

fn assemble(original: &str, analysis: &Analysis, outcomes: &[SentenceOutcome]) -> HumanizedResult {
    let sentences = &analysis.segmentation.sentences;
    let mut texts: Vec<String> = sentences.iter().map(|s| s.raw_text.clone()).collect();
    let mut fidelity: Vec<f64> = vec![100.0; sentences.len()];
    let mut changes = Vec::new();
    let mut citations_preserved = true;

    for outcome in outcomes {
        let SentenceState::Accepted {
            candidate,
            text,
            fidelity: score,
            ..
        } = &outcome.state
        else {
            continue;
        };
        let i = outcome.index;
        if align_protected(&outcome.original, text, &analysis.local[i]).is_none() {
            citations_preserved = false;
        }
        texts[i] = text.clone();
        fidelity[i] = *score;
        changes.push(ChangeRecord {
            sentence_index: i,
            original: outcome.original.clone(),
            rewritten: text.clone(),
            operation_tags: candidate.operations.clone(),
        });
    }

    let weighted: Vec<(f64, f64)> = sentences
        .iter()
        .zip(&fidelity)
        .map(|(s, f)| (word_count(&s.raw_text) as f64, *f))
        .collect();

    HumanizedResult {
        original_text: original.to_string(),
        humanized_text: analysis.segmentation.reassemble(&texts),
        changes_made: changes.iter().map(ChangeRecord::label).collect(),
        meaning_preservation_score: document_fidelity(&weighted),
        citations_preserved,
    }
}

/// Full pipeline with local backends and default policy.
pub async fn analyze_and_humanize(
    text: &str,
    language: &str,
    preserve_citations: bool,
    academic_level: AcademicLevel,
) -> Result<AnalysisResponse, PipelineError> {
    let config = PipelineConfig {
        preserve_citations,
        academic_level,
        ..PipelineConfig::default()
    };
    let document = Document::new(text, language, config);
    Pipeline::local().run(&document, &CancellationToken::new()).await
}

/// Blocking variant of [`analyze_and_humanize`] for callers without a runtime.
pub fn analyze_and_humanize_blocking(
    text: &str,
    language: &str,
    preserve_citations: bool,
    academic_level: AcademicLevel,
) -> Result<AnalysisResponse, PipelineError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| PipelineError::Internal(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(analyze_and_humanize(text, language, preserve_citations, academic_level))
}
