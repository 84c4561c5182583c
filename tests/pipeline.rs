use async_trait::async_trait;
use proptest::prelude::*;
use scholar_humanizer_lib::models::{AcademicLevel, Document, LanguageTag, PipelineConfig, RewriteScope};
use scholar_humanizer_lib::services::citations::ProtectedSpans;
use scholar_humanizer_lib::services::detection::ConstantScorer;
use scholar_humanizer_lib::services::rewrite::{
    BackendError, RewriteBackend, RewriteCandidate, RewritePolicy, RewriteRequest, TextEdit,
};
use scholar_humanizer_lib::services::segmenter::segment;
use scholar_humanizer_lib::{Pipeline, PipelineError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PAPER: &str = "Furthermore, large models utilize vast corpora (Brown et al., 2020). \
Moreover, it is important to note that evaluation remains difficult [3]. \
Smith (2019) argued that numerous benchmarks are already saturated.\n\n\
References\n\
Brown, T. et al. (2020). Language models are few-shot learners.\n\
Smith, J. (2019). Benchmarks revisited. Journal of AI.";

fn document(text: &str, scope: RewriteScope, level: AcademicLevel, preserve: bool) -> Document {
    Document::new(
        text,
        "en",
        PipelineConfig {
            preserve_citations: preserve,
            academic_level: level,
            rewrite_scope: scope,
            ..PipelineConfig::default()
        },
    )
}

fn pinned(probability: f64) -> Pipeline {
    Pipeline::local().with_scorer(Arc::new(ConstantScorer(probability)))
}

/// Every protected text of `before` reappears, in order, in `after`.
fn spans_survive(before: &str, after: &str) -> bool {
    let mut cursor = 0;
    for span in ProtectedSpans::extract(before).spans() {
        let needle = &before[span.start_offset..span.end_offset];
        match after[cursor..].find(needle) {
            Some(pos) => cursor += pos + needle.len(),
            None => return false,
        }
    }
    true
}

struct FailingBackend;

#[async_trait]
impl RewriteBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn rewrite(&self, _request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError> {
        Err(BackendError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })
    }
}

/// Bumps the year inside a citation; only reachable when rewriting is unconstrained.
struct YearBumper;

#[async_trait]
impl RewriteBackend for YearBumper {
    fn name(&self) -> &'static str {
        "year-bumper"
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError> {
        Ok(request.text.find("2020").map(|pos| {
            RewriteCandidate::new(vec![TextEdit::new(pos..pos + 4, "2021")], vec![])
        }))
    }
}

struct CountingBackend {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl RewriteBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn rewrite(&self, _request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn empty_text_is_a_validation_error() {
    let err = Pipeline::local()
        .run(&document("", RewriteScope::FlaggedOnly, AcademicLevel::University, true), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "text must not be empty");
}

#[tokio::test]
async fn citation_bytes_survive_rewrite() {
    let text = "AI has transformed research (Smith, 2020).";
    let response = pinned(0.95)
        .run(&document(text, RewriteScope::AllSentences, AcademicLevel::HighSchool, true), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.humanized.humanized_text.contains("(Smith, 2020)"));
    assert!(response.humanized.citations_preserved);
}

#[tokio::test]
async fn unconstrained_rewrite_reports_citation_change() {
    let text = "AI has transformed research (Smith, 2020).";
    let pipeline = pinned(0.95).with_backend(Arc::new(YearBumper));

    let free = pipeline
        .run(&document(text, RewriteScope::AllSentences, AcademicLevel::University, false), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(free.humanized.humanized_text, "AI has transformed research (Smith, 2021).");
    assert!(!free.humanized.citations_preserved);

    let guarded = pipeline
        .run(&document(text, RewriteScope::AllSentences, AcademicLevel::University, true), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(guarded.humanized.humanized_text, text);
    assert!(guarded.humanized.citations_preserved);
    assert!(guarded.humanized.changes_made.is_empty());
}

#[tokio::test]
async fn low_probability_document_is_left_alone() {
    let response = pinned(0.12)
        .run(&document(PAPER, RewriteScope::AllSentences, AcademicLevel::HighSchool, true), &CancellationToken::new())
        .await
        .unwrap();
    assert!((response.detection.ai_probability - 12.0).abs() < 1e-9);
    assert!(response.detection.flagged_sentences.is_empty());
    assert_eq!(response.humanized.humanized_text, PAPER);
    assert!(response.humanized.changes_made.is_empty());
}

#[tokio::test]
async fn very_high_probability_flags_something() {
    let response = pinned(0.97)
        .run(&document(PAPER, RewriteScope::FlaggedOnly, AcademicLevel::University, true), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.detection.ai_probability > 90.0);
    assert!(!response.detection.flagged_sentences.is_empty());
    for flagged in &response.detection.flagged_sentences {
        assert!(PAPER.contains(flagged.as_str()));
        assert!(!flagged.starts_with("Brown, T."), "reference entries are never flagged");
    }
}

#[tokio::test]
async fn rerun_on_own_output_keeps_protected_spans() {
    let first = pinned(0.95)
        .run(&document(PAPER, RewriteScope::AllSentences, AcademicLevel::Phd, true), &CancellationToken::new())
        .await
        .unwrap();
    assert!(first.humanized.citations_preserved);
    assert!(spans_survive(PAPER, &first.humanized.humanized_text));

    let input = first.humanized.humanized_text.clone();
    let second = pinned(0.95)
        .run(&document(&input, RewriteScope::FlaggedOnly, AcademicLevel::HighSchool, true), &CancellationToken::new())
        .await
        .unwrap();
    assert!(second.humanized.citations_preserved);
    assert!(spans_survive(&input, &second.humanized.humanized_text));
}

#[tokio::test]
async fn failing_backend_degrades_to_original() {
    let pipeline = pinned(0.95)
        .with_backend(Arc::new(FailingBackend))
        .with_rewrite_policy(RewritePolicy {
            retry_backoff_ms: 1,
            ..RewritePolicy::default()
        });
    let response = pipeline
        .run(&document(PAPER, RewriteScope::AllSentences, AcademicLevel::University, true), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.humanized.humanized_text, PAPER);
    assert!(response.humanized.changes_made.is_empty());
    assert_eq!(response.humanized.meaning_preservation_score, 100.0);
    assert!(response.warnings.iter().any(|w| w.contains("kept as written")));
}

#[tokio::test]
async fn backend_calls_respect_concurrency_limit() {
    let backend = Arc::new(CountingBackend {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let pipeline = pinned(0.95).with_backend(backend.clone()).with_rewrite_policy(RewritePolicy {
        max_concurrency: 2,
        max_retries: 0,
        ..RewritePolicy::default()
    });
    let text = "The first claim is here. The second claim is here. The third claim is here. \
The fourth claim is here. The fifth claim is here. The sixth claim is here.";
    pipeline
        .run(&document(text, RewriteScope::AllSentences, AcademicLevel::University, true), &CancellationToken::new())
        .await
        .unwrap();
    let peak = backend.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak={}", peak);
}

#[tokio::test]
async fn cancellation_discards_partial_results() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let pipeline = pinned(0.95).with_backend(Arc::new(CountingBackend {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    }));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        trigger.cancel();
    });
    let text = "The first claim is here. The second claim is here.";
    let result = pipeline
        .run(&document(text, RewriteScope::AllSentences, AcademicLevel::University, true), &cancel)
        .await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn segmentation_round_trips(text in "[A-Za-zÄÖÜäöüß0-9 .,;:!?\"'()\\[\\]«»„“”…\n-]{0,200}", lang in "(en|de|fr|it|es|pl|tr|xx)") {
        let seg = segment(&text, &LanguageTag::parse(&lang));
        prop_assert_eq!(seg.join(), text.clone());
        prop_assert_eq!(seg.separators.len(), seg.sentences.len() + 1);
        for s in &seg.sentences {
            prop_assert_eq!(&text[s.start_offset..s.end_offset], s.raw_text.as_str());
        }
    }

    #[test]
    fn scores_stay_in_bounds(text in "[A-Za-z ,.;()0-9]{1,160}[A-Za-z]") {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let response = runtime
            .block_on(Pipeline::local().run(
                &document(&text, RewriteScope::AllSentences, AcademicLevel::HighSchool, true),
                &CancellationToken::new(),
            ))
            .unwrap();
        let d = &response.detection;
        prop_assert!((0.0..=100.0).contains(&d.ai_probability));
        prop_assert!((0.0..=100.0).contains(&d.confidence));
        prop_assert!((0.0..=100.0).contains(&response.humanized.meaning_preservation_score));
        for flagged in &d.flagged_sentences {
            prop_assert!(text.contains(flagged.as_str()));
        }
        prop_assert!(response.humanized.citations_preserved);
    }
}
