// Sentence Scorer
// Soft-threshold (sigmoid) features accumulated in logit space

use super::features::SentenceFeatures;
use crate::services::lexicon::CompiledLexicon;
use serde::Serialize;

const BIAS: f64 = -1.2;
const TARGET_SENTENCE_WORDS: f64 = 24.0;
const SHORT_SENTENCE_WORDS: usize = 8;

/// Feature families that push a sentence towards (positive) or away from
/// (negative) machine authorship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    MarkerPhrases,
    LexicalRepetition,
    FunctionWordProfile,
    PunctuationUniformity,
    SentenceLength,
    ClauseUniformity,
}

impl Signal {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MarkerPhrases => "formulaic transition and marker phrases",
            Self::LexicalRepetition => "low lexical variety",
            Self::FunctionWordProfile => "a function-word rate close to typical model output",
            Self::PunctuationUniformity => "uniform punctuation",
            Self::SentenceLength => "evenly sized mid-length sentences",
            Self::ClauseUniformity => "regular clause rhythm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SentenceScore {
    /// Probability in [0, 1].
    pub probability: f64,
    /// Logit contribution per signal; empty for scorers that do not explain themselves.
    pub signals: Vec<(Signal, f64)>,
}

/// Pluggable per-sentence scoring. Implementations must be pure: the same
/// features always give the same score.
pub trait ScoringFunction: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, features: &SentenceFeatures, lexicon: &CompiledLexicon) -> SentenceScore;
}

// ============================================================================
// Soft threshold functions
// ============================================================================

/// Sigmoid falling around `center`; `k` controls steepness (smaller = steeper).
#[inline]
fn sigmoid(x: f64, center: f64, k: f64) -> f64 {
    1.0 / (1.0 + ((x - center) / k).exp())
}

/// Gaussian bump of height 1 at `center`.
#[inline]
fn gaussian(x: f64, center: f64, width: f64) -> f64 {
    (-((x - center) / width).powi(2)).exp()
}

#[inline]
fn from_logit(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Default heuristic scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogitScorer;

impl LogitScorer {
    pub fn contributions(features: &SentenceFeatures, lexicon: &CompiledLexicon) -> Vec<(Signal, f64)> {
        let m = &features.metrics;
        let mut out = Vec::with_capacity(6);

        // Saturating: the second marker adds less than the first.
        let markers = 2.4 * (1.0 - (-(m.marker_count as f64)).exp());
        out.push((Signal::MarkerPhrases, markers));

        // Low variety and repeated word trigrams both read as repetition.
        let repetition = 0.8 * sigmoid(m.ttr, 0.72, 0.06) + 1.2 * m.ngram_repeat_rate.min(0.5);
        out.push((Signal::LexicalRepetition, repetition));

        let typical = lexicon.lexicon.typical_function_ratio;
        let fw = if typical > 0.0 {
            0.5 * gaussian(m.function_word_ratio, typical, 0.08) - 0.25
        } else {
            0.0
        };
        out.push((Signal::FunctionWordProfile, fw));

        out.push((Signal::PunctuationUniformity, 0.6 * (1.0 - m.punctuation_variety) - 0.3));

        let length = if m.word_count < SHORT_SENTENCE_WORDS {
            -0.5
        } else {
            0.9 * gaussian(m.word_count as f64, TARGET_SENTENCE_WORDS, 9.0) - 0.3
        };
        out.push((Signal::SentenceLength, length));

        let clauses = if m.comma_rate > 0.0 {
            0.4 * (1.0 - m.clause_cv.min(1.0))
        } else {
            0.0
        };
        out.push((Signal::ClauseUniformity, clauses));

        out
    }
}

impl ScoringFunction for LogitScorer {
    fn name(&self) -> &'static str {
        "logit-heuristic"
    }

    fn score(&self, features: &SentenceFeatures, lexicon: &CompiledLexicon) -> SentenceScore {
        let signals = Self::contributions(features, lexicon);
        let logit = BIAS + signals.iter().map(|(_, v)| v).sum::<f64>();
        SentenceScore {
            probability: from_logit(logit).clamp(0.02, 0.98),
            signals,
        }
    }
}

/// Scores every sentence with the same probability. Used to pin detection in
/// calibration runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct ConstantScorer(pub f64);

impl ScoringFunction for ConstantScorer {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn score(&self, _features: &SentenceFeatures, _lexicon: &CompiledLexicon) -> SentenceScore {
        SentenceScore {
            probability: self.0.clamp(0.0, 1.0),
            signals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, Sentence};
    use crate::services::citations::ProtectedSpans;
    use crate::services::detection::features::extract_features;
    use crate::services::text_processor::StylometryMetrics;
    use crate::services::lexicon::compiled;

    fn score(text: &str) -> f64 {
        let lex = compiled(Some(Language::En));
        let s = Sentence {
            index: 0,
            start_offset: 0,
            end_offset: text.len(),
            raw_text: text.to_string(),
        };
        LogitScorer.score(&extract_features(&s, &ProtectedSpans::none(), lex), lex).probability
    }

    #[test]
    fn test_scores_are_clamped() {
        let p = score("Ok so I tried it.");
        assert!((0.02..=0.98).contains(&p));
    }

    #[test]
    fn test_marker_heavy_sentence_scores_higher() {
        let formulaic = score(
            "Furthermore, it is important to note that this comprehensive framework plays a crucial role in fostering robust and seamless collaboration across the research landscape.",
        );
        let plain = score(
            "We ran the survey twice in March, and honestly the second batch was a mess because half the forms came back blank.",
        );
        assert!(formulaic > plain, "formulaic={} plain={}", formulaic, plain);
        assert!(formulaic > 0.6);
    }

    fn repetition(metrics: StylometryMetrics) -> f64 {
        let features = SentenceFeatures {
            index: 0,
            masked_text: String::new(),
            metrics,
            scorable: true,
        };
        LogitScorer::contributions(&features, compiled(Some(Language::En)))
            .into_iter()
            .find(|(signal, _)| *signal == Signal::LexicalRepetition)
            .map(|(_, v)| v)
            .unwrap()
    }

    #[test]
    fn test_repeated_trigrams_raise_repetition() {
        let base = StylometryMetrics {
            word_count: 18,
            ttr: 0.8,
            ..StylometryMetrics::default()
        };
        let repeated = StylometryMetrics {
            ngram_repeat_rate: 0.25,
            ..base.clone()
        };
        assert!(repetition(repeated) > repetition(base) + 0.2);
    }

    #[test]
    fn test_constant_scorer_reports_no_signals() {
        let lex = compiled(None);
        let s = Sentence {
            index: 0,
            start_offset: 0,
            end_offset: 3,
            raw_text: "abc".to_string(),
        };
        let out = ConstantScorer(0.95).score(&extract_features(&s, &ProtectedSpans::none(), lex), lex);
        assert_eq!(out.probability, 0.95);
        assert!(out.signals.is_empty());
    }
}
