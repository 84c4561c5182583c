// Feature Extraction
// Per-sentence stylometry over the unprotected part of the sentence

use crate::models::Sentence;
use crate::services::citations::ProtectedSpans;
use crate::services::lexicon::CompiledLexicon;
use crate::services::text_processor::{compute_stylometry, StylometryMetrics};

/// Sentences with fewer unprotected words than this are not scored.
pub const MIN_SCORABLE_WORDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SentenceFeatures {
    pub index: usize,
    /// Sentence text with protected ranges blanked out.
    pub masked_text: String,
    pub metrics: StylometryMetrics,
    pub scorable: bool,
}

impl SentenceFeatures {
    /// Length weight used in document aggregation.
    pub fn weight(&self) -> f64 {
        if self.scorable {
            self.metrics.word_count as f64
        } else {
            0.0
        }
    }
}

pub fn extract_features(
    sentence: &Sentence,
    protected: &ProtectedSpans,
    lexicon: &CompiledLexicon,
) -> SentenceFeatures {
    let masked_text = protected.mask(&sentence.raw_text);
    let metrics = compute_stylometry(&masked_text, lexicon);
    let scorable = metrics.word_count >= MIN_SCORABLE_WORDS;
    SentenceFeatures {
        index: sentence.index,
        masked_text,
        metrics,
        scorable,
    }
}
