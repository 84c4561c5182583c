// Detection Module
// AI text detection core logic organized into specialized submodules:
// - features: per-sentence stylometry over unprotected text
// - scorer: pluggable sentence scoring (logit heuristic by default)
// - aggregation: document probability, confidence and analysis text
// - flagging: sensitivity floors and flag selection

pub mod aggregation;
pub mod features;
pub mod flagging;
pub mod scorer;

pub use aggregation::{aggregate, describe, DocumentScore, ScoredSentence};
pub use features::{extract_features, SentenceFeatures, MIN_SCORABLE_WORDS};
pub use flagging::{select_flagged, DetectionPolicy};
pub use scorer::{ConstantScorer, LogitScorer, ScoringFunction, SentenceScore, Signal};
