// Flag Selection
// Sensitivity influences the flag floor and gating, not raw probabilities.

use super::aggregation::{std_dev, ScoredSentence};
use crate::models::DetectionSensitivity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
    pub floor_low: f64,
    pub floor_medium: f64,
    pub floor_high: f64,
    /// At most this share of scorable sentences is flagged.
    pub max_flag_ratio: f64,
    /// Documents at or below this probability (0-100) are neither flagged nor rewritten.
    pub humanize_min_probability: f64,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            floor_low: 0.70,
            floor_medium: 0.60,
            floor_high: 0.50,
            max_flag_ratio: 0.6,
            humanize_min_probability: 30.0,
        }
    }
}

impl DetectionPolicy {
    pub fn floor(&self, sensitivity: DetectionSensitivity) -> f64 {
        match sensitivity {
            DetectionSensitivity::Low => self.floor_low,
            DetectionSensitivity::Medium => self.floor_medium,
            DetectionSensitivity::High => self.floor_high,
        }
    }

    pub fn passes_gate(&self, ai_probability: f64) -> bool {
        ai_probability > self.humanize_min_probability
    }
}

/// Indices (ascending) of sentences to flag.
pub fn select_flagged(
    sentences: &[ScoredSentence],
    ai_probability: f64,
    sensitivity: DetectionSensitivity,
    policy: &DetectionPolicy,
) -> Vec<usize> {
    if !policy.passes_gate(ai_probability) {
        return Vec::new();
    }

    let scorable: Vec<&ScoredSentence> = sentences.iter().filter(|s| s.scorable()).collect();
    if scorable.is_empty() {
        return Vec::new();
    }

    let probs: Vec<f64> = scorable.iter().map(|s| s.probability()).collect();
    let mean = probs.iter().sum::<f64>() / probs.len() as f64;
    let max = probs.iter().cloned().fold(f64::MIN, f64::max);
    let floor = policy.floor(sensitivity);

    // Outliers above the document's own level, but never above the top score
    // so a uniformly high document still gets flags.
    let threshold = (mean + std_dev(&probs)).max(floor).min(max);

    let mut candidates: Vec<&ScoredSentence> = scorable
        .into_iter()
        .filter(|s| s.probability() >= threshold && s.probability() >= floor)
        .collect();

    let cap = ((policy.max_flag_ratio * probs.len() as f64).ceil() as usize).max(1);
    if candidates.len() > cap {
        candidates.sort_by(|a, b| {
            b.probability()
                .partial_cmp(&a.probability())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        candidates.truncate(cap);
    }

    let mut indices: Vec<usize> = candidates.into_iter().map(|s| s.index).collect();
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::scorer::SentenceScore;

    fn scored(index: usize, p: f64) -> ScoredSentence {
        ScoredSentence {
            index,
            weight: 10.0,
            score: SentenceScore {
                probability: p,
                signals: vec![],
            },
        }
    }

    #[test]
    fn test_floors_order() {
        let policy = DetectionPolicy::default();
        assert!(policy.floor(DetectionSensitivity::Low) > policy.floor(DetectionSensitivity::Medium));
        assert!(policy.floor(DetectionSensitivity::Medium) > policy.floor(DetectionSensitivity::High));
    }

    #[test]
    fn test_gate_blocks_low_documents() {
        let sentences = vec![scored(0, 0.99), scored(1, 0.1)];
        let flagged = select_flagged(&sentences, 30.0, DetectionSensitivity::High, &DetectionPolicy::default());
        assert!(flagged.is_empty());
    }

    #[test]
    fn test_uniformly_high_document_is_flagged_and_capped() {
        let sentences: Vec<ScoredSentence> = (0..5).map(|i| scored(i, 0.95)).collect();
        let flagged = select_flagged(&sentences, 95.0, DetectionSensitivity::Medium, &DetectionPolicy::default());
        assert_eq!(flagged, vec![0, 1, 2]);
    }

    #[test]
    fn test_outliers_flagged_and_unscorable_ignored() {
        let mut sentences = vec![scored(0, 0.3), scored(1, 0.9), scored(2, 0.35), scored(3, 0.4)];
        sentences.push(ScoredSentence {
            index: 4,
            weight: 0.0,
            score: SentenceScore {
                probability: 0.98,
                signals: vec![],
            },
        });
        let flagged = select_flagged(&sentences, 55.0, DetectionSensitivity::Medium, &DetectionPolicy::default());
        assert_eq!(flagged, vec![1]);
    }

    #[test]
    fn test_sensitivity_changes_floor() {
        let sentences = vec![scored(0, 0.55), scored(1, 0.55)];
        let policy = DetectionPolicy::default();
        assert!(select_flagged(&sentences, 55.0, DetectionSensitivity::Medium, &policy).is_empty());
        assert_eq!(select_flagged(&sentences, 55.0, DetectionSensitivity::High, &policy), vec![0, 1]);
    }
}
