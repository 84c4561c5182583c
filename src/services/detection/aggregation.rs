// Aggregation Logic
// Combines sentence scores into the document probability, confidence and analysis text

use super::scorer::{SentenceScore, Signal};
use std::collections::HashMap;

/// Words needed before confidence approaches its ceiling.
const CONFIDENCE_WORD_SCALE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub index: usize,
    /// Unprotected word count; 0 for sentences excluded from scoring.
    pub weight: f64,
    pub score: SentenceScore,
}

impl ScoredSentence {
    pub fn scorable(&self) -> bool {
        self.weight > 0.0
    }

    pub fn probability(&self) -> f64 {
        self.score.probability
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentScore {
    /// Length-weighted mean sentence probability, in [0, 100].
    pub ai_probability: f64,
    /// In [0, 100].
    pub confidence: f64,
    pub scored: usize,
    pub skipped: usize,
    /// Signals ordered by weighted contribution, strongest first.
    pub dominant: Vec<Signal>,
}

impl DocumentScore {
    pub fn empty(skipped: usize) -> Self {
        Self {
            ai_probability: 0.0,
            confidence: 0.0,
            scored: 0,
            skipped,
            dominant: Vec::new(),
        }
    }
}

pub fn aggregate(sentences: &[ScoredSentence]) -> DocumentScore {
    let scorable: Vec<&ScoredSentence> = sentences.iter().filter(|s| s.scorable()).collect();
    let skipped = sentences.len() - scorable.len();
    if scorable.is_empty() {
        return DocumentScore::empty(skipped);
    }

    let total_weight: f64 = scorable.iter().map(|s| s.weight).sum();
    let mean = scorable
        .iter()
        .map(|s| s.probability() * s.weight)
        .sum::<f64>()
        / total_weight;

    let probs: Vec<f64> = scorable.iter().map(|s| s.probability()).collect();
    let agreement = 1.0 - (2.0 * std_dev(&probs)).min(1.0);
    let coverage = 1.0 - (-total_weight / CONFIDENCE_WORD_SCALE).exp();
    let confidence = 100.0 * coverage * (0.55 + 0.45 * agreement);

    // Rank signals by their weighted positive contribution.
    let mut totals: HashMap<Signal, f64> = HashMap::new();
    for s in &scorable {
        for (signal, value) in &s.score.signals {
            if *value > 0.0 {
                *totals.entry(*signal).or_insert(0.0) += value * s.weight;
            }
        }
    }
    let mut ranked: Vec<(Signal, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let dominant = ranked
        .into_iter()
        .filter(|(_, v)| *v / total_weight >= 0.1)
        .take(3)
        .map(|(s, _)| s)
        .collect();

    DocumentScore {
        ai_probability: (100.0 * mean).clamp(0.0, 100.0),
        confidence: confidence.clamp(0.0, 100.0),
        scored: scorable.len(),
        skipped,
        dominant,
    }
}

/// Human-readable summary reported as `analysis`.
pub fn describe(doc: &DocumentScore, flagged: usize) -> String {
    if doc.scored == 0 {
        return "No scorable prose found; citations, references and very short fragments are not assessed."
            .to_string();
    }

    let band = match doc.ai_probability {
        p if p >= 70.0 => "high",
        p if p >= 40.0 => "moderate",
        _ => "low",
    };
    let mut out = format!(
        "Estimated {} likelihood of machine-generated text ({:.1}%) across {} scored sentence(s)",
        band, doc.ai_probability, doc.scored
    );
    if doc.skipped > 0 {
        out.push_str(&format!(", {} skipped as citations or fragments", doc.skipped));
    }
    out.push('.');

    if !doc.dominant.is_empty() {
        let names: Vec<&str> = doc.dominant.iter().map(|s| s.describe()).collect();
        out.push_str(&format!(" Strongest signals: {}.", names.join("; ")));
    }
    if flagged > 0 {
        out.push_str(&format!(" {} sentence(s) flagged for revision.", flagged));
    }
    out
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
