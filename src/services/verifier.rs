// Meaning Verifier
// Scores how much of a sentence's content survives a rewrite (0-100)

use crate::models::Language;
use crate::services::lexicon::{compiled, CompiledLexicon};
use crate::services::text_processor::{char_bigrams, lowercase_words, normalize_punctuation, words};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const LEXICAL_WEIGHT: f64 = 0.45;
const STRUCTURAL_WEIGHT: f64 = 0.30;
const ANCHOR_WEIGHT: f64 = 0.25;

/// Below this function-word rate the drift guard is not meaningful.
const DRIFT_MIN_SOURCE_RATIO: f64 = 0.1;
const DRIFT_RETAINED_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FidelityReport {
    pub score: f64,
    pub lexical: f64,
    pub structural: f64,
    pub anchors: f64,
    pub language_drift: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MeaningVerifier {
    pub threshold: f64,
}

impl Default for MeaningVerifier {
    fn default() -> Self {
        Self { threshold: 70.0 }
    }
}

impl MeaningVerifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn accepts(&self, report: &FidelityReport) -> bool {
        report.score >= self.threshold
    }

    pub fn verify(&self, original: &str, candidate: &str, language: Option<Language>) -> FidelityReport {
        fidelity(original, candidate, compiled(language))
    }
}

pub fn fidelity(original: &str, candidate: &str, lex: &CompiledLexicon) -> FidelityReport {
    if normalize_punctuation(original) == normalize_punctuation(candidate) {
        return FidelityReport {
            score: 100.0,
            lexical: 1.0,
            structural: 1.0,
            anchors: 1.0,
            language_drift: false,
        };
    }

    let orig_tokens = lowercase_words(original);
    let cand_tokens = lowercase_words(candidate);

    let lexical = token_f1(&orig_tokens, &cand_tokens);
    let structural = 0.6 * bigram_dice(original, candidate) + 0.4 * length_ratio(original, candidate);

    let mut anchors = anchor_retention(original, candidate);
    if negation_count(&orig_tokens, lex) != negation_count(&cand_tokens, lex) {
        anchors *= 0.5;
    }

    let language_drift = drifted(&orig_tokens, &cand_tokens, lex);
    let score = if language_drift {
        0.0
    } else {
        (100.0 * (LEXICAL_WEIGHT * lexical + STRUCTURAL_WEIGHT * structural + ANCHOR_WEIGHT * anchors))
            .clamp(0.0, 100.0)
    };

    FidelityReport {
        score,
        lexical,
        structural,
        anchors,
        language_drift,
    }
}

/// Length-weighted document fidelity over `(weight, score)` pairs.
pub fn document_fidelity(parts: &[(f64, f64)]) -> f64 {
    let total: f64 = parts.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return 100.0;
    }
    let weighted: f64 = parts.iter().map(|(w, s)| w * s).sum();
    (weighted / total).clamp(0.0, 100.0)
}

fn counts(tokens: &[String]) -> HashMap<&str, usize> {
    let mut out = HashMap::new();
    for t in tokens {
        *out.entry(t.as_str()).or_insert(0) += 1;
    }
    out
}

fn token_f1(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let ca = counts(a);
    let cb = counts(b);
    let overlap: usize = ca
        .iter()
        .map(|(k, v)| (*v).min(cb.get(k).copied().unwrap_or(0)))
        .sum();
    if overlap == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / b.len() as f64;
    let recall = overlap as f64 / a.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

fn bigram_dice(a: &str, b: &str) -> f64 {
    let ba = char_bigrams(a);
    let bb = char_bigrams(b);
    let size_a: usize = ba.values().sum();
    let size_b: usize = bb.values().sum();
    if size_a + size_b == 0 {
        return 1.0;
    }
    let shared: usize = ba
        .iter()
        .map(|(k, v)| (*v).min(bb.get(k).copied().unwrap_or(0)))
        .sum();
    2.0 * shared as f64 / (size_a + size_b) as f64
}

fn length_ratio(a: &str, b: &str) -> f64 {
    let la = normalize_punctuation(a).chars().count() as f64;
    let lb = normalize_punctuation(b).chars().count() as f64;
    if la.max(lb) == 0.0 {
        return 1.0;
    }
    la.min(lb) / la.max(lb)
}

/// Numbers, acronyms and capitalized words past the first position.
fn anchors(text: &str) -> HashSet<String> {
    words(text)
        .into_iter()
        .enumerate()
        .filter(|(i, w)| {
            let has_digit = w.chars().any(|c| c.is_ascii_digit());
            let uppercase = w.chars().filter(|c| c.is_uppercase()).count();
            let acronym = uppercase >= 2 && w.chars().all(|c| !c.is_lowercase());
            let proper = *i > 0 && w.chars().next().is_some_and(|c| c.is_uppercase());
            has_digit || acronym || proper
        })
        .map(|(_, w)| w.to_string())
        .collect()
}

fn anchor_retention(original: &str, candidate: &str) -> f64 {
    let source = anchors(original);
    if source.is_empty() {
        return 1.0;
    }
    let kept: HashSet<&str> = words(candidate).into_iter().collect();
    let retained = source.iter().filter(|a| kept.contains(a.as_str())).count();
    retained as f64 / source.len() as f64
}

fn negation_count(tokens: &[String], lex: &CompiledLexicon) -> usize {
    tokens
        .iter()
        .filter(|t| lex.negations.contains(t.as_str()) || t.ends_with("n't") || t.ends_with("n’t"))
        .count()
}

fn function_ratio(tokens: &[String], lex: &CompiledLexicon) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    tokens
        .iter()
        .filter(|t| lex.function_words.contains(t.as_str()))
        .count() as f64
        / tokens.len() as f64
}

/// The candidate no longer reads like the source language.
fn drifted(orig: &[String], cand: &[String], lex: &CompiledLexicon) -> bool {
    let source = function_ratio(orig, lex);
    source > DRIFT_MIN_SOURCE_RATIO && function_ratio(cand, lex) < DRIFT_RETAINED_SHARE * source
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en(original: &str, candidate: &str) -> FidelityReport {
        MeaningVerifier::default().verify(original, candidate, Some(Language::En))
    }

    #[test]
    fn test_identical_text_scores_full() {
        let r = en("The data agree.", "The  data agree.");
        assert_eq!(r.score, 100.0);
    }

    #[test]
    fn test_transition_swap_keeps_high_fidelity() {
        let r = en(
            "Furthermore, AI has transformed research (Smith, 2020).",
            "Also, AI has transformed research (Smith, 2020).",
        );
        assert!(r.score > 85.0 && r.score < 95.0, "score={}", r.score);
        assert_eq!(r.anchors, 1.0);
        assert!(MeaningVerifier::default().accepts(&r));
    }

    #[test]
    fn test_dropped_numbers_lower_anchors() {
        let r = en("Accuracy rose to 94% in 2021 at MIT.", "Accuracy rose a lot recently.");
        assert!(r.anchors < 0.5);
        assert!(r.score < 70.0);
    }

    #[test]
    fn test_negation_flip_halves_anchors() {
        let r = en("The effect was significant.", "The effect was not significant.");
        assert_eq!(r.anchors, 0.5);
    }

    #[test]
    fn test_translation_is_caught_as_drift() {
        let r = en(
            "The results of the study are consistent with the model.",
            "Die Ergebnisse der Studie stimmen mit dem Modell überein.",
        );
        assert!(r.language_drift);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn test_document_fidelity_weights_by_length() {
        assert_eq!(document_fidelity(&[]), 100.0);
        let score = document_fidelity(&[(10.0, 100.0), (30.0, 80.0)]);
        assert!((score - 85.0).abs() < 1e-9);
    }
}
