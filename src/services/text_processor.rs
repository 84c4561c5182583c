// Text Processing Service
// Word tokenization and stylometry metrics

use crate::services::lexicon::CompiledLexicon;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\p{L}[\p{L}\p{M}'’-]*|\d+(?:[.,]\d+)*").expect("word regex")
    })
}

fn clause_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,;:—–()]").expect("clause regex"))
}

/// Fold typographic quotes, dashes and odd spaces so texts compare by content.
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text
        .replace(['\u{201c}', '\u{201d}', '\u{201e}', '«', '»'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{2014}', '\u{2013}'], "-")
        .replace(['\u{3000}', '\u{00A0}', '\u{202F}'], " ");

    // Collapse whitespace runs
    let mut out = String::with_capacity(s.len());
    let mut prev_ws = false;
    for ch in s.drain(..) {
        if ch.is_whitespace() {
            if !prev_ws {
                out.push(' ');
            }
            prev_ws = true;
        } else {
            out.push(ch);
            prev_ws = false;
        }
    }
    out.trim().to_string()
}

pub fn words(text: &str) -> Vec<&str> {
    word_re().find_iter(text).map(|m| m.as_str()).collect()
}

pub fn lowercase_words(text: &str) -> Vec<String> {
    words(text).into_iter().map(|w| w.to_lowercase()).collect()
}

pub fn word_count(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Per-sentence stylometry used by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StylometryMetrics {
    pub word_count: usize,
    pub ttr: f64,
    pub function_word_ratio: f64,
    /// Distinct punctuation marks divided by the number of marks the sentence could use.
    pub punctuation_variety: f64,
    pub comma_rate: f64,
    /// Coefficient of variation of clause lengths (in words).
    pub clause_cv: f64,
    pub ngram_repeat_rate: f64,
    pub marker_count: usize,
}

pub fn compute_stylometry(text: &str, lex: &CompiledLexicon) -> StylometryMetrics {
    let tokens = lowercase_words(text);
    let total_words = tokens.len();
    if total_words == 0 {
        return StylometryMetrics::default();
    }

    // Type-Token Ratio
    let unique: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
    let ttr = unique.len() as f64 / total_words as f64;

    let function_hits = tokens
        .iter()
        .filter(|t| lex.function_words.contains(t.as_str()))
        .count();
    let function_word_ratio = function_hits as f64 / total_words as f64;

    // Punctuation variety and comma rate
    let marks: Vec<char> = text
        .chars()
        .filter(|c| c.is_ascii_punctuation() || matches!(c, '—' | '–' | '…' | '“' | '”' | '„' | '«' | '»'))
        .collect();
    let distinct: HashSet<char> = marks.iter().copied().collect();
    let punctuation_variety = (distinct.len() as f64 / 4.0).min(1.0);
    let comma_rate = marks.iter().filter(|c| **c == ',').count() as f64 / total_words as f64;

    let clause_cv = clause_length_cv(text);

    let refs: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
    let ngram_rate = ngram_repeat_rate(&refs, 3);

    let marker_count = lex
        .markers
        .as_ref()
        .map(|re| re.find_iter(text).count())
        .unwrap_or(0);

    StylometryMetrics {
        word_count: total_words,
        ttr,
        function_word_ratio,
        punctuation_variety,
        comma_rate,
        clause_cv,
        ngram_repeat_rate: ngram_rate,
        marker_count,
    }
}

fn clause_length_cv(text: &str) -> f64 {
    let lengths: Vec<f64> = clause_break_re()
        .split(text)
        .map(|clause| word_count(clause) as f64)
        .filter(|n| *n > 0.0)
        .collect();
    if lengths.len() < 2 {
        return 0.0;
    }
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
    var.sqrt() / mean
}

pub fn ngram_repeat_rate(tokens: &[&str], n: usize) -> f64 {
    if n == 0 || tokens.len() < n + 1 {
        return 0.0;
    }
    let mut counts: HashMap<&[&str], usize> = HashMap::new();
    let mut total = 0usize;
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
        total += 1;
    }
    let repeats = counts.values().filter(|&&c| c >= 2).map(|&c| c - 1).sum::<usize>();
    repeats as f64 / total.max(1) as f64
}

/// Multiset of lowercase character bigrams over the normalized text.
pub fn char_bigrams(text: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = normalize_punctuation(text)
        .to_lowercase()
        .chars()
        .collect();
    let mut out = HashMap::new();
    for pair in chars.windows(2) {
        *out.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    out
}
