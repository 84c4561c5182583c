// Rule-Based Rewrite Backend
// Local, deterministic rewrites driven by the per-language lexicon

use super::backend::{BackendError, RewriteBackend, RewriteRequest};
use super::candidate::{RewriteCandidate, TextEdit};
use crate::models::{AcademicLevel, RewriteOperation};
use crate::services::citations::ProtectedSpans;
use crate::services::lexicon::{compiled, CompiledLexicon};
use crate::services::text_processor::{word_count, words};
use async_trait::async_trait;
use std::ops::Range;

/// Minimum words on each side of a semicolon before it is split.
const SPLIT_MIN_WORDS: usize = 4;

/// Which operations an attempt may use; later attempts are milder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Intensity {
    fillers: bool,
    vocabulary: bool,
    split: bool,
}

impl Intensity {
    fn for_attempt(attempt: u32) -> Self {
        match attempt {
            0 => Self { fillers: true, vocabulary: true, split: true },
            1 => Self { fillers: false, vocabulary: true, split: false },
            _ => Self { fillers: false, vocabulary: false, split: false },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedBackend;

#[async_trait]
impl RewriteBackend for RuleBasedBackend {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError> {
        Ok(propose(request))
    }
}

/// Collects non-overlapping edits that avoid protected spans.
struct EditSet<'a> {
    protected: &'a ProtectedSpans,
    edits: Vec<TextEdit>,
    operations: Vec<RewriteOperation>,
}

impl<'a> EditSet<'a> {
    fn new(protected: &'a ProtectedSpans) -> Self {
        Self {
            protected,
            edits: Vec::new(),
            operations: Vec::new(),
        }
    }

    fn is_free(&self, range: &Range<usize>) -> bool {
        let clear_of_protected = !self.protected.intersects(range.clone());
        let clear_of_edits = !self
            .edits
            .iter()
            .any(|e| range.start < e.range.end && e.range.start < range.end);
        clear_of_protected && clear_of_edits
    }

    fn push(&mut self, edit: TextEdit, op: RewriteOperation) -> bool {
        if !self.is_free(&edit.range) {
            return false;
        }
        self.edits.push(edit);
        self.operations.push(op);
        true
    }

    fn finish(self) -> Option<RewriteCandidate> {
        if self.edits.is_empty() {
            None
        } else {
            Some(RewriteCandidate::new(self.edits, self.operations))
        }
    }
}

pub fn propose(request: &RewriteRequest) -> Option<RewriteCandidate> {
    let lex = compiled(request.language);
    let text = request.text.as_str();
    let intensity = Intensity::for_attempt(request.attempt);
    let mut set = EditSet::new(&request.protected);

    vary_transition(text, lex, request.level, &mut set);
    if intensity.fillers {
        remove_fillers(text, lex, &mut set);
    }
    if intensity.vocabulary {
        adjust_vocabulary(text, lex, request.level, &mut set);
    }
    if intensity.split && request.level == AcademicLevel::HighSchool {
        split_at_semicolon(text, &mut set);
    }

    set.finish()
}

fn vary_transition(text: &str, lex: &CompiledLexicon, level: AcademicLevel, set: &mut EditSet<'_>) {
    for (re, rule) in &lex.transitions {
        let Some(m) = re.captures(text).and_then(|c| c.get(1)) else {
            continue;
        };
        let replacement = match_case(m.as_str(), rule.to[level.index()]);
        if replacement.eq_ignore_ascii_case(m.as_str()) {
            continue;
        }
        // "Beyond that, that ..." reads as a stutter.
        let last = replacement.split_whitespace().last().unwrap_or_default();
        if words(&text[m.end()..]).first().is_some_and(|next| next.eq_ignore_ascii_case(last)) {
            continue;
        }
        if set.push(TextEdit::new(m.range(), replacement), RewriteOperation::TransitionVaried) {
            return;
        }
    }
}

fn remove_fillers(text: &str, lex: &CompiledLexicon, set: &mut EditSet<'_>) {
    for re in &lex.fillers {
        for m in re.find_iter(text) {
            if m.start() == 0 {
                // Sentence-initial filler: the next word takes over the capital.
                let rest = &text[m.end()..];
                let Some(first) = rest.chars().next() else {
                    continue;
                };
                let capital: String = first.to_uppercase().collect();
                let range = 0..m.end() + first.len_utf8();
                set.push(TextEdit::new(range, capital), RewriteOperation::FillerRemoved);
            } else {
                set.push(TextEdit::new(m.range(), ""), RewriteOperation::FillerRemoved);
            }
        }
    }
}

fn adjust_vocabulary(text: &str, lex: &CompiledLexicon, level: AcademicLevel, set: &mut EditSet<'_>) {
    let op = match level {
        AcademicLevel::HighSchool => RewriteOperation::VocabularySimplified,
        AcademicLevel::University => RewriteOperation::VocabularyNeutralized,
        AcademicLevel::Phd => RewriteOperation::VocabularyFormalized,
    };
    for (re, rule) in &lex.vocabulary {
        let Some(target) = rule.to[level.index()] else {
            continue;
        };
        for m in re.find_iter(text) {
            let replacement = match_case(m.as_str(), target);
            if replacement == m.as_str() {
                continue;
            }
            set.push(TextEdit::new(m.range(), replacement), op);
        }
    }
}

fn split_at_semicolon(text: &str, set: &mut EditSet<'_>) {
    let Some(pos) = text.find("; ") else {
        return;
    };
    let (left, right) = (&text[..pos], &text[pos + 2..]);
    if word_count(left) < SPLIT_MIN_WORDS || word_count(right) < SPLIT_MIN_WORDS {
        return;
    }
    let Some(first) = right.chars().next() else {
        return;
    };
    if !first.is_lowercase() {
        return;
    }
    let capital: String = first.to_uppercase().collect();
    let range = pos..pos + 2 + first.len_utf8();
    set.push(TextEdit::new(range, format!(". {}", capital)), RewriteOperation::SentenceSplit);
}

/// Carry the source's leading capitalization over to the replacement.
fn match_case(source: &str, replacement: &str) -> String {
    let source_upper = source.chars().next().is_some_and(|c| c.is_uppercase());
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if source_upper => first.to_uppercase().chain(chars).collect(),
        Some(first) if !source_upper => first.to_lowercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}
