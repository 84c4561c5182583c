// Rewrite Candidates
// Sentence-relative byte edits and protected-span alignment

use crate::models::RewriteOperation;
use crate::services::citations::ProtectedSpans;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Byte range in the original sentence.
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("edit {start}..{end} is outside the sentence ({len} bytes)")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("edit {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: usize, end: usize },
    #[error("edits overlap at byte {0}")]
    Overlap(usize),
}

/// A proposed rewrite of one sentence: sorted, non-overlapping edits plus
/// the operations that produced them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewriteCandidate {
    pub edits: Vec<TextEdit>,
    pub operations: Vec<RewriteOperation>,
}

impl RewriteCandidate {
    pub fn new(mut edits: Vec<TextEdit>, operations: Vec<RewriteOperation>) -> Self {
        edits.sort_by_key(|e| (e.range.start, e.range.end));
        let mut ops: Vec<RewriteOperation> = Vec::with_capacity(operations.len());
        for op in operations {
            if !ops.contains(&op) {
                ops.push(op);
            }
        }
        Self { edits, operations: ops }
    }

    /// Replace the whole sentence.
    pub fn whole_sentence(original: &str, rewritten: impl Into<String>, op: RewriteOperation) -> Self {
        Self::new(vec![TextEdit::new(0..original.len(), rewritten)], vec![op])
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn validate(&self, original: &str) -> Result<(), CandidateError> {
        let mut last_end = 0usize;
        for (i, edit) in self.edits.iter().enumerate() {
            let Range { start, end } = edit.range;
            if start > end || end > original.len() {
                return Err(CandidateError::OutOfBounds {
                    start,
                    end,
                    len: original.len(),
                });
            }
            if !original.is_char_boundary(start) || !original.is_char_boundary(end) {
                return Err(CandidateError::NotCharBoundary { start, end });
            }
            if i > 0 && start < last_end {
                return Err(CandidateError::Overlap(start));
            }
            last_end = end;
        }
        Ok(())
    }

    pub fn apply(&self, original: &str) -> Result<String, CandidateError> {
        self.validate(original)?;
        let mut out = String::with_capacity(original.len());
        let mut cursor = 0usize;
        for edit in &self.edits {
            out.push_str(&original[cursor..edit.range.start]);
            out.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        out.push_str(&original[cursor..]);
        Ok(out)
    }

    /// True if any edit changes bytes inside a protected span.
    pub fn touches_protected(&self, original: &str, protected: &ProtectedSpans) -> bool {
        self.edits.iter().any(|edit| {
            let unchanged = original.get(edit.range.clone()) == Some(edit.replacement.as_str());
            !unchanged && protected.intersects(edit.range.clone())
        })
    }
}

/// Edits turning `original` into `rewritten` without touching `protected`
/// (sentence-relative). Each protected text must reappear verbatim and in
/// order in `rewritten`; the text between them becomes ordinary edits.
/// Returns `None` when a protected text was dropped or altered.
pub fn align_protected(original: &str, rewritten: &str, protected: &ProtectedSpans) -> Option<Vec<TextEdit>> {
    let mut edits = Vec::new();
    let mut orig_cursor = 0usize;
    let mut new_cursor = 0usize;

    for span in protected.spans() {
        let range = span.start_offset..span.end_offset;
        let needle = original.get(range.clone())?;
        if needle.is_empty() {
            continue;
        }
        let found = rewritten.get(new_cursor..)?.find(needle)? + new_cursor;
        push_gap(&mut edits, original, orig_cursor..range.start, &rewritten[new_cursor..found]);
        orig_cursor = range.end;
        new_cursor = found + needle.len();
    }
    push_gap(&mut edits, original, orig_cursor..original.len(), &rewritten[new_cursor..]);
    Some(edits)
}

fn push_gap(edits: &mut Vec<TextEdit>, original: &str, range: Range<usize>, replacement: &str) {
    if range.start > range.end {
        return;
    }
    if original.get(range.clone()) != Some(replacement) {
        edits.push(TextEdit::new(range, replacement));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sorted_edits() {
        let original = "Furthermore, we utilize data.";
        let candidate = RewriteCandidate::new(
            vec![TextEdit::new(16..23, "use"), TextEdit::new(0..11, "Also")],
            vec![RewriteOperation::TransitionVaried, RewriteOperation::VocabularySimplified],
        );
        assert_eq!(candidate.apply(original).unwrap(), "Also, we use data.");
    }

    #[test]
    fn test_overlap_and_bounds_rejected() {
        let original = "abcdef";
        let overlapping = RewriteCandidate::new(vec![TextEdit::new(0..3, "x"), TextEdit::new(2..4, "y")], vec![]);
        assert_eq!(overlapping.apply(original), Err(CandidateError::Overlap(2)));
        let out_of_bounds = RewriteCandidate::new(vec![TextEdit::new(4..9, "x")], vec![]);
        assert!(matches!(out_of_bounds.apply(original), Err(CandidateError::OutOfBounds { .. })));
        let split_char = RewriteCandidate::new(vec![TextEdit::new(1..2, "x")], vec![]);
        assert!(matches!(split_char.apply("é"), Err(CandidateError::NotCharBoundary { .. })));
    }

    #[test]
    fn test_touches_protected() {
        let original = "Results (Smith, 2020) hold.";
        let protected = ProtectedSpans::from_ranges(&[8..21]);
        let inside = RewriteCandidate::new(vec![TextEdit::new(9..14, "Jones")], vec![]);
        let outside = RewriteCandidate::new(vec![TextEdit::new(22..26, "stand")], vec![]);
        let boundary_insert = RewriteCandidate::new(vec![TextEdit::new(8..8, "see ")], vec![]);
        assert!(inside.touches_protected(original, &protected));
        assert!(!outside.touches_protected(original, &protected));
        assert!(!boundary_insert.touches_protected(original, &protected));
    }

    #[test]
    fn test_align_protected_keeps_citation_bytes() {
        let original = "AI has transformed research (Smith, 2020).";
        let rewritten = "AI has reshaped research (Smith, 2020).";
        let protected = ProtectedSpans::from_ranges(&[28..41]);
        let edits = align_protected(original, rewritten, &protected).unwrap();
        assert_eq!(edits, vec![TextEdit::new(0..28, "AI has reshaped research ")]);
        let candidate = RewriteCandidate::new(edits, vec![RewriteOperation::BackendRewrite]);
        assert_eq!(candidate.apply(original).unwrap(), rewritten);
        assert!(!candidate.touches_protected(original, &protected));
    }

    #[test]
    fn test_align_protected_rejects_altered_citation() {
        let original = "AI has transformed research (Smith, 2020).";
        let protected = ProtectedSpans::from_ranges(&[28..41]);
        assert!(align_protected(original, "AI changed research (Smith 2020).", &protected).is_none());
    }
}
