// Citation Extractor
// Finds byte ranges (inline citations, reference list) that rewriting must not touch

use crate::models::{CitationKind, ProtectedSpan, Sentence};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::debug;

const YEAR: &str = r"(?:1[6-9]\d{2}|20\d{2})[a-z]?";

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\([^()]*?\p{{Lu}}[^()]*?\b{YEAR}\b[^()]*\)"
        ))
        .expect("parenthetical citation regex")
    })
}

fn narrative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\p{{Lu}}[\p{{L}}'’-]+(?:\s+(?:et\s+al\.|and|&|und|et|y|e|i|ve)(?:\s+\p{{Lu}}[\p{{L}}'’-]+)?)?\s*\({YEAR}(?:,\s*(?:p|pp|S)\.\s*\d+(?:[-–]\d+)?)?\)"
        ))
        .expect("narrative citation regex")
    })
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d+(?:\s*[-–,]\s*\d+)*\]").expect("numbered citation regex"))
}

fn footnote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[¹²³⁴⁵⁶⁷⁸⁹⁰]+|\^\d+|\[\^\d+\]").expect("footnote regex")
    })
}

fn reference_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t]*(?:\d+\.?[ \t]*)?(?:references|reference\s+list|bibliography|works\s+cited|literatur(?:verzeichnis)?|quellen(?:verzeichnis)?|bibliographie|références(?:\s+bibliographiques)?|referencias(?:\s+bibliográficas)?|bibliografía|bibliografia|riferimenti\s+bibliografici|kaynakça|kaynaklar|piśmiennictwo|literatura)[ \t]*:?[ \t]*\r?$",
        )
        .expect("reference heading regex")
    })
}

fn reference_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\[\d+\]|\d+[.)]\s|\p{Lu}[\p{L}'’-]+(?:,|\s+\p{Lu}\.|\s+et\s+al))")
            .expect("reference entry regex")
    })
}

/// Sorted, non-overlapping protected spans of one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectedSpans {
    spans: Vec<ProtectedSpan>,
}

impl ProtectedSpans {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn extract(text: &str) -> Self {
        let mut found: Vec<ProtectedSpan> = Vec::new();

        let patterns: [(&Regex, CitationKind); 4] = [
            (parenthetical_re(), CitationKind::Parenthetical),
            (narrative_re(), CitationKind::Narrative),
            (numbered_re(), CitationKind::Numbered),
            (footnote_re(), CitationKind::Footnote),
        ];
        for (re, kind) in patterns {
            found.extend(re.find_iter(text).map(|m| ProtectedSpan {
                start_offset: m.start(),
                end_offset: m.end(),
                kind,
            }));
        }

        if let Some(span) = reference_list(text) {
            found.push(span);
        }

        let spans = merge(found);
        debug!("[CITATIONS] extracted {} protected spans", spans.len());
        Self { spans }
    }

    pub fn spans(&self) -> &[ProtectedSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Parts of `range` that lie outside every protected span.
    pub fn clip(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let mut cursor = range.start;
        for span in &self.spans {
            if span.end_offset <= cursor {
                continue;
            }
            if span.start_offset >= range.end {
                break;
            }
            if span.start_offset > cursor {
                out.push(cursor..span.start_offset);
            }
            cursor = cursor.max(span.end_offset);
        }
        if cursor < range.end {
            out.push(cursor..range.end);
        }
        out
    }

    /// True when `range` overlaps a span. An empty range counts only when it
    /// falls strictly inside one, so insertions at a span boundary are allowed.
    pub fn intersects(&self, range: Range<usize>) -> bool {
        self.spans
            .iter()
            .any(|s| s.start_offset < range.end && range.start < s.end_offset)
    }

    /// `text` with every protected span replaced by a single space.
    pub fn mask(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0usize;
        for keep in self.clip(0..text.len()) {
            if keep.start > cursor {
                out.push(' ');
            }
            out.push_str(text.get(keep.clone()).unwrap_or_default());
            cursor = keep.end;
        }
        if cursor < text.len() {
            out.push(' ');
        }
        out
    }

    /// The spans intersecting `sentence`, cut to it and made sentence-relative.
    pub fn localize(&self, sentence: &Sentence) -> ProtectedSpans {
        let spans = self
            .spans
            .iter()
            .filter(|s| s.start_offset < sentence.end_offset && sentence.start_offset < s.end_offset)
            .map(|s| ProtectedSpan {
                start_offset: s.start_offset.max(sentence.start_offset) - sentence.start_offset,
                end_offset: s.end_offset.min(sentence.end_offset) - sentence.start_offset,
                kind: s.kind,
            })
            .collect();
        Self { spans }
    }

    #[cfg(test)]
    pub(crate) fn from_ranges(ranges: &[Range<usize>]) -> Self {
        let spans = ranges
            .iter()
            .map(|r| ProtectedSpan {
                start_offset: r.start,
                end_offset: r.end,
                kind: CitationKind::Parenthetical,
            })
            .collect();
        Self { spans: merge(spans) }
    }
}

fn merge(mut spans: Vec<ProtectedSpan>) -> Vec<ProtectedSpan> {
    spans.sort_by_key(|s| (s.start_offset, std::cmp::Reverse(s.end_offset)));
    let mut out: Vec<ProtectedSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match out.last_mut() {
            Some(last) if span.start_offset <= last.end_offset => {
                last.end_offset = last.end_offset.max(span.end_offset);
                if span.kind == CitationKind::ReferenceList {
                    last.kind = CitationKind::ReferenceList;
                }
            }
            _ => out.push(span),
        }
    }
    out
}

/// Heading plus the contiguous run of entry-like lines below it. Blank lines
/// inside the run are allowed; the first non-entry line ends it.
fn reference_list(text: &str) -> Option<ProtectedSpan> {
    let heading = reference_heading_re().find_iter(text).last()?;
    let mut end = heading.end();

    let mut cursor = heading.end();
    for line in text[heading.end()..].split_inclusive('\n') {
        let line_start = cursor;
        cursor += line.len();
        let content = line.trim_end();
        if content.trim().is_empty() {
            continue;
        }
        if !reference_entry_re().is_match(content) {
            break;
        }
        end = line_start + content.len();
    }

    Some(ProtectedSpan {
        start_offset: heading.start() + (heading.as_str().len() - heading.as_str().trim_start().len()),
        end_offset: end,
        kind: CitationKind::ReferenceList,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(text: &'a str, spans: &ProtectedSpans) -> Vec<&'a str> {
        spans
            .spans()
            .iter()
            .map(|s| &text[s.start_offset..s.end_offset])
            .collect()
    }

    #[test]
    fn test_parenthetical_and_narrative() {
        let text = "AI has transformed research (Smith, 2020). Jones et al. (2019) disagree (see Lee & Park, 2021a, p. 4).";
        let spans = ProtectedSpans::extract(text);
        assert_eq!(
            texts(text, &spans),
            vec!["(Smith, 2020)", "Jones et al. (2019)", "(see Lee & Park, 2021a, p. 4)"]
        );
    }

    #[test]
    fn test_numbered_and_footnotes() {
        let text = "Prior work [1], [2-4] and [5, 7] exists.³ See also^12 and[^3].";
        let spans = ProtectedSpans::extract(text);
        assert_eq!(
            texts(text, &spans),
            vec!["[1]", "[2-4]", "[5, 7]", "³", "^12", "[^3]"]
        );
    }

    #[test]
    fn test_plain_parentheses_are_not_citations() {
        let text = "The model (a transformer) was trained in 2020 (on GPUs).";
        assert!(ProtectedSpans::extract(text).is_empty());
    }

    #[test]
    fn test_reference_list_block() {
        let text = "Body text here.\n\nReferences\nSmith, J. (2020). Title. Journal.\n\nLee, K. (2019). Other.\nThis line is prose again.";
        let spans = ProtectedSpans::extract(text);
        let last = spans.spans().last().unwrap();
        assert_eq!(last.kind, CitationKind::ReferenceList);
        assert_eq!(
            &text[last.start_offset..last.end_offset],
            "References\nSmith, J. (2020). Title. Journal.\n\nLee, K. (2019). Other."
        );
    }

    #[test]
    fn test_localized_reference_heading() {
        let text = "Text.\n\nLiteraturverzeichnis\n[1] Müller, A. Buch. 2018.";
        let spans = ProtectedSpans::extract(text);
        let last = spans.spans().last().unwrap();
        assert_eq!(last.kind, CitationKind::ReferenceList);
        assert!(text[last.start_offset..].starts_with("Literaturverzeichnis"));
        assert_eq!(last.end_offset, text.len());
    }

    #[test]
    fn test_merge_adjacent_spans() {
        let merged = merge(vec![
            ProtectedSpan { start_offset: 5, end_offset: 10, kind: CitationKind::Numbered },
            ProtectedSpan { start_offset: 10, end_offset: 12, kind: CitationKind::Footnote },
            ProtectedSpan { start_offset: 0, end_offset: 3, kind: CitationKind::Numbered },
            ProtectedSpan { start_offset: 6, end_offset: 8, kind: CitationKind::Numbered },
        ]);
        let ranges: Vec<(usize, usize)> = merged.iter().map(|s| (s.start_offset, s.end_offset)).collect();
        assert_eq!(ranges, vec![(0, 3), (5, 12)]);
    }

    #[test]
    fn test_clip_removes_protected_bytes() {
        let text = "AI has transformed research (Smith, 2020).";
        let spans = ProtectedSpans::extract(text);
        assert_eq!(spans.clip(0..text.len()), vec![0..28, 41..42]);
        assert_eq!(spans.clip(30..35), Vec::<Range<usize>>::new());
        assert!(spans.intersects(27..29));
        assert!(!spans.intersects(0..28));
        assert!(spans.intersects(30..30));
        assert!(!spans.intersects(28..28));
    }

    #[test]
    fn test_mask_blanks_each_span() {
        let text = "Results (Smith, 2020) hold.";
        let spans = ProtectedSpans::extract(text);
        assert_eq!(spans.mask(text), "Results   hold.");
        assert_eq!(ProtectedSpans::none().mask(text), text);
    }

    #[test]
    fn test_localize_is_sentence_relative() {
        let text = "First one. Second (Smith, 2020) here.";
        let spans = ProtectedSpans::extract(text);
        let sentence = Sentence {
            index: 1,
            start_offset: 11,
            end_offset: text.len(),
            raw_text: text[11..].to_string(),
        };
        let local = spans.localize(&sentence);
        let ranges: Vec<(usize, usize)> = local.spans().iter().map(|s| (s.start_offset, s.end_offset)).collect();
        assert_eq!(ranges, vec![(7, 20)]);
        assert_eq!(local.spans()[0].kind, CitationKind::Parenthetical);
    }
}
