// Sentence Segmenter
// Language-aware, reversible sentence splitting with UTF-8 byte offsets

use crate::models::{Language, LanguageTag, Sentence};
use crate::services::lexicon::{compiled, CompiledLexicon};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// An unbalanced quote stops suppressing splits after this many bytes.
const MAX_QUOTE_BYTES: usize = 600;
/// Lines up to this many chars without closing punctuation are treated as headings.
const HEADING_MAX_CHARS: usize = 60;

#[derive(Debug, Clone, Serialize)]
pub struct Segmentation {
    pub sentences: Vec<Sentence>,
    /// `separators[i]` precedes `sentences[i]`; the final entry trails the last sentence.
    pub separators: Vec<String>,
    /// True when the language was not recognized and the generic heuristic was used.
    pub degraded: bool,
}

impl Segmentation {
    /// Rebuild the text from the original sentences. Always equals the input.
    pub fn join(&self) -> String {
        let texts: Vec<&str> = self.sentences.iter().map(|s| s.raw_text.as_str()).collect();
        self.reassemble(&texts)
    }

    /// Rebuild the text with one replacement string per sentence, keeping the
    /// original separators.
    pub fn reassemble<S: AsRef<str>>(&self, texts: &[S]) -> String {
        let mut out = String::new();
        for (i, sep) in self.separators.iter().enumerate() {
            out.push_str(sep);
            if let Some(sentence) = texts.get(i) {
                out.push_str(sentence.as_ref());
            }
        }
        out
    }
}

pub fn degraded_warning(code: &str) -> String {
    format!(
        "Language '{}' is not supported; sentences were split with a generic punctuation heuristic and results may be less accurate.",
        code
    )
}

#[derive(Debug, Clone, Copy)]
struct QuoteStyle {
    open: &'static [char],
    close: &'static [char],
}

impl QuoteStyle {
    fn for_language(language: Option<Language>) -> Self {
        match language {
            Some(Language::De) => Self {
                open: &['„', '»'],
                close: &['“', '«'],
            },
            Some(Language::Pl) => Self {
                open: &['„', '«'],
                close: &['”', '»'],
            },
            Some(_) => Self {
                open: &['“', '«'],
                close: &['”', '»'],
            },
            None => Self {
                open: &['“', '«', '„'],
                close: &['”', '»'],
            },
        }
    }
}

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\[\d{1,3}\]|\d{1,3}[.)]\s|[-•*–]\s)").expect("list marker regex")
    })
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

fn is_bracket_closer(ch: char) -> bool {
    matches!(ch, ')' | ']' | '’' | '\'')
}

fn is_superscript_digit(ch: char) -> bool {
    matches!(ch, '¹' | '²' | '³' | '⁴' | '⁵' | '⁶' | '⁷' | '⁸' | '⁹' | '⁰')
}

/// Split `text` into sentences. Never fails; unknown languages degrade to the
/// generic heuristic and set `degraded`.
pub fn segment(text: &str, language: &LanguageTag) -> Segmentation {
    let lang = language.language();
    let degraded = lang.is_none();
    if degraded {
        warn!(
            "[SEGMENTER] unsupported language '{}', using generic punctuation heuristic",
            language.code()
        );
    }

    let lex = compiled(lang);
    let quotes = QuoteStyle::for_language(lang);
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut cuts: Vec<usize> = Vec::new();
    let mut depth: usize = 0;
    let mut quote_opened_at: usize = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];

        if ch == '\n' {
            if is_hard_break(text, pos) {
                cuts.push(pos);
                depth = 0;
            }
            i += 1;
            continue;
        }

        if depth > 0 && pos.saturating_sub(quote_opened_at) > MAX_QUOTE_BYTES {
            depth = 0;
        }

        if let Some(opening) = quote_direction(&chars, i, quotes) {
            if opening {
                if depth == 0 {
                    quote_opened_at = pos;
                }
                depth += 1;
            } else {
                depth = depth.saturating_sub(1);
            }
            i += 1;
            continue;
        }

        if is_terminal(ch) {
            if let Some((end_idx, new_depth)) = sentence_end(&chars, i, lex, quotes, depth) {
                let cut = chars.get(end_idx).map(|c| c.0).unwrap_or(text.len());
                cuts.push(cut);
                depth = new_depth;
                i = end_idx;
                continue;
            }
        }

        i += 1;
    }

    let segmentation = build(text, cuts, degraded);
    debug!(
        "[SEGMENTER] language={} sentences={} bytes={}",
        language.code(),
        segmentation.sentences.len(),
        text.len()
    );
    segmentation
}

/// `Some(true)` for an opening quote, `Some(false)` for a closing one.
fn quote_direction(chars: &[(usize, char)], i: usize, quotes: QuoteStyle) -> Option<bool> {
    let ch = chars[i].1;
    if ch == '"' {
        let prev = i.checked_sub(1).map(|p| chars[p].1);
        let opening = match prev {
            None => true,
            Some(p) => p.is_whitespace() || matches!(p, '(' | '[' | '{' | '—' | '–'),
        };
        return Some(opening);
    }
    if quotes.open.contains(&ch) {
        return Some(true);
    }
    if quotes.close.contains(&ch) {
        return Some(false);
    }
    None
}

/// Decide whether the terminal mark at `i` ends a sentence. Returns the index of
/// the first char after the sentence (closing quotes, brackets and trailing
/// citation markers absorbed) and the quote depth after absorption.
fn sentence_end(
    chars: &[(usize, char)],
    i: usize,
    lex: &CompiledLexicon,
    quotes: QuoteStyle,
    depth: usize,
) -> Option<(usize, usize)> {
    let ch = chars[i].1;
    let next = chars.get(i + 1).map(|c| c.1);

    // Let the last mark of a run ("?!", "...") decide.
    if next.is_some_and(is_terminal) {
        return None;
    }

    if ch == '.' {
        let prev = i.checked_sub(1).map(|p| chars[p].1);
        if prev.is_some_and(|c| c.is_ascii_digit()) && next.is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        if is_abbreviation(chars, i, lex) {
            return None;
        }
    }

    let mut depth = depth;
    let mut j = i + 1;
    while let Some(&(_, c)) = chars.get(j) {
        if c == '"' || quotes.close.contains(&c) {
            depth = depth.saturating_sub(1);
            j += 1;
        } else if is_bracket_closer(c) || is_superscript_digit(c) {
            j += 1;
        } else if c == '[' {
            match bracket_citation_end(chars, j) {
                Some(end) => j = end,
                None => break,
            }
        } else {
            break;
        }
    }

    if depth > 0 {
        return None;
    }

    match chars.get(j) {
        None => return Some((j, depth)),
        Some(&(_, c)) if !c.is_whitespace() => return None,
        _ => {}
    }

    let mut k = j;
    while k < chars.len() && chars[k].1.is_whitespace() {
        k += 1;
    }
    if k == chars.len() {
        return Some((j, depth));
    }
    if chars[k].1.is_lowercase() {
        return None;
    }

    Some((j, depth))
}

/// Token before the period at `i`, lowercased, including inner periods ("e.g", "z.b").
fn is_abbreviation(chars: &[(usize, char)], i: usize, lex: &CompiledLexicon) -> bool {
    let mut k = i;
    while k > 0 {
        let c = chars[k - 1].1;
        if c.is_alphabetic() || c == '.' {
            k -= 1;
        } else {
            break;
        }
    }
    let token: String = chars[k..i].iter().map(|c| c.1).collect();
    let token = token.trim_start_matches('.');
    if token.is_empty() {
        return false;
    }

    // Personal initials ("J. Smith") and dotted acronyms ("U.S. Army") hold
    // only while the next word continues the name.
    if is_initialism(token) {
        match continues_name(chars, i, lex) {
            Some(continues) => return continues,
            // "Smith, J. (2019)" keeps the initial.
            None if token.chars().count() == 1 => return true,
            None => {}
        }
    }

    let lower = token.to_lowercase();
    if lex.abbreviations.contains(lower.as_str()) {
        return true;
    }

    // "et al." is written as two tokens.
    lower == "al" && k >= 4 && {
        let before: String = chars[k.saturating_sub(3)..k].iter().map(|c| c.1).collect();
        before.to_lowercase() == "et "
    }
}

/// "J", "U.S", "U.K": single uppercase letters joined by periods.
fn is_initialism(token: &str) -> bool {
    token
        .split('.')
        .all(|part| {
            let mut letters = part.chars();
            matches!((letters.next(), letters.next()), (Some(c), None) if c.is_uppercase())
        })
}

/// Whether the word after the period at `i` reads as the rest of a name:
/// another initial, or a capitalized word that is not a function word.
/// `None` when no capitalized word follows.
fn continues_name(chars: &[(usize, char)], i: usize, lex: &CompiledLexicon) -> Option<bool> {
    let mut k = i + 1;
    if !chars.get(k).is_some_and(|c| c.1.is_whitespace()) {
        return None;
    }
    while chars.get(k).is_some_and(|c| c.1.is_whitespace()) {
        k += 1;
    }
    let start = k;
    while chars.get(k).is_some_and(|c| c.1.is_alphabetic()) {
        k += 1;
    }
    let word: String = chars[start..k].iter().map(|c| c.1).collect();
    if !word.starts_with(char::is_uppercase) {
        return None;
    }
    if word.chars().count() == 1 {
        return Some(chars.get(k).is_some_and(|c| c.1 == '.'));
    }
    Some(!lex.function_words.contains(word.to_lowercase().as_str()))
}

/// End index (exclusive) of a numbered citation like "[3]" or "[2, 5–7]" starting at `j`.
fn bracket_citation_end(chars: &[(usize, char)], j: usize) -> Option<usize> {
    let mut k = j + 1;
    let mut saw_digit = false;
    while let Some(&(_, c)) = chars.get(k) {
        if c.is_ascii_digit() {
            saw_digit = true;
        } else if c == ']' {
            return if saw_digit { Some(k + 1) } else { None };
        } else if !matches!(c, ',' | ' ' | '-' | '–') {
            return None;
        }
        k += 1;
        if k - j > 24 {
            return None;
        }
    }
    None
}

fn is_hard_break(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let current = text[line_start..pos].trim();
    let rest = &text[pos + 1..];
    let next_line = rest.split('\n').next().unwrap_or("");

    if current.is_empty() || next_line.trim().is_empty() {
        return true;
    }
    if list_marker_re().is_match(next_line) {
        return true;
    }

    let heading_like = current.chars().count() <= HEADING_MAX_CHARS
        && !current.ends_with(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
        && next_line
            .trim_start()
            .starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit() || c == '[');
    heading_like
}

fn build(text: &str, mut cuts: Vec<usize>, degraded: bool) -> Segmentation {
    cuts.push(text.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut sentences: Vec<Sentence> = Vec::new();
    let mut prev = 0usize;
    for cut in cuts {
        let piece = &text[prev..cut];
        let leading = piece.len() - piece.trim_start().len();
        let trailing = piece.len() - piece.trim_end().len();
        let start = prev + leading;
        let end = cut.saturating_sub(trailing).max(start);
        if start < end {
            sentences.push(Sentence {
                index: sentences.len(),
                start_offset: start,
                end_offset: end,
                raw_text: text[start..end].to_string(),
            });
        }
        prev = cut;
    }

    let mut separators = Vec::with_capacity(sentences.len() + 1);
    let mut cursor = 0usize;
    for s in &sentences {
        separators.push(text[cursor..s.start_offset].to_string());
        cursor = s.end_offset;
    }
    separators.push(text[cursor..].to_string());

    Segmentation {
        sentences,
        separators,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str, lang: &str) -> Vec<String> {
        segment(text, &LanguageTag::parse(lang))
            .sentences
            .into_iter()
            .map(|s| s.raw_text)
            .collect()
    }

    #[test]
    fn test_basic_split_and_round_trip() {
        let text = "  First sentence here. Second one follows!  Third?\n";
        let seg = segment(text, &LanguageTag::parse("en"));
        assert_eq!(seg.sentences.len(), 3);
        assert_eq!(seg.sentences[1].raw_text, "Second one follows!");
        assert_eq!(seg.join(), text);
        assert!(!seg.degraded);
    }

    #[test]
    fn test_abbreviations_and_initials_do_not_split() {
        let got = texts(
            "Smith et al. found effects, e.g. in Fig. 3 of the paper. J. Doe disagreed.",
            "en",
        );
        assert_eq!(
            got,
            vec![
                "Smith et al. found effects, e.g. in Fig. 3 of the paper.",
                "J. Doe disagreed."
            ]
        );
    }

    #[test]
    fn test_initial_before_sentence_start_splits() {
        assert_eq!(
            texts("This is sentence A. B follows here.", "en"),
            vec!["This is sentence A.", "B follows here."]
        );
        assert_eq!(
            texts("Samples were drawn in the U.S. The effect held.", "en"),
            vec!["Samples were drawn in the U.S.", "The effect held."]
        );
        assert_eq!(
            texts("Work by J. R. Tolkien and the U.S. Army was cited.", "en").len(),
            1
        );
        assert_eq!(texts("Smith, J. (2019). Benchmarks revisited.", "en").len(), 2);
    }

    #[test]
    fn test_decimals_do_not_split() {
        let got = texts("The mean was 3.14 across trials. It rose to 4.5 later.", "en");
        assert_eq!(got.len(), 2);
        assert!(got[0].contains("3.14"));
    }

    #[test]
    fn test_quoted_terminal_stays_with_quote() {
        let got = texts("He wrote \"The end is near. Or not.\" Then he left.", "en");
        assert_eq!(got, vec!["He wrote \"The end is near. Or not.\"", "Then he left."]);
    }

    #[test]
    fn test_german_quotes_and_abbreviations() {
        let got = texts("Er sagte „Das ist gut. Sehr gut.“ Danach z.B. nichts. Ende.", "de");
        assert_eq!(got, vec!["Er sagte „Das ist gut. Sehr gut.“", "Danach z.B. nichts.", "Ende."]);
    }

    #[test]
    fn test_lowercase_continuation_is_not_a_boundary() {
        let got = texts("Values differ (see Table 2. below) across groups.", "en");
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_trailing_numbered_citation_is_absorbed() {
        let got = texts("Prior work exists.[3] New results follow.", "en");
        assert_eq!(got, vec!["Prior work exists.[3]", "New results follow."]);
    }

    #[test]
    fn test_heading_and_blank_lines_are_hard_breaks() {
        let text = "Introduction\nDeep learning has grown\nquickly in recent years.\n\nReferences\n[1] Smith, J. Title";
        let seg = segment(text, &LanguageTag::parse("en"));
        let got: Vec<&str> = seg.sentences.iter().map(|s| s.raw_text.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "Introduction",
                "Deep learning has grown\nquickly in recent years.",
                "References",
                "[1] Smith, J. Title"
            ]
        );
        assert_eq!(seg.join(), text);
    }

    #[test]
    fn test_unsupported_language_degrades() {
        let seg = segment("Ово је реченица. Друга реченица.", &LanguageTag::parse("sr"));
        assert!(seg.degraded);
        assert_eq!(seg.sentences.len(), 2);
    }

    #[test]
    fn test_whitespace_only_has_no_sentences() {
        let seg = segment(" \n\t ", &LanguageTag::parse("en"));
        assert!(seg.sentences.is_empty());
        assert_eq!(seg.separators.len(), 1);
        assert_eq!(seg.join(), " \n\t ");
    }

    #[test]
    fn test_reassemble_replaces_sentences_only() {
        let text = "One here. Two there.";
        let seg = segment(text, &LanguageTag::parse("en"));
        let out = seg.reassemble(&["Uno.", "Two there."]);
        assert_eq!(out, "Uno. Two there.");
    }
}
