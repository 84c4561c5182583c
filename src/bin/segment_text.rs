use anyhow::{Context, Result};
use clap::Parser;
use scholar_humanizer_lib::models::{CitationKind, LanguageTag};
use scholar_humanizer_lib::services::citations::ProtectedSpans;
use scholar_humanizer_lib::services::segmenter::segment;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

/// Dump sentences, separators and protected citation spans as JSON.
#[derive(Parser)]
#[command(name = "segment_text")]
struct Cli {
    /// Input file; omit or pass "-" to read stdin
    input: Option<PathBuf>,

    #[arg(short, long, default_value = "en")]
    language: String,

    /// Print the first N sentences as one-line previews to stderr
    #[arg(long, default_value_t = 0)]
    preview: usize,

    /// Write JSON here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct SentenceDump<'a> {
    index: usize,
    start: usize,
    end: usize,
    text: &'a str,
    protected: Vec<(usize, usize)>,
}

#[derive(Serialize)]
struct SpanDump<'a> {
    start: usize,
    end: usize,
    kind: CitationKind,
    text: &'a str,
}

#[derive(Serialize)]
struct Dump<'a> {
    language: String,
    degraded: bool,
    sentences: Vec<SentenceDump<'a>>,
    separators: &'a [String],
    protected_spans: Vec<SpanDump<'a>>,
    round_trip_ok: bool,
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let text = match &cli.input {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let language = LanguageTag::parse(&cli.language);
    let segmentation = segment(&text, &language);
    let spans = ProtectedSpans::extract(&text);

    let sentences = segmentation
        .sentences
        .iter()
        .map(|s| SentenceDump {
            index: s.index,
            start: s.start_offset,
            end: s.end_offset,
            text: &s.raw_text,
            protected: spans
                .localize(s)
                .spans()
                .iter()
                .map(|p| (p.start_offset, p.end_offset))
                .collect(),
        })
        .collect();

    let protected_spans = spans
        .spans()
        .iter()
        .map(|s| SpanDump {
            start: s.start_offset,
            end: s.end_offset,
            kind: s.kind,
            text: &text[s.start_offset..s.end_offset],
        })
        .collect();

    for s in segmentation.sentences.iter().take(cli.preview) {
        eprintln!("[{}] {}", s.index, preview(&s.raw_text, 80));
    }

    let dump = Dump {
        language: language.code().to_string(),
        degraded: segmentation.degraded,
        sentences,
        separators: &segmentation.separators,
        protected_spans,
        round_trip_ok: segmentation.join() == text,
    };
    let json = serde_json::to_string_pretty(&dump)?;
    match &cli.out {
        Some(path) => std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
