//! Scholar Humanizer - AI-text detection and citation-safe rewriting for academic prose
//!
//! Usage:
//!   scholar-humanizer analyze paper.txt          Detect and rewrite, print both parts
//!   scholar-humanizer detect paper.txt           Detection only
//!   scholar-humanizer humanize - < paper.txt     Rewrite text read from stdin

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use scholar_humanizer_lib::api::{self, AnalyzeRequest, ApiError};
use scholar_humanizer_lib::models::{AcademicLevel, DetectionSensitivity, RewriteScope};
use scholar_humanizer_lib::services::{BackendKind, ConfigStore, Pipeline};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "scholar-humanizer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true, env = "SCHOLAR_HUMANIZER_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and rewrite; prints detection and humanized parts
    Analyze(RequestArgs),
    /// Detection only
    Detect(RequestArgs),
    /// Rewrite; prints only the humanized part
    Humanize(RequestArgs),
}

#[derive(Args)]
struct RequestArgs {
    /// Input file; omit or pass "-" to read stdin
    input: Option<PathBuf>,

    /// Language code (en, de, fr, it, es, pl, tr)
    #[arg(short, long)]
    language: Option<String>,

    /// high_school | university | phd
    #[arg(long)]
    level: Option<String>,

    /// flagged_only | all_sentences
    #[arg(long)]
    scope: Option<String>,

    /// low | medium | high
    #[arg(long)]
    sensitivity: Option<String>,

    /// Allow rewrites to change citation text
    #[arg(long)]
    no_preserve_citations: bool,

    /// Reject unknown language codes instead of degrading
    #[arg(long)]
    strict_language: bool,

    /// local | chat
    #[arg(long)]
    backend: Option<String>,
}

impl RequestArgs {
    fn read_text(&self) -> Result<String> {
        match &self.input {
            Some(path) if path.as_os_str() != "-" => {
                std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
            }
            _ => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
                Ok(buf)
            }
        }
    }

    fn apply(&self, request: &mut AnalyzeRequest) -> Result<()> {
        if let Some(language) = &self.language {
            request.language = language.clone();
        }
        if let Some(level) = &self.level {
            request.academic_level =
                AcademicLevel::from_str(level).ok_or_else(|| anyhow!("unknown academic level '{}'", level))?;
        }
        if let Some(scope) = &self.scope {
            request.rewrite_scope =
                RewriteScope::from_str(scope).ok_or_else(|| anyhow!("unknown rewrite scope '{}'", scope))?;
        }
        if let Some(sensitivity) = &self.sensitivity {
            request.sensitivity = DetectionSensitivity::from_str(sensitivity);
        }
        if self.no_preserve_citations {
            request.preserve_citations = false;
        }
        if self.strict_language {
            request.strict_language = true;
        }
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn exit_with(err: ApiError, pretty: bool) -> ! {
    let _ = print_json(&err.body(), pretty);
    std::process::exit(if err.is_client_error() { 2 } else { 1 });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    scholar_humanizer_lib::init_logging();

    let args = match &cli.command {
        Command::Analyze(a) | Command::Detect(a) | Command::Humanize(a) => a,
    };

    let store = match &cli.config_dir {
        Some(dir) => Some(ConfigStore::new(dir.clone())),
        None => ConfigStore::open_default(),
    };
    let mut config = match &store {
        Some(store) => store.load().context("failed to load config")?,
        None => Default::default(),
    }
    .with_env_overrides();

    if let Some(kind) = &args.backend {
        config.backend.kind = match kind.to_ascii_lowercase().as_str() {
            "local" => BackendKind::Local,
            "chat" => BackendKind::Chat,
            other => return Err(anyhow!("unknown backend '{}'", other)),
        };
    }

    let pipeline = Pipeline::from_config(&config).context("failed to set up rewrite backend")?;
    let mut request = AnalyzeRequest::new(args.read_text()?, &config.defaults);
    args.apply(&mut request)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    info!("Backend: {:?}", config.backend.kind);
    match cli.command {
        Command::Analyze(_) => match api::analyze(&pipeline, request, &cancel).await {
            Ok(response) => print_json(&response, cli.pretty),
            Err(e) => exit_with(e, cli.pretty),
        },
        Command::Detect(_) => match api::detect(&pipeline, request, &cancel).await {
            Ok(response) => print_json(&response, cli.pretty),
            Err(e) => exit_with(e, cli.pretty),
        },
        Command::Humanize(_) => match api::humanize(&pipeline, request, &cancel).await {
            Ok(response) => print_json(&response, cli.pretty),
            Err(e) => exit_with(e, cli.pretty),
        },
    }
}
