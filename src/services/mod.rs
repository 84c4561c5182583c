// Scholar Humanizer Core Services

pub mod citations;
pub mod config_store;
pub mod detection;
pub mod lexicon;
pub mod pipeline;
pub mod providers;
pub mod rewrite;
pub mod segmenter;
pub mod text_processor;
pub mod verifier;

pub use citations::ProtectedSpans;
pub use config_store::{AppConfig, BackendConfig, BackendKind, ConfigError, ConfigStore, RequestDefaults};
pub use detection::{ConstantScorer, DetectionPolicy, LogitScorer, ScoringFunction};
pub use pipeline::{analyze_and_humanize, analyze_and_humanize_blocking, Pipeline};
pub use providers::ChatCompletionBackend;
pub use rewrite::{RewriteBackend, RewritePolicy, RuleBasedBackend};
pub use segmenter::{segment, Segmentation};
pub use verifier::{FidelityReport, MeaningVerifier};
