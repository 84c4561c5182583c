// AI Provider Service
// OpenAI-compatible chat-completion rewrite backend

use crate::models::RewriteOperation;
use crate::services::lexicon::lexicon_for;
use crate::services::rewrite::backend::{BackendError, RewriteBackend, RewriteRequest};
use crate::services::rewrite::candidate::{align_protected, RewriteCandidate};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Client-side ceiling; the engine's per-call timeout is normally shorter.
const HTTP_TIMEOUT_SECS: u64 = 80;
const MAX_TOKENS: i32 = 600;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RewritePayload {
    #[serde(alias = "rewritten_text", alias = "text")]
    rewritten: String,
}

pub struct ChatCompletionBackend {
    client: Client,
    url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionBackend {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        proxy: Option<&str>,
    ) -> Result<Self, BackendError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(HTTP_TIMEOUT_SECS));
        if let Some(proxy_url) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::Unavailable("API key not configured".to_string()));
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            model: model.into(),
            api_key,
        })
    }

    async fn call_chat_api(&self, system: &str, user: &str) -> Result<(String, i64), BackendError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: 0.7,
            response_format: Some(ResponseFormat {
                r#type: "json_object".to_string(),
            }),
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response.json().await?;
        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(BackendError::MissingContent)?;

        Ok((content, latency_ms))
    }
}

#[async_trait]
impl RewriteBackend for ChatCompletionBackend {
    fn name(&self) -> &'static str {
        "chat-completion"
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<Option<RewriteCandidate>, BackendError> {
        let (system, user) = build_prompt(request);
        let (content, latency_ms) = self.call_chat_api(&system, &user).await?;
        info!(
            "[PROVIDER] rewrite ok model={} sentence={} attempt={} latency_ms={}",
            self.model, request.sentence_index, request.attempt, latency_ms
        );

        let rewritten = parse_rewrite(&content).ok_or(BackendError::MissingContent)?;
        Ok(build_candidate(request, &rewritten))
    }
}

fn build_prompt(request: &RewriteRequest) -> (String, String) {
    let lexicon = lexicon_for(request.language);
    let intensity = match request.attempt {
        0 => "Rephrase the sentence naturally; vary structure and wording where it reads formulaic.",
        1 => "Make light edits only; keep the sentence structure and most of the wording.",
        _ => "Change as few words as possible; only replace the most formulaic phrasing.",
    };

    let system = format!(
        "You revise single sentences of academic prose so they read as written by a careful human author. \
         Never translate: answer in the same language as the input. {}. Target {}. \
         Keep every fact, number, name and negation. Respond with json: {{\"rewritten\": \"...\"}}",
        lexicon.style_instruction,
        request.level.describe()
    );

    let mut user = format!("{}\n\nSentence:\n{}", intensity, request.text);
    if !request.protected.is_empty() {
        let spans: Vec<&str> = request
            .protected
            .spans()
            .iter()
            .filter_map(|s| request.text.get(s.start_offset..s.end_offset))
            .collect();
        user.push_str("\n\nCopy these citation fragments verbatim, in the same order:\n");
        for span in spans {
            user.push_str(&format!("- {}\n", span));
        }
    }
    (system, user)
}

fn json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json regex"))
}

/// Extract a JSON object from model output that may carry prose or code fences.
pub fn extract_json(content: &str) -> Option<&str> {
    json_re().find(content).map(|m| m.as_str())
}

fn parse_rewrite(content: &str) -> Option<String> {
    let rewritten = match extract_json(content) {
        Some(json) => match serde_json::from_str::<RewritePayload>(json) {
            Ok(payload) => payload.rewritten,
            Err(e) => {
                warn!("[PROVIDER] unparseable rewrite payload: {}", e);
                return None;
            }
        },
        None => content.to_string(),
    };
    let trimmed = rewritten.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Turn a full-sentence rewrite into edits. With protected spans, the
/// protected texts must survive verbatim; otherwise the whole sentence is
/// replaced and the engine's protected-span check rejects it.
pub fn build_candidate(request: &RewriteRequest, rewritten: &str) -> Option<RewriteCandidate> {
    if rewritten == request.text {
        return None;
    }
    if request.protected.is_empty() {
        return Some(RewriteCandidate::whole_sentence(
            &request.text,
            rewritten,
            RewriteOperation::BackendRewrite,
        ));
    }
    match align_protected(&request.text, rewritten, &request.protected) {
        Some(edits) if edits.is_empty() => None,
        Some(edits) => Some(RewriteCandidate::new(edits, vec![RewriteOperation::BackendRewrite])),
        None => {
            debug!(
                "[PROVIDER] sentence={} rewrite dropped a protected span",
                request.sentence_index
            );
            Some(RewriteCandidate::whole_sentence(
                &request.text,
                rewritten,
                RewriteOperation::BackendRewrite,
            ))
        }
    }
}
