/// LLM Client — the single point of entry for chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
/// The pipeline only sees the `CompletionBackend` trait.
///
/// Model: gpt-4o-mini (hardcoded — do not make configurable to prevent drift)
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::prompts::PromptPair;

pub mod sse;
#[cfg(test)]
pub mod testing;

use sse::{SseDecoder, SseFrame};

/// The model used for every analysis.
pub const MODEL: &str = "gpt-4o-mini";
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Incremental content fragments, in arrival order. An `Err` is always the last item.
pub type DeltaStream = BoxStream<'static, Result<String, LlmError>>;

/// Anything that can open a streaming chat completion for a prompt pair.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Opens one streaming request. Errors here mean no stream was ever started.
    async fn open_stream(&self, prompt: &PromptPair) -> Result<DeltaStream, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// The single chat-completion client, built once at startup and shared via `AppState`.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()?,
            api_key,
            base_url,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn open_stream(&self, prompt: &PromptPair) -> Result<DeltaStream, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("Could not read error body for status {}: {}", status, e);
                    None
                }
            };
            return Err(api_error(status, body));
        }

        debug!("Chat completion stream opened (model: {MODEL})");
        Ok(decode_deltas(response.bytes_stream().boxed()))
    }
}

struct DecodeState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

impl DecodeState {
    /// Queues the content of every frame; stops at `[DONE]` or the first bad chunk.
    fn absorb(&mut self, frames: Vec<SseFrame>) {
        for frame in frames {
            match frame {
                SseFrame::Done => {
                    self.finished = true;
                    return;
                }
                SseFrame::Data(payload) => match parse_delta(&payload) {
                    Ok(Some(content)) => self.pending.push_back(Ok(content)),
                    Ok(None) => {}
                    Err(e) => {
                        self.pending.push_back(Err(e));
                        self.finished = true;
                        return;
                    }
                },
            }
        }
    }
}

/// Turns a raw SSE response body into a stream of content deltas.
fn decode_deltas(body: BoxStream<'static, reqwest::Result<Bytes>>) -> DeltaStream {
    let state = DecodeState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(&chunk);
                    state.absorb(frames);
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(LlmError::Http(e)));
                    state.finished = true;
                }
                None => {
                    let frames = state.decoder.finish();
                    state.absorb(frames);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// Builds the open-time error for a non-2xx response, preferring the API's own message.
fn api_error(status: StatusCode, body: Option<String>) -> LlmError {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    };

    let message = match body {
        Some(body) if !body.trim().is_empty() => {
            warn!("Chat completion request returned {}: {}", status, body);
            serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body)
        }
        _ => fallback(),
    };

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Extracts the non-empty content fragment of a chat completion chunk, if any.
fn parse_delta(payload: &str) -> Result<Option<String>, LlmError> {
    if let Ok(err) = serde_json::from_str::<OpenAiError>(payload) {
        return Err(LlmError::Api {
            status: 200,
            message: err.error.message,
        });
    }

    let chunk: ChatChunk = serde_json::from_str(payload)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty()))
}
