//! Hosted model clients for Nexus.
//!
//! # Architecture
//!
//! The assistant needs three remote capabilities, each behind a small trait so
//! the engine and voice crates can be tested with fakes:
//!
//! - [`ChatModel`] - turns the conversation into the model's JSON reply
//! - [`SpeechToText`] - turns a recorded WAV utterance into text
//! - [`TextToSpeech`] - turns a reply into playable WAV audio
//!
//! [`GroqClient`] implements all three against Groq's OpenAI-compatible API.
//!
//! # Error Handling
//!
//! Every call returns [`ProviderError`]. Transient failures (429, 5xx,
//! connection errors) are retried by [`retry::send_with_retry`] before an
//! error is surfaced.

pub mod groq;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

pub use groq::{ChatOptions, GroqClient, SpeechOptions};
pub use nexus_types;

use nexus_types::ChatMessage;
use thiserror::Error;

/// Canonical Groq OpenAI-compatible base URL.
pub const GROQ_API_BASE_URL: &str = "https://api.groq.com/openai/v1";

const CONNECT_TIMEOUT_SECS: u64 = 15;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Future returned by text-producing provider calls.
pub type TextFut<'a> = Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;
/// Future returned by audio-producing provider calls.
pub type AudioFut<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, ProviderError>> + Send + 'a>>;

pub trait ChatModel: Send + Sync {
    /// Send the full conversation and return the assistant's raw reply text.
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> TextFut<'a>;
    fn model_name(&self) -> &str;
}

pub trait SpeechToText: Send + Sync {
    /// Transcribe a mono 16-bit PCM WAV file.
    fn transcribe(&self, wav: Vec<u8>) -> TextFut<'_>;
}

pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` into WAV bytes.
    fn synthesize<'a>(&'a self, text: &'a str) -> AudioFut<'a>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Request failed after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        source: reqwest::Error,
    },
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Response contained no content")]
    EmptyResponse,
}

impl ProviderError {
    /// 401/403: the key is wrong or revoked.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Http { status: 401 | 403, .. })
    }
}

/// Process-wide HTTP client shared by every provider call.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build tuned HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// Build a client with an overall request timeout (used by the web skills).
pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

/// Read at most 32 KiB of an error body.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Pull `error.message` out of an OpenAI-style error body, else the raw body.
#[must_use]
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Convert a retry outcome into a successful response or a [`ProviderError`].
pub(crate) async fn into_success(
    outcome: retry::RetryOutcome,
) -> Result<reqwest::Response, ProviderError> {
    match outcome {
        retry::RetryOutcome::Success(response) => Ok(response),
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            Err(ProviderError::Http {
                status,
                message: extract_error_message(&body),
            })
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            Err(ProviderError::Connection { attempts, source })
        }
        retry::RetryOutcome::NonRetryable(e) => Err(ProviderError::Request(e)),
    }
}
