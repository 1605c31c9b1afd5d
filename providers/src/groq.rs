//! Groq OpenAI-compatible client: chat completions, Whisper transcription and
//! PlayAI speech synthesis.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;

use nexus_types::{ApiKey, ChatMessage, ModelName};

use crate::retry::{RetryConfig, send_with_retry};
use crate::{
    AudioFut, ChatModel, GROQ_API_BASE_URL, ProviderError, SpeechToText, TextFut, TextToSpeech,
    http_client, into_success,
};

/// Sampling options for chat completions.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: ModelName,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the API to guarantee a JSON object reply.
    pub json_mode: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: ModelName::default(),
            temperature: 0.6,
            max_tokens: 1024,
            json_mode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechOptions {
    pub stt_model: String,
    pub language: String,
    pub tts_model: String,
    pub tts_voice: String,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            stt_model: "whisper-large-v3-turbo".to_string(),
            language: "en".to_string(),
            tts_model: "playai-tts".to_string(),
            tts_voice: "Arista-PlayAI".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    api_key: ApiKey,
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
    chat: ChatOptions,
    speech: SpeechOptions,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl GroqClient {
    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: GROQ_API_BASE_URL.to_string(),
            client: http_client().clone(),
            retry: RetryConfig::default(),
            chat: ChatOptions::default(),
            speech: SpeechOptions::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chat_options(mut self, chat: ChatOptions) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_speech_options(mut self, speech: SpeechOptions) -> Self {
        self.speech = speech;
        self
    }

    #[must_use]
    pub fn chat_options(&self) -> &ChatOptions {
        &self.chat
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// POST the conversation to `/chat/completions` and return the first
    /// choice's content.
    pub async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = self.endpoint("chat/completions");
        let body = CompletionRequest {
            model: self.chat.model.as_str(),
            messages,
            temperature: self.chat.temperature,
            max_tokens: self.chat.max_tokens,
            response_format: self
                .chat
                .json_mode
                .then(|| json!({ "type": "json_object" })),
        };

        tracing::debug!(
            model = %self.chat.model,
            messages = messages.len(),
            "Sending chat completion"
        );
        let outcome = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(self.api_key.as_str())
                    .json(&body)
            },
            &self.retry,
        )
        .await;
        let response = into_success(outcome).await?;
        let bytes = response.bytes().await.map_err(ProviderError::Request)?;
        let parsed: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    /// Upload a WAV utterance to `/audio/transcriptions`.
    pub async fn transcription(&self, wav: Vec<u8>) -> Result<String, ProviderError> {
        let url = self.endpoint("audio/transcriptions");
        tracing::debug!(bytes = wav.len(), model = %self.speech.stt_model, "Transcribing audio");

        let outcome = send_with_retry(
            || {
                let form = Form::new()
                    .part("file", Part::bytes(wav.clone()).file_name("speech.wav"))
                    .text("model", self.speech.stt_model.clone())
                    .text("language", self.speech.language.clone())
                    .text("response_format", "json");
                self.client
                    .post(&url)
                    .bearer_auth(self.api_key.as_str())
                    .multipart(form)
            },
            &self.retry,
        )
        .await;
        let response = into_success(outcome).await?;
        let bytes = response.bytes().await.map_err(ProviderError::Request)?;
        let parsed: TranscriptionResponse =
            serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }

    /// Render `text` to WAV through `/audio/speech`.
    pub async fn speech(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let url = self.endpoint("audio/speech");
        let body = json!({
            "model": self.speech.tts_model,
            "voice": self.speech.tts_voice,
            "input": text,
            "response_format": "wav",
        });

        let outcome = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(self.api_key.as_str())
                    .json(&body)
            },
            &self.retry,
        )
        .await;
        let response = into_success(outcome).await?;
        let bytes = response.bytes().await.map_err(ProviderError::Request)?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }

    /// Cheap authenticated call used by `nexus doctor`.
    pub async fn verify_key(&self) -> Result<(), ProviderError> {
        let url = self.endpoint("models");
        let outcome = send_with_retry(
            || self.client.get(&url).bearer_auth(self.api_key.as_str()),
            &RetryConfig::none(),
        )
        .await;
        into_success(outcome).await.map(|_| ())
    }
}

impl ChatModel for GroqClient {
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> TextFut<'a> {
        Box::pin(self.chat_completion(messages))
    }

    fn model_name(&self) -> &str {
        self.chat.model.as_str()
    }
}

impl SpeechToText for GroqClient {
    fn transcribe(&self, wav: Vec<u8>) -> TextFut<'_> {
        Box::pin(self.transcription(wav))
    }
}

impl TextToSpeech for GroqClient {
    fn synthesize<'a>(&'a self, text: &'a str) -> AudioFut<'a> {
        Box::pin(self.speech(text))
    }
}
