//! Shared fixtures: a mocked Groq server and agents wired against it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use nexus_config::NexusConfig;
use nexus_engine::{Agent, AgentEvent, AgentParts, assemble};
use nexus_providers::retry::RetryConfig;
use nexus_providers::{ChatModel, GroqClient};
use nexus_tools::{DataPaths, MemoryClipboard, Os, RecordingPlatform, ToolCtx};
use nexus_types::ApiKey;
use nexus_voice::RecordingSpeaker;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CHAT_PATH: &str = "/openai/v1/chat/completions";

pub fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "llama-3.3-70b-versatile",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Every chat request gets `content` back.
pub async fn mount_chat_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
        .mount(server)
        .await;
}

/// Replies in order, one per request.
pub async fn mount_chat_sequence(server: &MockServer, contents: &[&str]) {
    for content in contents {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

pub fn groq(server: &MockServer) -> Arc<GroqClient> {
    Arc::new(
        GroqClient::new(ApiKey::new("gsk_test").expect("non-empty key"))
            .with_base_url(format!("{}/openai/v1", server.uri()))
            .with_retry(RetryConfig::none()),
    )
}

pub fn config_from(dir: &Path, toml: &str) -> NexusConfig {
    let path = dir.join("config.toml");
    std::fs::write(&path, toml).expect("write config");
    NexusConfig::load_from(&path)
        .expect("config parses")
        .expect("config exists")
}

pub struct Harness {
    pub agent: Agent,
    pub speaker: RecordingSpeaker,
    pub platform: Arc<RecordingPlatform>,
    pub events: mpsc::UnboundedReceiver<AgentEvent>,
    pub ctx: ToolCtx,
}

/// An agent on Linux desktop fakes, with its data under `dir`.
pub fn harness(dir: &Path, config: &NexusConfig, model: Option<Arc<dyn ChatModel>>) -> Harness {
    let platform = Arc::new(RecordingPlatform::new(Os::Linux));
    let ctx = ToolCtx::new(
        DataPaths::new(dir.join("data")),
        platform.clone(),
        Arc::new(MemoryClipboard::default()),
    );
    let speaker = RecordingSpeaker::new();
    let (tx, events) = mpsc::unbounded_channel();
    let agent = assemble(
        config,
        AgentParts {
            model,
            ctx: ctx.clone(),
            speaker: Arc::new(speaker.clone()),
            events: Some(tx),
        },
    )
    .expect("agent assembles");
    Harness {
        agent,
        speaker,
        platform,
        events,
        ctx,
    }
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
