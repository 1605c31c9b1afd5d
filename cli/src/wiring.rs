//! Turning configuration into a Groq client, speakers, listeners and agents.

use std::sync::Arc;

use anyhow::{Context, Result};
use nexus_config::{InputMode, NexusConfig, TtsBackend};
use nexus_engine::{Agent, AgentEvent, AgentParts, assemble};
use nexus_providers::{ChatModel, ChatOptions, GroqClient, SpeechOptions};
use nexus_tools::{DataPaths, SystemClipboard, SystemPlatform, ToolCtx};
use nexus_types::ModelName;
use nexus_voice::{
    AudioPlayer, CommandSpeaker, EchoGate, EndpointConfig, Listener, Microphone, SilentSpeaker,
    Speaker, TextListener, VoiceListener, VoiceSpeaker, input_device_name, output_available,
};
use tokio::sync::mpsc;

pub struct Runtime {
    pub config: NexusConfig,
    pub groq: Option<Arc<GroqClient>>,
    gate: EchoGate,
}

impl Runtime {
    pub fn load() -> Result<Self> {
        let config = NexusConfig::load()
            .context("failed to load config")?
            .unwrap_or_default();
        Ok(Self::from_config(config))
    }

    #[must_use]
    pub fn from_config(config: NexusConfig) -> Self {
        let groq = config.groq_api_key().map(|key| Arc::new(groq_client(&config, key)));
        if groq.is_none() {
            tracing::warn!("No Groq API key configured");
        }
        Self {
            config,
            groq,
            gate: EchoGate::new(),
        }
    }

    pub fn tool_ctx(&self) -> Result<ToolCtx> {
        let dir = self.config.data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(
            ToolCtx::new(DataPaths::new(dir), Arc::new(SystemPlatform), Arc::new(SystemClipboard))
                .with_web(self.config.web())
                .with_files(self.config.files()),
        )
    }

    /// Speech output per `[voice] tts`, falling back to text only.
    #[must_use]
    pub fn speaker(&self) -> Arc<dyn Speaker> {
        let voice = self.config.voice();
        match voice.tts {
            TtsBackend::Groq => {
                let Some(groq) = self.groq.clone() else {
                    return Arc::new(SilentSpeaker);
                };
                if let Err(e) = output_available() {
                    tracing::warn!("Speech output disabled: {e}");
                    return Arc::new(SilentSpeaker);
                }
                Arc::new(VoiceSpeaker::new(groq, AudioPlayer::new(self.gate.clone())))
            }
            TtsBackend::Command => {
                let speaker = CommandSpeaker::new(&voice.tts_command, self.gate.clone());
                if which::which(speaker.program()).is_err() {
                    tracing::warn!(program = speaker.program(), "Speech command not found");
                    return Arc::new(SilentSpeaker);
                }
                Arc::new(speaker)
            }
            TtsBackend::None => Arc::new(SilentSpeaker),
        }
    }

    /// The microphone listener, when voice input is configured and possible.
    #[must_use]
    pub fn voice_listener(&self) -> Option<Box<dyn Listener>> {
        if self.config.input_mode() != InputMode::Voice {
            return None;
        }
        let groq = self.groq.clone()?;
        match input_device_name() {
            Ok(device) => tracing::info!(device = %device, "Using microphone"),
            Err(e) => {
                tracing::warn!("Voice input unavailable: {e}");
                return None;
            }
        }
        let microphone = Microphone::new(EndpointConfig::from(&self.config.voice()), self.gate.clone());
        Some(Box::new(VoiceListener::new(microphone, groq)))
    }

    /// Voice when available, else lines from stdin.
    #[must_use]
    pub fn console_listener(&self, force_text: bool) -> (Box<dyn Listener>, bool) {
        if !force_text && let Some(listener) = self.voice_listener() {
            return (listener, true);
        }
        (Box::new(TextListener::stdin()), false)
    }

    pub fn agent(
        &self,
        speaker: Arc<dyn Speaker>,
        events: Option<mpsc::UnboundedSender<AgentEvent>>,
    ) -> Result<Agent> {
        let model = self.groq.clone().map(|groq| groq as Arc<dyn ChatModel>);
        let parts = AgentParts {
            model,
            ctx: self.tool_ctx()?,
            speaker,
            events,
        };
        assemble(&self.config, parts).context("failed to assemble agent")
    }
}

fn groq_client(config: &NexusConfig, key: nexus_types::ApiKey) -> GroqClient {
    let brain = config.brain();
    let voice = config.voice();
    GroqClient::new(key)
        .with_base_url(brain.base_url)
        .with_chat_options(ChatOptions {
            model: ModelName::new(brain.model),
            temperature: brain.temperature,
            max_tokens: brain.max_tokens,
            json_mode: true,
        })
        .with_speech_options(SpeechOptions {
            stt_model: voice.stt_model,
            language: voice.language,
            tts_model: voice.tts_model,
            tts_voice: voice.tts_voice,
        })
}
