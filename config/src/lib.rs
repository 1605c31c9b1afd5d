//! Configuration for Nexus.
//!
//! Settings live in `~/.nexus/config.toml`. Every section is optional; a
//! missing file, section or key falls back to the defaults documented on each
//! struct. String values that hold secrets or paths support `${VAR}`
//! environment expansion.
//!
//! ```toml
//! [app]
//! name = "Code Nexus"
//! input = "voice"
//!
//! [api_keys]
//! groq = "${GROQ_API_KEY}"
//!
//! [brain]
//! model = "llama-3.3-70b-versatile"
//! temperature = 0.6
//! ```

mod env;
mod persist;

pub use env::expand_env_vars;
pub use persist::{persist_api_key, persist_model};

use std::path::{Path, PathBuf};

use nexus_types::{ApiKey, ModelName};
use nexus_utils::expand_home;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NEXUS_DATA_DIR";

const DEFAULT_NAME: &str = "Code Nexus";
const DEFAULT_GREETING: &str = "System online. All features loaded. I am listening.";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Default, Deserialize)]
pub struct NexusConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub brain: Option<BrainConfig>,
    pub voice: Option<VoiceConfig>,
    pub data: Option<DataConfig>,
    pub reminders: Option<RemindersConfig>,
    pub files: Option<FilesConfig>,
    pub web: Option<WebConfig>,
    pub tools: Option<ToolsConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// How the assistant receives commands.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Voice,
    Text,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Persona name used in the system prompt and UI header.
    pub name: Option<String>,
    /// First sentence spoken at start-up.
    pub greeting: Option<String>,
    #[serde(default)]
    pub input: InputMode,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub groq: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groq = if self.groq.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("ApiKeys").field("groq", &groq).finish()
    }
}

/// Chat model request settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrainConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// History length that triggers trimming.
    pub history_limit: usize,
    /// Messages kept (besides the system prompt) after trimming.
    pub history_keep: usize,
    pub base_url: String,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            model: ModelName::DEFAULT.to_string(),
            temperature: 0.6,
            max_tokens: 1024,
            history_limit: 12,
            history_keep: 10,
            base_url: GROQ_BASE_URL.to_string(),
        }
    }
}

/// Speech synthesis backend.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// Groq speech endpoint played through the default output device.
    #[default]
    Groq,
    /// External program that takes the text as its last argument.
    Command,
    /// Text only.
    None,
}

/// Microphone endpointing and speech settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub stt_model: String,
    pub language: String,
    pub tts: TtsBackend,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_command: String,
    /// RMS floor below which audio always counts as silence.
    pub energy_threshold: f32,
    /// Multiplier applied to ambient noise to derive the speech threshold.
    pub dynamic_ratio: f32,
    pub ambient_seconds: f32,
    pub pause_seconds: f32,
    pub timeout_seconds: f32,
    pub phrase_limit_seconds: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-large-v3-turbo".to_string(),
            language: "en".to_string(),
            tts: TtsBackend::Groq,
            tts_model: "playai-tts".to_string(),
            tts_voice: "Arista-PlayAI".to_string(),
            tts_command: "espeak".to_string(),
            energy_threshold: 0.01,
            dynamic_ratio: 1.2,
            ambient_seconds: 1.2,
            pause_seconds: 1.0,
            timeout_seconds: 10.0,
            phrase_limit_seconds: 15.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DataConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemindersConfig {
    pub poll_seconds: u64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self { poll_seconds: 30 }
    }
}

/// File search limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilesConfig {
    pub search_roots: Vec<String>,
    pub max_depth: usize,
    pub max_results: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            search_roots: vec![
                "~/Documents".to_string(),
                "~/Desktop".to_string(),
                "~/Downloads".to_string(),
            ],
            max_depth: 3,
            max_results: 20,
        }
    }
}

impl FilesConfig {
    #[must_use]
    pub fn resolved_roots(&self) -> Vec<PathBuf> {
        self.search_roots
            .iter()
            .map(|root| expand_home(&expand_env_vars(root)))
            .collect()
    }
}

/// Public information endpoints. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebConfig {
    pub timeout_seconds: u64,
    pub news_api_key: String,
    pub duckduckgo_url: String,
    pub wikipedia_url: String,
    pub weather_url: String,
    pub news_url: String,
    pub dictionary_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            news_api_key: "demo".to_string(),
            duckduckgo_url: "https://api.duckduckgo.com/".to_string(),
            wikipedia_url: "https://en.wikipedia.org/api/rest_v1/page/summary/".to_string(),
            weather_url: "https://wttr.in/".to_string(),
            news_url: "https://gnews.io/api/v4/top-headlines".to_string(),
            dictionary_url: "https://api.dictionaryapi.dev/api/v2/entries/en/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Upper bound for a single skill invocation.
    pub timeout_seconds: u64,
    /// Tool names that are not registered at all.
    pub disabled: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            disabled: Vec::new(),
        }
    }
}

impl NexusConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        nexus_utils::recover_bak_file(path);
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.app
            .as_ref()
            .and_then(|app| app.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string())
    }

    #[must_use]
    pub fn greeting(&self) -> String {
        self.app
            .as_ref()
            .and_then(|app| app.greeting.clone())
            .unwrap_or_else(|| DEFAULT_GREETING.to_string())
    }

    #[must_use]
    pub fn input_mode(&self) -> InputMode {
        self.app.as_ref().map(|app| app.input).unwrap_or_default()
    }

    /// The configured key (after `${VAR}` expansion), else `GROQ_API_KEY`.
    #[must_use]
    pub fn groq_api_key(&self) -> Option<ApiKey> {
        let configured = self.api_keys.as_ref().and_then(|keys| keys.groq.as_deref());
        resolve_api_key(configured, std::env::var(GROQ_API_KEY_ENV).ok())
    }

    #[must_use]
    pub fn brain(&self) -> BrainConfig {
        self.brain.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn voice(&self) -> VoiceConfig {
        self.voice.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn reminders(&self) -> RemindersConfig {
        self.reminders.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn files(&self) -> FilesConfig {
        self.files.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn web(&self) -> WebConfig {
        let mut web = self.web.clone().unwrap_or_default();
        web.news_api_key = expand_env_vars(&web.news_api_key);
        web
    }

    #[must_use]
    pub fn tools(&self) -> ToolsConfig {
        self.tools.clone().unwrap_or_default()
    }

    /// `NEXUS_DATA_DIR`, then `[data] dir`, then `~/.nexus/data`.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            return expand_home(&dir);
        }
        if let Some(dir) = self.data.as_ref().and_then(|data| data.dir.as_deref()) {
            let expanded = expand_env_vars(dir);
            if !expanded.trim().is_empty() {
                return expand_home(&expanded);
            }
        }
        nexus_dir().map_or_else(|| PathBuf::from(".nexus").join("data"), |dir| dir.join("data"))
    }
}

fn resolve_api_key(configured: Option<&str>, env_value: Option<String>) -> Option<ApiKey> {
    configured
        .map(expand_env_vars)
        .and_then(ApiKey::new)
        .or_else(|| env_value.and_then(ApiKey::new))
}

/// `~/.nexus`
#[must_use]
pub fn nexus_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".nexus"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    nexus_dir().map(|dir| dir.join("config.toml"))
}
