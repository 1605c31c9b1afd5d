//! Voice pipeline error types.

use nexus_providers::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Failed to open audio input stream: {0}")]
    InputStream(String),

    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Transcription failed: {0}")]
    Transcription(#[source] ProviderError),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[source] ProviderError),

    #[error("Speech command '{program}' failed: {message}")]
    Command { program: String, message: String },

    #[error("Audio worker stopped: {0}")]
    Worker(String),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
