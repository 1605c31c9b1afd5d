//! Audio playback through `rodio`.

use std::io::Cursor;

use rodio::{Decoder, OutputStream, Sink};

use crate::error::VoiceError;
use crate::gate::EchoGate;

/// Plays synthesized speech on the default output device.
///
/// The rodio stream is opened per call because it cannot leave the thread
/// that created it; run [`AudioPlayer::play_wav`] inside `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct AudioPlayer {
    gate: EchoGate,
}

impl AudioPlayer {
    #[must_use]
    pub fn new(gate: EchoGate) -> Self {
        Self { gate }
    }

    #[must_use]
    pub fn gate(&self) -> &EchoGate {
        &self.gate
    }

    /// Decode WAV bytes and block until playback finishes. The echo gate is
    /// held for the whole duration.
    pub fn play_wav(&self, bytes: Vec<u8>) -> Result<(), VoiceError> {
        let source = Decoder::new(Cursor::new(bytes)).map_err(|e| VoiceError::Decode(e.to_string()))?;
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| VoiceError::OutputStream(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| VoiceError::OutputStream(e.to_string()))?;

        let _guard = self.gate.hold();
        sink.append(source);
        sink.sleep_until_end();
        tracing::debug!("Playback finished");
        Ok(())
    }
}

/// Whether a default output device can be opened, for diagnostics.
pub fn output_available() -> Result<(), VoiceError> {
    OutputStream::try_default()
        .map(|_| ())
        .map_err(|e| VoiceError::OutputStream(e.to_string()))
}
