//! Voice input and output for Nexus.
//!
//! ```text
//! mic (cpal) -> Endpointer -> encode_wav -> SpeechToText -> Listener
//! Speaker -> TextToSpeech -> AudioPlayer (rodio)
//!              ^ EchoGate held while playing, capture drops samples
//! ```
//!
//! Audio devices are only touched on blocking threads.

pub mod capture;
pub mod endpoint;
pub mod error;
pub mod gate;
pub mod playback;
pub mod ports;
pub mod wav;

pub use capture::{Microphone, Recording, input_device_name};
pub use endpoint::{Endpoint, EndpointConfig, Endpointer, rms};
pub use error::VoiceError;
pub use gate::{EchoGate, GateGuard};
pub use playback::{AudioPlayer, output_available};
pub use ports::{
    CommandSpeaker, Heard, InFlight, ListenFut, Listener, QueueListener, RecordingSpeaker, SilentSpeaker,
    SpeakFut, Speaker, TextListener, VoiceListener, VoiceSpeaker,
};
pub use wav::{downmix, encode_wav};
