//! The agent's ears and mouth.
//!
//! [`Listener`] and [`Speaker`] are the seams between the agent loop and the
//! audio hardware, so the loop runs the same against a microphone, a
//! terminal or a scripted test.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use nexus_providers::{SpeechToText, TextToSpeech};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;

use crate::capture::Microphone;
use crate::error::VoiceError;
use crate::gate::EchoGate;
use crate::playback::AudioPlayer;
use crate::wav::encode_wav;

/// Result of one listening turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Speech(String),
    /// Silence, timeout or unintelligible audio.
    Nothing,
    /// The input source is exhausted (end of stdin, empty script).
    Closed,
}

impl Heard {
    /// Blank transcripts count as nothing heard.
    #[must_use]
    pub fn from_transcript(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Heard::Nothing
        } else {
            Heard::Speech(text.to_string())
        }
    }
}

pub type ListenFut<'a> = Pin<Box<dyn Future<Output = Result<Heard, VoiceError>> + Send + 'a>>;
pub type SpeakFut<'a> = Pin<Box<dyn Future<Output = Result<(), VoiceError>> + Send + 'a>>;

pub trait Listener: Send {
    fn listen(&mut self) -> ListenFut<'_>;
}

pub trait Speaker: Send + Sync {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFut<'a>;
}

/// A spawned listening step that outlives a cancelled caller.
///
/// When the future from [`InFlight::resume_or_start`] is dropped (a typed
/// command won the race), the task keeps running and the next call awaits
/// that same task instead of opening a second capture on the device.
#[derive(Debug)]
pub struct InFlight<T> {
    task: Option<JoinHandle<T>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self { task: None }
    }
}

impl<T: Send + 'static> InFlight<T> {
    pub async fn resume_or_start<F>(&mut self, start: F) -> Result<T, VoiceError>
    where
        F: FnOnce() -> JoinHandle<T>,
    {
        let task = self.task.get_or_insert_with(start);
        let result = task.await;
        self.task = None;
        result.map_err(|e| VoiceError::Worker(e.to_string()))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Microphone capture transcribed by a speech-to-text model.
pub struct VoiceListener {
    microphone: Microphone,
    stt: Arc<dyn SpeechToText>,
    capture: InFlight<Result<Heard, VoiceError>>,
}

impl VoiceListener {
    #[must_use]
    pub fn new(microphone: Microphone, stt: Arc<dyn SpeechToText>) -> Self {
        Self {
            microphone,
            stt,
            capture: InFlight::default(),
        }
    }
}

async fn capture_and_transcribe(
    microphone: Microphone,
    stt: Arc<dyn SpeechToText>,
) -> Result<Heard, VoiceError> {
    let recording = tokio::task::spawn_blocking(move || microphone.record())
        .await
        .map_err(|e| VoiceError::Worker(e.to_string()))??;

    let Some(recording) = recording else {
        tracing::debug!("No speech before timeout");
        return Ok(Heard::Nothing);
    };
    tracing::debug!(
        samples = recording.samples.len(),
        sample_rate = recording.sample_rate,
        "Transcribing utterance"
    );
    let wav = encode_wav(&recording.samples, recording.sample_rate);
    let text = stt
        .transcribe(wav)
        .await
        .map_err(VoiceError::Transcription)?;
    let heard = Heard::from_transcript(&text);
    if heard == Heard::Nothing {
        tracing::debug!("Could not understand audio");
    }
    Ok(heard)
}

impl Listener for VoiceListener {
    fn listen(&mut self) -> ListenFut<'_> {
        Box::pin(async move {
            let microphone = self.microphone.clone();
            let stt = Arc::clone(&self.stt);
            self.capture
                .resume_or_start(move || tokio::spawn(capture_and_transcribe(microphone, stt)))
                .await?
        })
    }
}

/// Typed commands from standard input, one per line.
pub struct TextListener {
    lines: Lines<BufReader<Stdin>>,
}

impl TextListener {
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Listener for TextListener {
    fn listen(&mut self) -> ListenFut<'_> {
        Box::pin(async move {
            match self.lines.next_line().await? {
                Some(line) => Ok(Heard::from_transcript(&line)),
                None => Ok(Heard::Closed),
            }
        })
    }
}

/// Scripted input; closes once the queue is empty.
#[derive(Debug, Default)]
pub struct QueueListener {
    queue: VecDeque<Heard>,
}

impl QueueListener {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            queue: lines
                .into_iter()
                .map(|line| Heard::from_transcript(line.as_ref()))
                .collect(),
        }
    }

    pub fn push(&mut self, heard: Heard) {
        self.queue.push_back(heard);
    }
}

impl Listener for QueueListener {
    fn listen(&mut self) -> ListenFut<'_> {
        let next = self.queue.pop_front().unwrap_or(Heard::Closed);
        Box::pin(async move { Ok(next) })
    }
}

/// Text-to-speech model played through the default output device.
pub struct VoiceSpeaker {
    tts: Arc<dyn TextToSpeech>,
    player: AudioPlayer,
}

impl VoiceSpeaker {
    #[must_use]
    pub fn new(tts: Arc<dyn TextToSpeech>, player: AudioPlayer) -> Self {
        Self { tts, player }
    }
}

impl Speaker for VoiceSpeaker {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFut<'a> {
        Box::pin(async move {
            if text.trim().is_empty() {
                return Ok(());
            }
            let audio = self
                .tts
                .synthesize(text)
                .await
                .map_err(VoiceError::Synthesis)?;
            let player = self.player.clone();
            tokio::task::spawn_blocking(move || player.play_wav(audio))
                .await
                .map_err(|e| VoiceError::Worker(e.to_string()))?
        })
    }
}

/// External speech program (`espeak`, `say`, ...) given the text as its last
/// argument.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    gate: EchoGate,
}

impl CommandSpeaker {
    /// `command` is split on whitespace: `"espeak -s 160"`.
    #[must_use]
    pub fn new(command: &str, gate: EchoGate) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "espeak".to_string());
        Self {
            program,
            args: parts.collect(),
            gate,
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Speaker for CommandSpeaker {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFut<'a> {
        Box::pin(async move {
            if text.trim().is_empty() {
                return Ok(());
            }
            let _guard = self.gate.hold();
            let output = tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(text)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| VoiceError::Command {
                    program: self.program.clone(),
                    message: e.to_string(),
                })?;
            if output.status.success() {
                Ok(())
            } else {
                Err(VoiceError::Command {
                    program: self.program.clone(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        })
    }
}

/// Text-only mode: the front end shows what would have been said.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak<'a>(&'a self, _text: &'a str) -> SpeakFut<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Remembers everything it is asked to say.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|spoken| spoken.clone())
            .unwrap_or_default()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFut<'a> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[test]
    fn blank_transcripts_are_nothing() {
        assert_eq!(Heard::from_transcript("   "), Heard::Nothing);
        assert_eq!(
            Heard::from_transcript("  open notepad \n"),
            Heard::Speech("open notepad".to_string())
        );
    }

    fn spawn_capture(starts: &Arc<AtomicUsize>, release: &Arc<Notify>) -> JoinHandle<&'static str> {
        starts.fetch_add(1, Ordering::SeqCst);
        let release = Arc::clone(release);
        tokio::spawn(async move {
            release.notified().await;
            "hello"
        })
    }

    #[tokio::test]
    async fn cancelled_listen_resumes_the_same_capture() {
        let starts = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());
        let mut capture = InFlight::default();

        let first = tokio::time::timeout(
            Duration::from_millis(20),
            capture.resume_or_start(|| spawn_capture(&starts, &release)),
        )
        .await;
        assert!(first.is_err());
        assert!(capture.is_running());

        release.notify_one();
        let heard = capture
            .resume_or_start(|| spawn_capture(&starts, &release))
            .await
            .unwrap();
        assert_eq!(heard, "hello");
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(!capture.is_running());
    }

    #[tokio::test]
    async fn queue_listener_drains_then_closes() {
        let mut listener = QueueListener::new(["what time is it", "", "exit"]);
        assert_eq!(
            listener.listen().await.unwrap(),
            Heard::Speech("what time is it".to_string())
        );
        assert_eq!(listener.listen().await.unwrap(), Heard::Nothing);
        assert_eq!(listener.listen().await.unwrap(), Heard::Speech("exit".to_string()));
        assert_eq!(listener.listen().await.unwrap(), Heard::Closed);
        assert_eq!(listener.listen().await.unwrap(), Heard::Closed);
    }

    #[tokio::test]
    async fn recording_speaker_keeps_order() {
        let speaker = RecordingSpeaker::new();
        speaker.speak("one").await.unwrap();
        speaker.speak("two").await.unwrap();
        assert_eq!(speaker.spoken(), vec!["one", "two"]);
    }

    #[test]
    fn command_speaker_splits_arguments() {
        let speaker = CommandSpeaker::new("espeak -s 160", EchoGate::new());
        assert_eq!(speaker.program(), "espeak");
        assert_eq!(speaker.args, vec!["-s", "160"]);

        let fallback = CommandSpeaker::new("  ", EchoGate::new());
        assert_eq!(fallback.program(), "espeak");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_speaker_holds_gate_and_reports_failure() {
        let gate = EchoGate::new();
        let ok = CommandSpeaker::new("true", gate.clone());
        ok.speak("hello").await.unwrap();
        assert!(!gate.is_speaking());

        let failing = CommandSpeaker::new("false", gate.clone());
        let err = failing.speak("hello").await.unwrap_err();
        assert!(matches!(err, VoiceError::Command { ref program, .. } if program == "false"));
        assert!(!gate.is_speaking());
    }
}
