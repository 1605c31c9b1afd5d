//! Microphone capture through `cpal`.
//!
//! The cpal stream is created, driven and dropped on the calling thread;
//! callers run [`Microphone::record`] inside `spawn_blocking`.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

use crate::endpoint::{EndpointConfig, Endpoint, Endpointer};
use crate::error::VoiceError;
use crate::gate::EchoGate;
use crate::wav::downmix;

/// How long to wait for the next buffer before re-checking the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A recorded utterance, mono at the device's native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Default input device plus endpointing settings.
#[derive(Debug, Clone)]
pub struct Microphone {
    endpoint: EndpointConfig,
    gate: EchoGate,
}

impl Microphone {
    #[must_use]
    pub fn new(endpoint: EndpointConfig, gate: EchoGate) -> Self {
        Self { endpoint, gate }
    }

    /// Calibrate, wait for speech and record one utterance.
    ///
    /// Returns `Ok(None)` when nobody spoke before the timeout. Blocks the
    /// current thread.
    pub fn record(&self) -> Result<Option<Recording>, VoiceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(VoiceError::NoInputDevice)?;
        let supported = device
            .default_input_config()
            .map_err(|e| VoiceError::InputStream(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;

        tracing::debug!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels = config.channels,
            ?sample_format,
            "Opening microphone"
        );

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, self.gate.clone(), tx),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, self.gate.clone(), tx),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, self.gate.clone(), tx),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, self.gate.clone(), tx),
            other => {
                return Err(VoiceError::InputStream(format!(
                    "Unsupported sample format: {other:?}"
                )));
            }
        }
        .map_err(|e| VoiceError::InputStream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| VoiceError::InputStream(e.to_string()))?;

        let mut endpointer = Endpointer::new(self.endpoint.clone(), sample_rate);
        let deadline = Instant::now() + endpointer.max_duration() + Duration::from_secs(1);

        let outcome = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => match endpointer.push(&frame) {
                    Endpoint::Pending => {}
                    done => break done,
                },
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(VoiceError::InputStream(
                        "input stream closed unexpectedly".to_string(),
                    ));
                }
            }
            if Instant::now() >= deadline {
                break endpointer.finish();
            }
        };
        drop(stream);

        Ok(match outcome {
            Endpoint::Utterance(samples) if !samples.is_empty() => Some(Recording {
                samples,
                sample_rate,
            }),
            _ => None,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    gate: EchoGate,
    tx: mpsc::Sender<Vec<f32>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels;
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Drop our own voice while the assistant is talking.
            if gate.is_speaking() {
                return;
            }
            let samples: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            let _ = tx.send(downmix(&samples, channels));
        },
        |err| tracing::error!(%err, "Audio input stream error"),
        None,
    )
}

/// Name of the default input device, for diagnostics.
pub fn input_device_name() -> Result<String, VoiceError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or(VoiceError::NoInputDevice)?;
    device
        .name()
        .map_err(|e| VoiceError::InputStream(e.to_string()))
}
