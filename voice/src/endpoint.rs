//! Energy-based endpointing: decide where an utterance starts and ends.
//!
//! The [`Endpointer`] is a pure state machine over fixed audio frames, so it
//! can be driven by the live microphone or by synthetic frames in tests.
//!
//! 1. **Calibrating** for `ambient` seconds: average the frame RMS to learn the
//!    room's noise level. The speech threshold becomes
//!    `max(energy_floor, ambient_rms * dynamic_ratio)`.
//! 2. **Waiting** up to `timeout` for a frame above the threshold.
//! 3. **Recording** until `pause` of continuous silence or `phrase_limit` of
//!    total recording.

use std::collections::VecDeque;
use std::time::Duration;

use nexus_config::VoiceConfig;

/// Audio kept from just before speech starts so soft onsets are not clipped.
const PRE_ROLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub energy_floor: f32,
    pub dynamic_ratio: f32,
    pub ambient: Duration,
    pub pause: Duration,
    pub timeout: Duration,
    pub phrase_limit: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from(&VoiceConfig::default())
    }
}

impl From<&VoiceConfig> for EndpointConfig {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            energy_floor: config.energy_threshold.max(0.0),
            dynamic_ratio: config.dynamic_ratio.max(1.0),
            ambient: seconds(config.ambient_seconds),
            pause: seconds(config.pause_seconds),
            timeout: seconds(config.timeout_seconds),
            phrase_limit: seconds(config.phrase_limit_seconds),
        }
    }
}

/// Millisecond precision; negative and NaN become zero.
fn seconds(value: f32) -> Duration {
    Duration::from_millis((value.max(0.0) * 1000.0).round() as u64)
}

/// What the caller should do after feeding a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Keep feeding frames.
    Pending,
    /// No speech started before the timeout.
    Timeout,
    /// A complete utterance, mono samples at the input rate.
    Utterance(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Calibrating { elapsed: Duration, energy: f64, frames: u32 },
    Waiting { elapsed: Duration },
    Recording { elapsed: Duration, silence: Duration },
    Finished,
}

#[derive(Debug)]
pub struct Endpointer {
    config: EndpointConfig,
    sample_rate: u32,
    phase: Phase,
    threshold: f32,
    pre_roll: VecDeque<f32>,
    utterance: Vec<f32>,
}

/// Root-mean-square energy of a frame; 0 for an empty frame.
#[must_use]
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / frame.len() as f64).sqrt() as f32
}

impl Endpointer {
    #[must_use]
    pub fn new(config: EndpointConfig, sample_rate: u32) -> Self {
        let phase = if config.ambient.is_zero() {
            Phase::Waiting {
                elapsed: Duration::ZERO,
            }
        } else {
            Phase::Calibrating {
                elapsed: Duration::ZERO,
                energy: 0.0,
                frames: 0,
            }
        };
        Self {
            threshold: config.energy_floor,
            config,
            sample_rate: sample_rate.max(1),
            phase,
            pre_roll: VecDeque::new(),
            utterance: Vec::new(),
        }
    }

    /// Current speech threshold (the floor until calibration finishes).
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.phase, Phase::Recording { .. })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn frame_duration(&self, frame: &[f32]) -> Duration {
        Duration::from_secs_f64(frame.len() as f64 / f64::from(self.sample_rate))
    }

    fn pre_roll_capacity(&self) -> usize {
        (PRE_ROLL.as_secs_f64() * f64::from(self.sample_rate)) as usize
    }

    pub fn push(&mut self, frame: &[f32]) -> Endpoint {
        let duration = self.frame_duration(frame);
        let energy = rms(frame);

        match self.phase {
            Phase::Finished => Endpoint::Pending,
            Phase::Calibrating {
                elapsed,
                energy: total,
                frames,
            } => {
                let elapsed = elapsed + duration;
                let total = total + f64::from(energy);
                let frames = frames + 1;
                if elapsed >= self.config.ambient {
                    let ambient = (total / f64::from(frames)) as f32;
                    self.threshold = self
                        .config
                        .energy_floor
                        .max(ambient * self.config.dynamic_ratio);
                    tracing::debug!(ambient, threshold = self.threshold, "Ambient calibration done");
                    self.phase = Phase::Waiting {
                        elapsed: Duration::ZERO,
                    };
                } else {
                    self.phase = Phase::Calibrating {
                        elapsed,
                        energy: total,
                        frames,
                    };
                }
                Endpoint::Pending
            }
            Phase::Waiting { elapsed } => {
                if energy > self.threshold {
                    self.utterance = self.pre_roll.drain(..).collect();
                    self.utterance.extend_from_slice(frame);
                    self.phase = Phase::Recording {
                        elapsed: duration,
                        silence: Duration::ZERO,
                    };
                    return self.finish_if_limited();
                }

                self.pre_roll.extend(frame.iter().copied());
                let capacity = self.pre_roll_capacity();
                if self.pre_roll.len() > capacity {
                    let excess = self.pre_roll.len() - capacity;
                    self.pre_roll.drain(..excess);
                }

                let elapsed = elapsed + duration;
                if elapsed >= self.config.timeout {
                    self.phase = Phase::Finished;
                    return Endpoint::Timeout;
                }
                self.phase = Phase::Waiting { elapsed };
                Endpoint::Pending
            }
            Phase::Recording { elapsed, silence } => {
                self.utterance.extend_from_slice(frame);
                let silence = if energy > self.threshold {
                    Duration::ZERO
                } else {
                    silence + duration
                };
                self.phase = Phase::Recording {
                    elapsed: elapsed + duration,
                    silence,
                };
                if silence >= self.config.pause {
                    self.phase = Phase::Finished;
                    return Endpoint::Utterance(std::mem::take(&mut self.utterance));
                }
                self.finish_if_limited()
            }
        }
    }

    fn finish_if_limited(&mut self) -> Endpoint {
        if let Phase::Recording { elapsed, .. } = self.phase
            && elapsed >= self.config.phrase_limit
        {
            self.phase = Phase::Finished;
            return Endpoint::Utterance(std::mem::take(&mut self.utterance));
        }
        Endpoint::Pending
    }

    /// Deadline for the whole capture, used to stop waiting on a device that
    /// stops delivering frames (for example while the echo gate is held).
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.config.ambient + self.config.timeout + self.config.phrase_limit
    }

    /// End the capture early, keeping whatever was recorded.
    pub fn finish(&mut self) -> Endpoint {
        let was_recording = self.is_recording();
        self.phase = Phase::Finished;
        if was_recording && !self.utterance.is_empty() {
            Endpoint::Utterance(std::mem::take(&mut self.utterance))
        } else {
            Endpoint::Timeout
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    /// 100 ms frames at 1 kHz.
    fn frame(level: f32) -> Vec<f32> {
        vec![level; 100]
    }

    fn config() -> EndpointConfig {
        EndpointConfig {
            energy_floor: 0.01,
            dynamic_ratio: 1.5,
            ambient: Duration::from_millis(200),
            pause: Duration::from_millis(300),
            timeout: Duration::from_secs(1),
            phrase_limit: Duration::from_secs(2),
        }
    }

    fn feed(endpointer: &mut Endpointer, level: f32, count: usize) -> Endpoint {
        let mut last = Endpoint::Pending;
        for _ in 0..count {
            last = endpointer.push(&frame(level));
            if last != Endpoint::Pending {
                break;
            }
        }
        last
    }

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn calibration_raises_threshold_above_noisy_room() {
        let mut endpointer = Endpointer::new(config(), RATE);
        assert_eq!(feed(&mut endpointer, 0.1, 2), Endpoint::Pending);
        assert!((endpointer.threshold() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn quiet_room_keeps_the_floor() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.001, 2);
        assert!((endpointer.threshold() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn silence_times_out() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.0, 2);
        assert_eq!(feed(&mut endpointer, 0.0, 20), Endpoint::Timeout);
        assert!(endpointer.is_finished());
    }

    #[test]
    fn pause_ends_the_utterance_with_pre_roll() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.0, 2);
        feed(&mut endpointer, 0.0, 3);
        assert_eq!(feed(&mut endpointer, 0.5, 4), Endpoint::Pending);
        assert!(endpointer.is_recording());

        let Endpoint::Utterance(samples) = feed(&mut endpointer, 0.0, 10) else {
            panic!("expected an utterance");
        };
        // 300 ms pre-roll + 400 ms speech + 300 ms trailing pause.
        assert_eq!(samples.len(), 1000);
        assert_eq!(samples[300], 0.5);
    }

    #[test]
    fn brief_dips_do_not_end_the_utterance() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.0, 2);
        feed(&mut endpointer, 0.5, 2);
        assert_eq!(feed(&mut endpointer, 0.0, 2), Endpoint::Pending);
        assert_eq!(feed(&mut endpointer, 0.5, 2), Endpoint::Pending);
        assert!(endpointer.is_recording());
    }

    #[test]
    fn phrase_limit_cuts_long_speech() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.0, 2);
        let Endpoint::Utterance(samples) = feed(&mut endpointer, 0.5, 100) else {
            panic!("expected an utterance");
        };
        assert_eq!(samples.len(), 2000);
    }

    #[test]
    fn finish_returns_partial_speech() {
        let mut endpointer = Endpointer::new(config(), RATE);
        feed(&mut endpointer, 0.0, 2);
        feed(&mut endpointer, 0.5, 1);
        assert!(matches!(endpointer.finish(), Endpoint::Utterance(s) if s.len() == 100));

        let mut idle = Endpointer::new(config(), RATE);
        assert_eq!(idle.finish(), Endpoint::Timeout);
    }

    #[test]
    fn config_converts_seconds() {
        let config = EndpointConfig::from(&VoiceConfig::default());
        assert_eq!(config.pause, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.phrase_limit, Duration::from_secs(15));
        assert_eq!(config.ambient, Duration::from_millis(1200));
    }
}
