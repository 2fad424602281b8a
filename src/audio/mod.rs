//! Tone synthesis and playback.
//!
//! - [`synth`] renders ADSR-enveloped sine tones into 16-bit PCM
//! - [`device`] is the output seam: a real `rodio` device or a simulated one
//! - [`gate`] is the single minimum-gap gate and rendered-buffer cache that
//!   every trigger plays through

pub mod device;
pub mod error;
pub mod gate;
pub mod synth;

pub use device::{AudioDevice, SimulatedDevice, open_device};
#[cfg(feature = "audio")]
pub use device::RodioDevice;
pub use error::AudioError;
pub use gate::{GateStats, PlayOutcome, PlaybackGate};

use chirp_config::{EnvelopeConfig, SampleConfig, Settings};
use std::time::Duration;

/// Bytes per sample in the PCM format (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// PCM layout handed to a device: interleaved signed 16-bit little-endian
/// samples, no container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.sample_rate, settings.channels)
    }

    /// Size of one frame (one sample for every channel) in bytes.
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channels) * BYTES_PER_SAMPLE
    }

    /// Playback time of a PCM buffer of `len` bytes in this format.
    pub fn duration_of(&self, len: usize) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = len / self.frame_bytes();
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Everything needed to render one tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Hz.
    pub frequency: f64,
    pub duration: Duration,
    /// Peak amplitude, 0.0 to 1.0.
    pub volume: f64,
    pub envelope: EnvelopeConfig,
}

impl Tone {
    pub fn new(frequency: f64, duration: Duration, volume: f64) -> Self {
        Self {
            frequency,
            duration,
            volume,
            envelope: EnvelopeConfig::default(),
        }
    }

    /// Tone for a configured sample; the sample's own envelope wins over
    /// `default_envelope`.
    pub fn from_sample(sample: &SampleConfig, default_envelope: EnvelopeConfig) -> Self {
        Self {
            frequency: sample.frequency,
            duration: sample.duration(),
            volume: sample.volume,
            envelope: sample.envelope.unwrap_or(default_envelope),
        }
    }

    /// Renders to an empty buffer.
    pub fn is_silent(&self) -> bool {
        self.volume <= 0.0 || self.duration.is_zero()
    }
}
