//! ADSR-enveloped sine tone renderer.
//!
//! Output is interleaved signed 16-bit little-endian PCM with every channel
//! carrying the same signal. Rendering is pure: the same tone and format
//! always produce the same bytes, which the gate's cache relies on.

use super::{AudioFormat, BYTES_PER_SAMPLE, Tone};
use chirp_config::EnvelopeConfig;
use std::f64::consts::TAU;

/// Envelope level at `progress` (0.0 at the first sample, approaching 1.0
/// at the last).
///
/// Phases are checked in order attack, decay, release; a zero-length phase
/// is skipped, so no sample is ever in two phases.
pub fn envelope_at(progress: f64, env: &EnvelopeConfig) -> f64 {
    if env.attack > 0.0 && progress < env.attack {
        return progress / env.attack;
    }

    let decay_end = env.attack + env.decay;
    if env.decay > 0.0 && progress < decay_end {
        let p = (progress - env.attack) / env.decay;
        return 1.0 - p * (1.0 - env.sustain);
    }

    let release_start = 1.0 - env.release;
    if env.release > 0.0 && progress > release_start {
        let p = (progress - release_start) / env.release;
        return env.sustain * (1.0 - p);
    }

    env.sustain
}

/// Number of frames a tone occupies at `sample_rate`.
pub fn frame_count(tone: &Tone, sample_rate: u32) -> usize {
    (f64::from(sample_rate) * tone.duration.as_secs_f64()).round() as usize
}

/// Render `tone` as PCM in `format`. Silent tones render to an empty buffer.
pub fn render(tone: &Tone, format: AudioFormat) -> Vec<u8> {
    if tone.is_silent() || format.channels == 0 || format.sample_rate == 0 {
        return Vec::new();
    }

    let frames = frame_count(tone, format.sample_rate);
    let channels = usize::from(format.channels);
    let rate = f64::from(format.sample_rate);
    let amplitude = tone.volume * f64::from(i16::MAX);

    let mut pcm = Vec::with_capacity(frames * channels * BYTES_PER_SAMPLE);
    for i in 0..frames {
        let t = i as f64 / rate;
        let progress = i as f64 / frames as f64;
        let value = amplitude
            * envelope_at(progress, &tone.envelope)
            * (TAU * tone.frequency * t).sin();
        // `as` saturates, so rounding error at full volume cannot wrap.
        let bytes = (value as i16).to_le_bytes();
        for _ in 0..channels {
            pcm.extend_from_slice(&bytes);
        }
    }
    pcm
}
