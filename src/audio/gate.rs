//! The playback gate shared by every trigger queue.
//!
//! One gate per process: it holds the last-play timestamp that enforces the
//! minimum gap across all triggers, and the cache of rendered buffers.

use super::synth;
use super::{AudioDevice, AudioFormat, Tone};
use chirp_config::{EnvelopeConfig, SampleConfig};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Result of a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The buffer was handed to the device and finished playing.
    Played,
    /// Another tone started less than the minimum gap ago.
    Suppressed,
    /// The tone renders to nothing, so the device was not called.
    Empty,
    /// The device reported an error; it has been logged.
    Failed,
}

/// Cache key: the exact bits of everything that shapes the rendered buffer.
/// The format is fixed per gate, so it is not part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ToneKey {
    frequency: u64,
    duration: Duration,
    volume: u64,
    envelope: [u64; 4],
}

impl ToneKey {
    fn new(tone: &Tone) -> Self {
        let env = &tone.envelope;
        Self {
            frequency: tone.frequency.to_bits(),
            duration: tone.duration,
            volume: tone.volume.to_bits(),
            envelope: [
                env.attack.to_bits(),
                env.decay.to_bits(),
                env.sustain.to_bits(),
                env.release.to_bits(),
            ],
        }
    }
}

/// Snapshot of the gate's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub played: u64,
    pub suppressed: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct PlaybackGate {
    device: Arc<dyn AudioDevice>,
    format: AudioFormat,
    min_gap: Duration,
    default_envelope: EnvelopeConfig,
    last_play: Mutex<Option<Instant>>,
    cache: RwLock<HashMap<ToneKey, Arc<[u8]>>>,
    played: AtomicU64,
    suppressed: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl PlaybackGate {
    pub fn new(
        device: Arc<dyn AudioDevice>,
        format: AudioFormat,
        min_gap: Duration,
        default_envelope: EnvelopeConfig,
    ) -> Self {
        Self {
            device,
            format,
            min_gap,
            default_envelope,
            last_play: Mutex::new(None),
            cache: RwLock::new(HashMap::new()),
            played: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Play `sample` unless another tone started within the minimum gap.
    ///
    /// Blocks until the device finishes. Device errors are logged and
    /// reported as [`PlayOutcome::Failed`], never returned.
    pub fn request_play(&self, sample: &SampleConfig) -> PlayOutcome {
        self.request_play_at(sample, Instant::now())
    }

    /// [`request_play`](Self::request_play) with an explicit clock reading.
    pub fn request_play_at(&self, sample: &SampleConfig, now: Instant) -> PlayOutcome {
        if !self.try_claim(now) {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            log::trace!("Suppressed '{}': within minimum gap", sample.name);
            return PlayOutcome::Suppressed;
        }

        let tone = Tone::from_sample(sample, self.default_envelope);
        if tone.is_silent() {
            return PlayOutcome::Empty;
        }
        let pcm = self.buffer_for(&tone);

        match self.device.play(&pcm, self.format) {
            Ok(()) => {
                self.played.fetch_add(1, Ordering::Relaxed);
                log::trace!("Played '{}' ({} bytes)", sample.name, pcm.len());
                PlayOutcome::Played
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("Failed to play '{}' on {}: {}", sample.name, self.device.name(), e);
                PlayOutcome::Failed
            }
        }
    }

    /// Check the gap and, if clear, mark `now` as the last play in the same
    /// critical section.
    fn try_claim(&self, now: Instant) -> bool {
        let mut last = self.last_play.lock();
        if let Some(prev) = *last
            && now.saturating_duration_since(prev) < self.min_gap
        {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Cached PCM for `tone`, rendering it on first use.
    fn buffer_for(&self, tone: &Tone) -> Arc<[u8]> {
        let key = ToneKey::new(tone);
        if let Some(pcm) = self.cache.read().get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(pcm);
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let rendered: Arc<[u8]> = synth::render(tone, self.format).into();
        log::debug!(
            "Rendered {:.1} Hz tone for {:?} ({} bytes)",
            tone.frequency,
            tone.duration,
            rendered.len()
        );
        // Two consumers may race on the same miss; the first insert wins.
        Arc::clone(self.cache.write().entry(key).or_insert(rendered))
    }

    /// Number of distinct buffers rendered so far.
    pub fn cached_buffers(&self) -> usize {
        self.cache.read().len()
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            played: self.played.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}
