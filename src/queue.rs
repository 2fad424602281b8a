//! Per-trigger playback queues.
//!
//! Each trigger owns a bounded mailbox and one consumer thread that plays
//! its sample through the shared [`PlaybackGate`], one item at a time in
//! arrival order. `enqueue` never blocks: when the trigger already has
//! `max_length` items queued or playing, the new item is dropped.

use crate::audio::{PlayOutcome, PlaybackGate};
use chirp_config::{SampleConfig, TriggerConfig};
use chirp_terminal::StopSignal;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Snapshot of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted by `enqueue`.
    pub accepted: u64,
    /// Items rejected because the queue was full or stopped.
    pub dropped: u64,
    /// Items taken off the mailbox and handed to the gate.
    pub consumed: u64,
    /// Consumed items the gate actually played.
    pub played: u64,
}

pub struct TriggerQueue {
    inner: Arc<QueueInner>,
    sender: Sender<Instant>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct QueueInner {
    name: String,
    sample: SampleConfig,
    capacity: usize,
    /// Items queued plus the one playing, if any.
    pending: AtomicUsize,
    gate: Arc<PlaybackGate>,
    stop: StopSignal,
    accepted: AtomicU64,
    dropped: AtomicU64,
    consumed: AtomicU64,
    played: AtomicU64,
}

impl TriggerQueue {
    /// Create the queue for `trigger` and start its consumer thread.
    pub fn spawn(
        trigger: &TriggerConfig,
        sample: SampleConfig,
        gate: Arc<PlaybackGate>,
    ) -> io::Result<Self> {
        let capacity = trigger.max_length.max(1);
        let (sender, receiver) = bounded(capacity);
        let inner = Arc::new(QueueInner {
            name: trigger.name.clone(),
            sample,
            capacity,
            pending: AtomicUsize::new(0),
            gate,
            stop: StopSignal::new(),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            played: AtomicU64::new(0),
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name(format!("chirp-queue-{}", trigger.name))
            .spawn(move || worker_inner.run(receiver))?;
        log::debug!(
            "Started queue '{}' (sample '{}', max_length {})",
            inner.name,
            inner.sample.name,
            capacity
        );

        Ok(Self {
            inner,
            sender,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue one playback. Returns `false` if the item was dropped.
    pub fn enqueue(&self) -> bool {
        let inner = &self.inner;
        if inner.stop.is_stopped() {
            inner.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let reserved = inner
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < inner.capacity).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            inner.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("Queue '{}' full, dropping item", inner.name);
            return false;
        }

        match self.sender.try_send(Instant::now()) {
            Ok(()) => {
                inner.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                inner.pending.fetch_sub(1, Ordering::SeqCst);
                inner.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Queue '{}' not accepting, dropping item", inner.name);
                false
            }
        }
    }

    /// Tell the consumer to exit. Queued items are discarded; a playback in
    /// progress finishes. Idempotent.
    pub fn stop(&self) {
        if self.inner.stop.stop() {
            log::debug!("Stopping queue '{}'", self.inner.name);
        }
    }

    /// Stop and wait for the consumer thread to exit.
    pub fn join(&self) {
        self.stop();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            log::error!("Queue '{}' consumer panicked", self.inner.name);
        }
    }

    /// Items queued or playing right now.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QueueStats {
        let inner = &self.inner;
        QueueStats {
            accepted: inner.accepted.load(Ordering::Relaxed),
            dropped: inner.dropped.load(Ordering::Relaxed),
            consumed: inner.consumed.load(Ordering::Relaxed),
            played: inner.played.load(Ordering::Relaxed),
        }
    }
}

impl Drop for TriggerQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

impl QueueInner {
    fn run(&self, receiver: Receiver<Instant>) {
        let stopped = self.stop.receiver();
        loop {
            select! {
                recv(stopped) -> _ => break,
                recv(receiver) -> item => {
                    let Ok(queued_at) = item else { break };
                    // Both channels may be ready at once; stop wins.
                    if self.stop.is_stopped() {
                        break;
                    }
                    self.play(queued_at);
                }
            }
        }
        log::debug!("Queue '{}' consumer exiting", self.name);
    }

    fn play(&self, queued_at: Instant) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "Queue '{}' playing item queued {:?} ago",
            self.name,
            queued_at.elapsed()
        );
        if self.gate.request_play(&self.sample) == PlayOutcome::Played {
            self.played.fetch_add(1, Ordering::Relaxed);
        }
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioDevice, AudioError, AudioFormat, SimulatedDevice};
    use chirp_config::EnvelopeConfig;
    use std::time::Duration;

    /// Sleeps for the buffer's duration and records when each play ran.
    #[derive(Default)]
    struct RecordingDevice {
        plays: Mutex<Vec<(Instant, Instant)>>,
    }

    impl AudioDevice for RecordingDevice {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn play(&self, pcm: &[u8], format: AudioFormat) -> Result<(), AudioError> {
            let start = Instant::now();
            thread::sleep(format.duration_of(pcm.len()));
            self.plays.lock().push((start, Instant::now()));
            Ok(())
        }
    }

    fn spawn_queue(
        device: Arc<dyn AudioDevice>,
        max_length: usize,
        duration_ms: u64,
    ) -> TriggerQueue {
        let gate = Arc::new(PlaybackGate::new(
            device,
            AudioFormat::new(8_000, 1),
            Duration::ZERO,
            EnvelopeConfig::default(),
        ));
        let trigger = TriggerConfig::new("enter", &["\n"], "beep", max_length);
        let sample = SampleConfig::new("beep", 440.0, duration_ms, 0.5);
        TriggerQueue::spawn(&trigger, sample, gate).unwrap()
    }

    fn setup(max_length: usize, duration_ms: u64) -> (TriggerQueue, Arc<SimulatedDevice>) {
        let device = Arc::new(SimulatedDevice::with_playback_time());
        (spawn_queue(device.clone(), max_length, duration_ms), device)
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_overflow_drops_without_blocking() {
        let (queue, device) = setup(2, 100);

        let start = Instant::now();
        let accepted = (0..7).filter(|_| queue.enqueue()).count();
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(accepted, 2);

        wait_for(|| queue.pending() == 0);
        queue.join();

        let stats = queue.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 5);
        assert_eq!(stats.consumed, 2);
        assert_eq!(device.play_count(), 2);
    }

    #[test]
    fn test_item_playing_counts_against_capacity() {
        let (queue, device) = setup(1, 100);

        assert!(queue.enqueue());
        wait_for(|| device.play_count() == 1);
        // The first item is still playing.
        assert!(!queue.enqueue());

        wait_for(|| queue.pending() == 0);
        assert!(queue.enqueue());
        wait_for(|| queue.pending() == 0);
        queue.join();

        assert_eq!(device.play_count(), 2);
    }

    #[test]
    fn test_stop_is_idempotent_and_rejects_new_items() {
        let (queue, device) = setup(4, 10);
        queue.stop();
        queue.stop();
        assert!(!queue.enqueue());
        queue.join();
        queue.join();

        assert_eq!(queue.stats().dropped, 1);
        assert_eq!(device.play_count(), 0);
    }

    #[test]
    fn test_stop_lets_current_playback_finish() {
        let (queue, device) = setup(1, 100);
        assert!(queue.enqueue());
        wait_for(|| device.play_count() == 1);

        queue.join();
        assert_eq!(queue.stats().consumed, 1);
        assert_eq!(queue.stats().played, 1);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_playbacks_never_overlap() {
        let device = Arc::new(RecordingDevice::default());
        let queue = spawn_queue(device.clone(), 3, 40);

        let enqueued_at = Instant::now();
        assert_eq!((0..3).filter(|_| queue.enqueue()).count(), 3);
        wait_for(|| queue.pending() == 0);
        queue.join();

        let plays = device.plays.lock().clone();
        assert_eq!(plays.len(), 3);
        assert!(plays[0].0 >= enqueued_at);
        for pair in plays.windows(2) {
            let (_, prev_end) = pair[0];
            let (start, _) = pair[1];
            assert!(start >= prev_end, "playback started before the previous one ended");
        }
        assert_eq!(queue.stats().played, 3);
    }
}
