//! Application orchestrator: wires configuration, audio, queues, matcher and
//! the PTY session together and runs the shell to completion.

use crate::audio::{AudioDevice, AudioFormat, PlaybackGate};
use crate::matcher::TriggerMatcher;
use crate::queue::TriggerQueue;
use anyhow::{Context, Result, anyhow};
use chirp_config::Config;
use chirp_terminal::{Session, SessionConfig, SessionIo, SessionObserver};
use std::sync::Arc;

pub struct Chirp {
    gate: Arc<PlaybackGate>,
    queues: Vec<Arc<TriggerQueue>>,
    matcher: Arc<TriggerMatcher>,
    session: Session,
}

impl Chirp {
    /// Build the feedback engine for `config`, playing through `device`, and
    /// prepare (but do not start) a session running `shell`.
    ///
    /// Starts one consumer thread per enabled trigger.
    pub fn new(config: &Config, device: Arc<dyn AudioDevice>, shell: String) -> Result<Self> {
        let settings = &config.settings;
        log::info!(
            "Audio: {} device, {} Hz x{}, min gap {:?}",
            device.name(),
            settings.sample_rate,
            settings.channels,
            settings.min_gap()
        );
        let gate = Arc::new(PlaybackGate::new(
            device,
            AudioFormat::from_settings(settings),
            settings.min_gap(),
            settings.envelope,
        ));

        let mut matcher = TriggerMatcher::new(settings.echo_timeout(), settings.burst_threshold);
        let mut queues = Vec::new();
        for trigger in config.enabled_triggers() {
            let sample = config.sample_for(trigger).cloned().ok_or_else(|| {
                anyhow!(
                    "Trigger '{}' references unknown sample '{}'",
                    trigger.name,
                    trigger.sample
                )
            })?;
            let queue = TriggerQueue::spawn(trigger, sample, Arc::clone(&gate))
                .with_context(|| format!("Failed to start queue for trigger '{}'", trigger.name))?;
            let queue = Arc::new(queue);
            matcher.add_trigger(trigger, Arc::clone(&queue));
            queues.push(queue);
        }
        log::info!("Loaded {} trigger(s)", queues.len());

        let matcher = Arc::new(matcher);
        let observer: Arc<dyn SessionObserver> = matcher.clone();
        let session = Session::new(SessionConfig::new(shell), observer);

        Ok(Self {
            gate,
            queues,
            matcher,
            session,
        })
    }

    pub fn gate(&self) -> &Arc<PlaybackGate> {
        &self.gate
    }

    pub fn queues(&self) -> &[Arc<TriggerQueue>] {
        &self.queues
    }

    pub fn matcher(&self) -> &Arc<TriggerMatcher> {
        &self.matcher
    }

    /// Run the shell until it exits and return its exit code.
    pub fn run(&self, io: SessionIo) -> Result<i32> {
        if let Err(e) = self.session.start(io) {
            self.shutdown();
            return Err(e).context("Failed to start shell session");
        }

        let status = self.session.wait();
        self.shutdown();
        let code = status.context("Shell session failed")?;
        log::info!("Shell exited with code {}", code);
        Ok(code)
    }

    /// Stop the session (if running) and every queue. Idempotent.
    pub fn stop(&self) {
        self.session.stop();
        for queue in &self.queues {
            queue.stop();
        }
    }

    /// Stop everything and wait for the queue consumers to exit, then log
    /// the counters.
    pub fn shutdown(&self) {
        self.stop();
        for queue in &self.queues {
            queue.join();
        }
        self.log_stats();
    }

    fn log_stats(&self) {
        let m = self.matcher.stats();
        log::info!(
            "Matcher: {} matches, {} echo bytes suppressed, {} bursts suppressed",
            m.matches,
            m.echo_suppressed,
            m.burst_suppressed
        );
        for queue in &self.queues {
            let q = queue.stats();
            log::info!(
                "Queue '{}': {} accepted, {} dropped, {} played",
                queue.name(),
                q.accepted,
                q.dropped,
                q.played
            );
        }
        let g = self.gate.stats();
        log::info!(
            "Gate: {} played, {} suppressed, {} failed, {} cache hits",
            g.played,
            g.suppressed,
            g.failed,
            g.cache_hits
        );
    }
}

impl Drop for Chirp {
    fn drop(&mut self) {
        self.stop();
    }
}
