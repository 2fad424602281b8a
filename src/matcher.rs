//! Echo-aware trigger matching.
//!
//! The matcher sits on the session's copy loops. Input bytes are recorded in
//! a short-lived window; an output byte found in that window is taken to be
//! the shell echoing what the user typed and does not trigger anything.
//! Output reads with more printable characters than the burst threshold
//! (screen redraws, `cat` of a file) are ignored wholesale.

use crate::queue::TriggerQueue;
use chirp_config::{MatchSource, TriggerConfig};
use chirp_terminal::SessionObserver;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Recently typed bytes, each kept for at most `timeout`.
///
/// Expired entries are pruned on every access.
pub struct RecentInput {
    timeout: Duration,
    entries: Mutex<VecDeque<(u8, Instant)>>,
}

impl RecentInput {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn prune(&self, entries: &mut VecDeque<(u8, Instant)>, now: Instant) {
        while entries
            .front()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) > self.timeout)
        {
            entries.pop_front();
        }
    }

    /// Record every byte of `data` as typed at `now`.
    pub fn record(&self, data: &[u8], now: Instant) {
        let mut entries = self.entries.lock();
        self.prune(&mut entries, now);
        entries.extend(data.iter().map(|&b| (b, now)));
    }

    /// Whether `byte` was typed within the timeout.
    pub fn contains(&self, byte: u8, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        self.prune(&mut entries, now);
        entries.iter().any(|(b, _)| *b == byte)
    }

    /// The set of bytes typed within the timeout, as a lookup table.
    fn snapshot(&self, now: Instant) -> [bool; 256] {
        let mut entries = self.entries.lock();
        self.prune(&mut entries, now);
        let mut present = [false; 256];
        for (b, _) in entries.iter() {
            present[usize::from(*b)] = true;
        }
        present
    }

    pub fn len(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        self.prune(&mut entries, now);
        entries.len()
    }

    pub fn is_empty(&self, now: Instant) -> bool {
        self.len(now) == 0
    }
}

/// Snapshot of the matcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcherStats {
    /// Pattern matches handed to a queue (accepted or not).
    pub matches: u64,
    /// Output bytes skipped as echoes of recent input.
    pub echo_suppressed: u64,
    /// Output reads skipped as bursts.
    pub burst_suppressed: u64,
}

struct Rule {
    name: String,
    patterns: Vec<Vec<u8>>,
    source: MatchSource,
    queue: Arc<TriggerQueue>,
}

impl Rule {
    fn wants(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.source.matches_input(),
            Direction::Output => self.source.matches_output(),
        }
    }

    /// Length of the longest pattern that starts at `data[0]`.
    fn match_len(&self, data: &[u8]) -> Option<usize> {
        self.patterns
            .iter()
            .filter(|p| data.starts_with(p))
            .map(Vec::len)
            .max()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

pub struct TriggerMatcher {
    recent: RecentInput,
    burst_threshold: usize,
    rules: Vec<Rule>,
    matches: AtomicU64,
    echo_suppressed: AtomicU64,
    burst_suppressed: AtomicU64,
}

impl TriggerMatcher {
    pub fn new(echo_timeout: Duration, burst_threshold: usize) -> Self {
        Self {
            recent: RecentInput::new(echo_timeout),
            burst_threshold,
            rules: Vec::new(),
            matches: AtomicU64::new(0),
            echo_suppressed: AtomicU64::new(0),
            burst_suppressed: AtomicU64::new(0),
        }
    }

    /// Route matches of `trigger`'s patterns to `queue`.
    pub fn add_trigger(&mut self, trigger: &TriggerConfig, queue: Arc<TriggerQueue>) {
        self.rules.push(Rule {
            name: trigger.name.clone(),
            patterns: trigger.pattern_bytes(),
            source: trigger.source,
            queue,
        });
    }

    pub fn on_input_at(&self, data: &[u8], now: Instant) {
        self.recent.record(data, now);
        self.scan(data, Direction::Input, None);
    }

    pub fn on_output_at(&self, data: &[u8], now: Instant) {
        let printable = data
            .iter()
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .count();
        if printable > self.burst_threshold {
            self.burst_suppressed.fetch_add(1, Ordering::Relaxed);
            log::trace!("Output burst of {} printable bytes, not matching", printable);
            return;
        }

        let echoes = self.recent.snapshot(now);
        self.scan(data, Direction::Output, Some(&echoes));
    }

    /// Walk `data`, enqueueing every trigger that matches at each position.
    /// A match consumes the longest span any trigger matched there. A span
    /// whose first byte is an echo is skipped whole.
    fn scan(&self, data: &[u8], direction: Direction, echoes: Option<&[bool; 256]>) {
        let mut i = 0;
        while i < data.len() {
            let rest = &data[i..];
            let rules = self.rules.iter().filter(|rule| rule.wants(direction));

            if echoes.is_some_and(|e| e[usize::from(data[i])]) {
                let span = rules
                    .filter_map(|rule| rule.match_len(rest))
                    .max()
                    .unwrap_or(1)
                    .max(1);
                self.echo_suppressed.fetch_add(span as u64, Ordering::Relaxed);
                i += span;
                continue;
            }

            let mut span = 0;
            for rule in rules {
                if let Some(len) = rule.match_len(rest) {
                    self.matches.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Trigger '{}' matched {:?}", rule.name, &rest[..len]);
                    rule.queue.enqueue();
                    span = span.max(len);
                }
            }
            i += span.max(1);
        }
    }

    pub fn stats(&self) -> MatcherStats {
        MatcherStats {
            matches: self.matches.load(Ordering::Relaxed),
            echo_suppressed: self.echo_suppressed.load(Ordering::Relaxed),
            burst_suppressed: self.burst_suppressed.load(Ordering::Relaxed),
        }
    }
}

impl SessionObserver for TriggerMatcher {
    fn on_input(&self, data: &[u8]) {
        self.on_input_at(data, Instant::now());
    }

    fn on_output(&self, data: &[u8]) {
        self.on_output_at(data, Instant::now());
    }
}
