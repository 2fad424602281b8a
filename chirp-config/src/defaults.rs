//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute so a partially written config file still loads.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Sound-State Gate ───────────────────────────────────────────────────────

/// Minimum time between the start of two tones, across all triggers.
pub fn min_gap_ms() -> u64 {
    25
}

// ── Echo detection ─────────────────────────────────────────────────────────

/// Age limit of the recent-input window.
///
/// A keystroke echoed by the shell usually comes back within a few
/// milliseconds; anything older is treated as genuine output.
pub fn echo_timeout_ms() -> u64 {
    20
}

/// Printable characters in a single output read above which the read is
/// considered a redraw and produces no feedback at all.
pub fn burst_threshold() -> usize {
    100
}

// ── Audio format ───────────────────────────────────────────────────────────

pub fn sample_rate() -> u32 {
    48_000
}

pub fn channels() -> u16 {
    2
}

// ── Envelope ───────────────────────────────────────────────────────────────

pub fn attack() -> f64 {
    0.1
}

pub fn decay() -> f64 {
    0.2
}

pub fn sustain() -> f64 {
    0.7
}

pub fn release() -> f64 {
    0.3
}

// ── Triggers ───────────────────────────────────────────────────────────────

pub fn max_length() -> usize {
    1
}

// ── Shell ──────────────────────────────────────────────────────────────────

/// Fallback shell when neither the config nor `$SHELL` names one.
pub const FALLBACK_SHELL: &str = "/bin/sh";
