// Library exports for testing and potential library use
//
// # Locking
//
// All shared state uses `parking_lot` locks, one lock per structure, held
// for a single logical operation:
//
//   - `PlaybackGate::last_play`  check-and-mark of the minimum gap
//   - `PlaybackGate::cache`      RwLock; rendering happens outside it
//   - `RecentInput::entries`     prune plus insert or lookup
//   - `Session` handles          never held across a stdin or PTY read

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod audio;
pub mod cli;
pub mod debug;
pub mod matcher;
pub mod queue;

pub use app::Chirp;
pub use chirp_config as config;
pub use chirp_terminal as terminal;
