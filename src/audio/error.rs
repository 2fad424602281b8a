use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    /// The output device could not be opened.
    #[error("Failed to open audio output: {0}")]
    DeviceInit(String),

    /// A single buffer failed to play.
    #[error("Audio playback failed: {0}")]
    Playback(String),

    /// The PCM buffer or format cannot be played as given.
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}
