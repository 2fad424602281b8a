//! Audio output devices.
//!
//! A device takes one PCM buffer at a time and blocks until it has been
//! played. Two implementations exist: [`RodioDevice`] for real output and
//! [`SimulatedDevice`], which only logs and counts.

use super::{AudioError, AudioFormat};
use chirp_config::Settings;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait AudioDevice: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Play interleaved signed 16-bit LE `pcm` and block until done.
    fn play(&self, pcm: &[u8], format: AudioFormat) -> Result<(), AudioError>;
}

/// Check that `pcm` holds whole frames of `format`.
fn check_buffer(pcm: &[u8], format: AudioFormat) -> Result<(), AudioError> {
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(AudioError::InvalidFormat(format!(
            "{} channels at {} Hz",
            format.channels, format.sample_rate
        )));
    }
    if pcm.len() % format.frame_bytes() != 0 {
        return Err(AudioError::InvalidFormat(format!(
            "{} bytes is not a whole number of {}-byte frames",
            pcm.len(),
            format.frame_bytes()
        )));
    }
    Ok(())
}

/// Device that plays nothing.
///
/// Every call is logged and counted. With [`SimulatedDevice::with_playback_time`]
/// each call also blocks for as long as the buffer would take to play, so
/// timing-dependent behaviour can be exercised without a sound card.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    simulate_playback: bool,
    plays: AtomicU64,
    bytes: AtomicU64,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playback_time() -> Self {
        Self {
            simulate_playback: true,
            ..Self::default()
        }
    }

    /// Number of `play` calls so far.
    pub fn play_count(&self) -> u64 {
        self.plays.load(Ordering::SeqCst)
    }

    /// Total PCM bytes handed to `play`.
    pub fn bytes_played(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}

impl AudioDevice for SimulatedDevice {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn play(&self, pcm: &[u8], format: AudioFormat) -> Result<(), AudioError> {
        check_buffer(pcm, format)?;
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(pcm.len() as u64, Ordering::SeqCst);

        let duration = format.duration_of(pcm.len());
        log::debug!(
            "Simulated playback: {} bytes, {} Hz x{} ({:?})",
            pcm.len(),
            format.sample_rate,
            format.channels,
            duration
        );
        if self.simulate_playback && duration > Duration::ZERO {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

#[cfg(feature = "audio")]
pub use self::rodio_device::RodioDevice;

#[cfg(feature = "audio")]
mod rodio_device {
    use super::{AudioDevice, AudioError, AudioFormat, check_buffer};
    use crossbeam_channel::{Sender, bounded};
    use parking_lot::Mutex;
    use std::thread::JoinHandle;

    /// Real output through the default device.
    ///
    /// The output stream lives on its own thread for the lifetime of the
    /// device; each `play` connects a fresh player to the stream's mixer
    /// and sleeps until it drains.
    pub struct RodioDevice {
        mixer: Mutex<rodio::mixer::Mixer>,
        shutdown: Mutex<Option<Sender<()>>>,
        stream_thread: Mutex<Option<JoinHandle<()>>>,
    }

    impl RodioDevice {
        /// Open the default output device.
        pub fn open() -> Result<Self, AudioError> {
            let (mixer_tx, mixer_rx) = bounded(1);
            let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

            let stream_thread = std::thread::Builder::new()
                .name("chirp-audio".to_string())
                .spawn(move || {
                    let stream = match rodio::DeviceSinkBuilder::open_default_sink() {
                        Ok(s) => s,
                        Err(e) => {
                            // A closed channel means `open` already gave up.
                            let _ = mixer_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    if mixer_tx.send(Ok(stream.mixer().clone())).is_err() {
                        std::mem::forget(stream);
                        return;
                    }
                    // Parked until the device is dropped; a disconnect and a
                    // message both mean shut down.
                    let _ = shutdown_rx.recv();
                    // Suppress rodio's "Dropping OutputStream" message.
                    std::mem::forget(stream);
                })
                .map_err(|e| AudioError::DeviceInit(format!("audio thread: {e}")))?;

            let mixer = match mixer_rx.recv() {
                Ok(Ok(mixer)) => mixer,
                Ok(Err(e)) => {
                    let _ = stream_thread.join();
                    return Err(AudioError::DeviceInit(e));
                }
                Err(_) => {
                    let _ = stream_thread.join();
                    return Err(AudioError::DeviceInit(
                        "audio thread exited before opening the device".to_string(),
                    ));
                }
            };
            log::info!("Opened default audio output");

            Ok(Self {
                mixer: Mutex::new(mixer),
                shutdown: Mutex::new(Some(shutdown_tx)),
                stream_thread: Mutex::new(Some(stream_thread)),
            })
        }
    }

    impl AudioDevice for RodioDevice {
        fn name(&self) -> &'static str {
            "rodio"
        }

        fn play(&self, pcm: &[u8], format: AudioFormat) -> Result<(), AudioError> {
            check_buffer(pcm, format)?;
            if pcm.is_empty() {
                return Ok(());
            }

            let channels = format.channels.try_into().map_err(|_| {
                AudioError::InvalidFormat(format!("{} channels", format.channels))
            })?;
            let sample_rate = format.sample_rate.try_into().map_err(|_| {
                AudioError::InvalidFormat(format!("{} Hz", format.sample_rate))
            })?;
            let samples: Vec<f32> = pcm
                .chunks_exact(2)
                .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
                .collect();

            let source = rodio::buffer::SamplesBuffer::new(channels, sample_rate, samples);
            let player = rodio::Player::connect_new(&self.mixer.lock());
            player.append(source);
            player.sleep_until_end();
            Ok(())
        }
    }

    impl Drop for RodioDevice {
        fn drop(&mut self) {
            // Closing the channel releases the stream thread.
            self.shutdown.lock().take();
            if let Some(handle) = self.stream_thread.lock().take() {
                let _ = handle.join();
            }
        }
    }
}

/// Pick the output device for a run.
///
/// The simulated device is used when `silent` is set, when
/// `settings.audio` is false, or when built without the `audio` feature.
/// Failure to open the real device is returned, not papered over.
pub fn open_device(settings: &Settings, silent: bool) -> Result<Arc<dyn AudioDevice>, AudioError> {
    if silent || !settings.audio {
        log::info!("Audio output disabled, using simulated device");
        return Ok(Arc::new(SimulatedDevice::with_playback_time()));
    }

    #[cfg(feature = "audio")]
    {
        Ok(Arc::new(RodioDevice::open()?))
    }

    #[cfg(not(feature = "audio"))]
    {
        log::warn!("Built without audio support, using simulated device");
        Ok(Arc::new(SimulatedDevice::with_playback_time()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_simulated_device_counts_plays() {
        let device = SimulatedDevice::new();
        let format = AudioFormat::new(48_000, 2);
        device.play(&[0u8; 16], format).unwrap();
        device.play(&[], format).unwrap();
        assert_eq!(device.play_count(), 2);
        assert_eq!(device.bytes_played(), 16);
    }

    #[test]
    fn test_simulated_device_rejects_partial_frames() {
        let device = SimulatedDevice::new();
        let result = device.play(&[0u8; 3], AudioFormat::new(48_000, 2));
        assert!(matches!(result, Err(AudioError::InvalidFormat(_))));
        assert_eq!(device.play_count(), 0);
    }

    #[test]
    fn test_simulated_device_blocks_for_buffer_duration() {
        let device = SimulatedDevice::with_playback_time();
        let format = AudioFormat::new(1_000, 1);
        // 50 frames at 1kHz = 50ms.
        let start = Instant::now();
        device.play(&[0u8; 100], format).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_silent_flag_selects_simulated_device() {
        let device = open_device(&Settings::default(), true).unwrap();
        assert_eq!(device.name(), "simulated");

        let settings = Settings {
            audio: false,
            ..Settings::default()
        };
        let device = open_device(&settings, false).unwrap();
        assert_eq!(device.name(), "simulated");
    }
}
