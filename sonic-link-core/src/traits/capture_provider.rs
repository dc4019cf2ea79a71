use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::LinkError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], u32, u16) + Send + Sync + 'static>;

/// Interface for platform-specific microphone sources.
///
/// Implemented by `CpalMicCapture` in `sonic-link-cpal` and by the
/// scripted mock used in tests.
pub trait CaptureProvider: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Start capturing audio, delivering buffers via `callback`.
    ///
    /// Must not return `Ok` until the stream is live. The callback fires on
    /// the backend's audio thread: keep processing minimal.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), LinkError>;

    /// Stop capturing and release the device. Safe to call when not started.
    fn stop(&mut self) -> Result<(), LinkError>;

    /// Information about the audio device backing this provider.
    fn device_info(&self) -> AudioSource;
}
