use crate::models::audio_models::AudioSource;
use crate::models::error::LinkError;

/// Interface for platform-specific speaker output.
///
/// The provider receives a complete mono 16-bit WAV container and starts
/// rendering it. Completion is awaited by the playback session, which
/// calls [`PlaybackProvider::release`] on every exit path.
pub trait PlaybackProvider: Send {
    fn is_available(&self) -> bool;

    /// Decode `container` and begin rendering it on the output device.
    fn render(&mut self, container: &[u8]) -> Result<(), LinkError>;

    /// Stop rendering and release the output device. Idempotent.
    fn release(&mut self);

    fn device_info(&self) -> AudioSource;
}
