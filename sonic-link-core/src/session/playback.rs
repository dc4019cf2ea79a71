use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, WaveformBuffer};
use crate::models::config::{LinkConfiguration, PlaybackOverlap};
use crate::models::error::LinkError;
use crate::processing::wav_format::encode_wav;
use crate::traits::playback_provider::PlaybackProvider;

/// Releases the output device when dropped, on every exit path.
struct OutputGuard<'a, O: PlaybackProvider> {
    output: &'a mut O,
}

impl<O: PlaybackProvider> Drop for OutputGuard<'_, O> {
    fn drop(&mut self) {
        self.output.release();
    }
}

/// Renders waveforms through the speaker, one at a time.
///
/// `play` blocks the caller for the waveform's duration plus a safety
/// margin. A second concurrent `play` either fails with `PlaybackBusy`
/// (`PlaybackOverlap::Reject`) or waits its turn (`PlaybackOverlap::Wait`).
pub struct PlaybackSession<O: PlaybackProvider> {
    output: Mutex<O>,
    overlap: PlaybackOverlap,
    margin: Duration,
}

impl<O: PlaybackProvider> PlaybackSession<O> {
    pub fn new(output: O, overlap: PlaybackOverlap, margin: Duration) -> Self {
        Self {
            output: Mutex::new(output),
            overlap,
            margin,
        }
    }

    pub fn from_config(output: O, config: &LinkConfiguration) -> Self {
        Self::new(output, config.playback_overlap, config.playback_margin())
    }

    pub fn overlap(&self) -> PlaybackOverlap {
        self.overlap
    }

    /// Whether a playback is in flight.
    pub fn is_busy(&self) -> bool {
        self.output.is_locked()
    }

    pub fn device_info(&self) -> AudioSource {
        self.output.lock().device_info()
    }

    /// Render `waveform` and block until it has finished playing.
    pub fn play(&self, waveform: &WaveformBuffer) -> Result<(), LinkError> {
        if waveform.is_empty() {
            return Err(LinkError::EmptyBuffer);
        }
        let container = encode_wav(&waveform.samples, waveform.sample_rate)?;

        let mut output = match self.overlap {
            PlaybackOverlap::Reject => self.output.try_lock().ok_or(LinkError::PlaybackBusy)?,
            PlaybackOverlap::Wait => self.output.lock(),
        };
        if !output.is_available() {
            return Err(LinkError::DeviceUnavailable(output.device_info().name));
        }

        let mut guard = OutputGuard { output: &mut *output };
        guard.output.render(&container)?;

        let wait = waveform.duration() + self.margin;
        log::info!("playing {} samples, waiting {:?}", waveform.len(), wait);
        thread::sleep(wait);
        drop(guard);

        log::debug!("playback complete");
        Ok(())
    }
}
