//! cpal speaker output provider.
//!
//! Decodes the WAV container handed over by the playback session,
//! resamples it to the device rate and plays it on a dedicated output
//! thread until released.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use sonic_link_core::models::audio_models::{AudioSource, DeviceKind, WaveformBuffer};
use sonic_link_core::models::error::LinkError;
use sonic_link_core::processing::resampler::resample_buffer;
use sonic_link_core::processing::wav_format::decode_wav;
use sonic_link_core::traits::playback_provider::PlaybackProvider;

use crate::device_enumerator::DeviceEnumerator;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Speaker output through cpal.
pub struct CpalSpeakerOutput {
    device_id: Option<String>,
    running: Arc<AtomicBool>,
    render_handle: Option<thread::JoinHandle<()>>,
}

impl CpalSpeakerOutput {
    /// Play through the system default output device.
    pub fn default_device() -> Self {
        Self::build(None)
    }

    /// Play through the output device named `id`.
    pub fn with_device(id: impl Into<String>) -> Self {
        Self::build(Some(id.into()))
    }

    fn build(device_id: Option<String>) -> Self {
        Self {
            device_id,
            running: Arc::new(AtomicBool::new(false)),
            render_handle: None,
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl PlaybackProvider for CpalSpeakerOutput {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new().output_device(self.device_id.as_deref()).is_ok()
    }

    fn render(&mut self, container: &[u8]) -> Result<(), LinkError> {
        let waveform = decode_wav(Cursor::new(container))?;
        if waveform.is_empty() {
            return Err(LinkError::EmptyBuffer);
        }
        self.release();

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device_id = self.device_id.clone();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("cpal-speaker-output".into())
            .spawn(move || {
                let stream = match open_output_stream(device_id.as_deref(), waveform) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while running.load(Ordering::SeqCst) {
                    thread::sleep(POLL_INTERVAL);
                }
                drop(stream);
                log::debug!("speaker output thread exiting");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Unknown(format!("failed to spawn output thread: {}", e))
            })?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => {
                self.render_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(LinkError::DeviceUnavailable("output stream did not start in time".into()))
            }
        }
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.render_handle.take() {
            let _ = handle.join();
        }
    }

    fn device_info(&self) -> AudioSource {
        let enumerator = DeviceEnumerator::new();
        let default_id = enumerator.default_output_device_id();
        let config = enumerator
            .output_device(self.device_id.as_deref())
            .ok()
            .and_then(|d| d.default_output_config().ok());

        AudioSource {
            id: self.device_id.clone().unwrap_or_else(|| "default-output".into()),
            name: self
                .device_id
                .clone()
                .or_else(|| default_id.clone())
                .unwrap_or_else(|| "Default Speaker".into()),
            kind: DeviceKind::Output,
            is_default: self.device_id.is_none() || self.device_id == default_id,
            default_sample_rate: config.as_ref().map(|c| c.sample_rate().0),
            channels: config.as_ref().map(|c| c.channels()),
        }
    }
}

impl Drop for CpalSpeakerOutput {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_output_stream(device_id: Option<&str>, waveform: WaveformBuffer) -> Result<cpal::Stream, LinkError> {
    let device = DeviceEnumerator::new().output_device(device_id)?;
    let default = device
        .default_output_config()
        .map_err(|e| LinkError::DeviceUnavailable(format!("no usable output config: {}", e)))?;
    let sample_format = default.sample_format();
    let config = default.config();

    let samples: Arc<[f32]> = resample_buffer(&waveform.samples, waveform.sample_rate, config.sample_rate.0)?.into();
    log::info!(
        "rendering {} samples at {} Hz on {} ch",
        samples.len(),
        config.sample_rate.0,
        config.channels
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_output::<f32>(&device, &config, samples),
        SampleFormat::I16 => build_output::<i16>(&device, &config, samples),
        SampleFormat::I32 => build_output::<i32>(&device, &config, samples),
        SampleFormat::U16 => build_output::<u16>(&device, &config, samples),
        other => {
            return Err(LinkError::ConfigurationFailed(format!(
                "unsupported output sample format {:?}",
                other
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| LinkError::DeviceUnavailable(format!("failed to start output stream: {}", e)))?;
    Ok(stream)
}

/// Mono source duplicated into every output channel, silence past the end.
fn build_output<T>(device: &cpal::Device, config: &StreamConfig, samples: Arc<[f32]>) -> Result<cpal::Stream, LinkError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    let mut position = 0usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = samples.get(position).copied().unwrap_or(0.0);
                    position += 1;
                    frame.fill(T::from_sample(value));
                }
            },
            |err| log::error!("output stream error: {}", err),
            None,
        )
        .map_err(|e| LinkError::DeviceUnavailable(format!("failed to build output stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_link_core::processing::wav_format::encode_wav;

    #[test]
    fn garbage_container_is_rejected_before_device() {
        let mut output = CpalSpeakerOutput::with_device("no-such-device-7f3a");
        let err = output.render(b"not a wav").unwrap_err();

        assert!(matches!(err, LinkError::InvalidContainer(_)));
        assert!(!output.is_rendering());
    }

    #[test]
    fn missing_device_fails_render() {
        let mut output = CpalSpeakerOutput::with_device("no-such-device-7f3a");
        let container = encode_wav(&[0.1; 480], 48000).unwrap();

        let err = output.render(&container).unwrap_err();

        assert!(matches!(err, LinkError::DeviceUnavailable(_)));
        assert!(!output.is_rendering());
        output.release();
    }

    #[test]
    #[ignore = "requires an output device"]
    fn plays_short_tone() {
        let samples: Vec<f32> = (0..4800)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin() * 0.2)
            .collect();
        let container = encode_wav(&samples, 48000).unwrap();
        let mut output = CpalSpeakerOutput::default_device();

        output.render(&container).unwrap();
        assert!(output.is_rendering());
        thread::sleep(Duration::from_millis(150));
        output.release();
        assert!(!output.is_rendering());
    }
}
