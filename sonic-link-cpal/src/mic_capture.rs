//! cpal microphone capture provider.
//!
//! The stream is built and owned by a dedicated capture thread, which
//! keeps `cpal::Stream` off the caller's thread on hosts where it is not
//! `Send`. Buffers reach the [`AudioBufferCallback`] as interleaved f32 at
//! the device's native rate and channel count; mono conversion and
//! resampling happen in the capture session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use sonic_link_core::models::audio_models::{AudioSource, DeviceKind};
use sonic_link_core::models::config::LinkConfiguration;
use sonic_link_core::models::error::LinkError;
use sonic_link_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

use crate::device_enumerator::DeviceEnumerator;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Format the running stream was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

/// Microphone capture through cpal.
///
/// Tries mono f32 at the preferred rate first and falls back to the
/// device's default configuration, converting integer samples to f32.
pub struct CpalMicCapture {
    device_id: Option<String>,
    preferred_sample_rate: u32,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
    active_format: Arc<Mutex<Option<StreamFormat>>>,
}

impl CpalMicCapture {
    /// Capture from the system default microphone.
    pub fn default_device(preferred_sample_rate: u32) -> Self {
        Self::build(None, preferred_sample_rate)
    }

    /// Capture from the input device named `id`.
    pub fn with_device(id: impl Into<String>, preferred_sample_rate: u32) -> Self {
        Self::build(Some(id.into()), preferred_sample_rate)
    }

    /// Device and preferred rate taken from the link configuration.
    pub fn from_config(config: &LinkConfiguration) -> Self {
        Self::build(config.input_device_id.clone(), config.sample_rate)
    }

    fn build(device_id: Option<String>, preferred_sample_rate: u32) -> Self {
        Self {
            device_id,
            preferred_sample_rate,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            active_format: Arc::new(Mutex::new(None)),
        }
    }

    /// Format of the running stream, if any.
    pub fn active_format(&self) -> Option<StreamFormat> {
        *self.active_format.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new().input_device(self.device_id.as_deref()).is_ok()
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), LinkError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(LinkError::AlreadyActive);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device_id = self.device_id.clone();
        let preferred_sample_rate = self.preferred_sample_rate;
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(device_id.as_deref(), preferred_sample_rate, callback) {
                    Ok((stream, format)) => {
                        let _ = ready_tx.send(Ok(format));
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
                log::debug!("mic capture thread exiting");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Unknown(format!("failed to spawn mic thread: {}", e))
            })?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(format)) => {
                log::info!(
                    "mic capture started: {} Hz, {} ch, {:?}",
                    format.sample_rate,
                    format.channels,
                    format.sample_format
                );
                *self.active_format.lock() = Some(format);
                self.capture_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                // The thread is stuck inside the host API; it exits on its
                // own once the flag is seen.
                self.running.store(false, Ordering::SeqCst);
                Err(LinkError::DeviceUnavailable("input stream did not start in time".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), LinkError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
            log::info!("mic capture stopped");
        }
        *self.active_format.lock() = None;
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        let enumerator = DeviceEnumerator::new();
        let default_id = enumerator.default_input_device_id();
        let name = self
            .device_id
            .clone()
            .or_else(|| default_id.clone())
            .unwrap_or_else(|| "Default Microphone".into());
        let active = self.active_format();
        let fallback = enumerator
            .input_device(self.device_id.as_deref())
            .ok()
            .and_then(|d| d.default_input_config().ok());

        AudioSource {
            id: self.device_id.clone().unwrap_or_else(|| "default-input".into()),
            is_default: self.device_id.is_none() || self.device_id == default_id,
            name,
            kind: DeviceKind::Input,
            default_sample_rate: active
                .map(|f| f.sample_rate)
                .or_else(|| fallback.as_ref().map(|c| c.sample_rate().0)),
            channels: active.map(|f| f.channels).or_else(|| fallback.as_ref().map(|c| c.channels())),
        }
    }
}

impl Drop for CpalMicCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Open and start an input stream on the capture thread.
fn open_input_stream(
    device_id: Option<&str>,
    preferred_sample_rate: u32,
    callback: AudioBufferCallback,
) -> Result<(cpal::Stream, StreamFormat), LinkError> {
    let device = DeviceEnumerator::new().input_device(device_id)?;
    let (config, sample_format) = choose_input_config(&device, preferred_sample_rate)?;

    let stream = match sample_format {
        SampleFormat::F32 => build_input::<f32>(&device, &config, callback),
        SampleFormat::I16 => build_input::<i16>(&device, &config, callback),
        SampleFormat::I32 => build_input::<i32>(&device, &config, callback),
        SampleFormat::U16 => build_input::<u16>(&device, &config, callback),
        other => {
            return Err(LinkError::ConfigurationFailed(format!(
                "unsupported input sample format {:?}",
                other
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| LinkError::DeviceUnavailable(format!("failed to start input stream: {}", e)))?;

    Ok((
        stream,
        StreamFormat {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            sample_format,
        },
    ))
}

/// Mono f32 at the preferred rate if the device offers it, else the device default.
fn choose_input_config(
    device: &cpal::Device,
    preferred_sample_rate: u32,
) -> Result<(StreamConfig, SampleFormat), LinkError> {
    let supports_preferred = device
        .supported_input_configs()
        .map(|mut ranges| {
            ranges.any(|range| {
                range.channels() == 1
                    && range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate().0 <= preferred_sample_rate
                    && preferred_sample_rate <= range.max_sample_rate().0
            })
        })
        .unwrap_or(false);

    if supports_preferred {
        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(preferred_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        return Ok((config, SampleFormat::F32));
    }

    let default = device
        .default_input_config()
        .map_err(|e| LinkError::DeviceUnavailable(format!("no usable input config: {}", e)))?;
    log::debug!(
        "mono f32 at {} Hz unsupported, using device default {} Hz / {} ch / {:?}",
        preferred_sample_rate,
        default.sample_rate().0,
        default.channels(),
        default.sample_format()
    );
    Ok((default.config(), default.sample_format()))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    callback: AudioBufferCallback,
) -> Result<cpal::Stream, LinkError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| <f32 as cpal::Sample>::from_sample(s)));
                callback(&scratch, sample_rate, channels);
            },
            |err| log::error!("input stream error: {}", err),
            None,
        )
        .map_err(|e| LinkError::DeviceUnavailable(format!("failed to build input stream: {}", e)))
}
