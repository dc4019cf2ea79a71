use std::path::Path;

use chrono::Utc;

use crate::models::audio_models::{AudioFrame, WaveformBuffer};
use crate::models::config::{LinkConfiguration, MAX_DIAGNOSTIC_CAP_SAMPLES};
use crate::models::error::LinkError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::storage::metadata::write_metadata;
use crate::storage::wav_writer::WavFileWriter;

/// Bounded accumulation of captured audio for offline inspection.
///
/// Once the cap is reached further samples are dropped, never overwritten,
/// until [`DiagnosticRecorder::clear`]. A block straddling the cap is
/// truncated at the cap. The cap never exceeds what a 16-bit WAV file can hold.
#[derive(Debug)]
pub struct DiagnosticRecorder {
    samples: Vec<f32>,
    cap: usize,
    sample_rate: u32,
    dropped: u64,
}

impl DiagnosticRecorder {
    pub fn new(cap_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            cap: cap_samples.min(MAX_DIAGNOSTIC_CAP_SAMPLES),
            sample_rate,
            dropped: 0,
        }
    }

    pub fn from_config(config: &LinkConfiguration) -> Self {
        Self::new(config.diagnostic_cap_samples(), config.sample_rate)
    }

    /// Reserve the full capacity so `record` never reallocates.
    ///
    /// If the allocation is refused the buffer grows on demand instead.
    pub fn prepare(&mut self) {
        let additional = self.cap.saturating_sub(self.samples.len());
        if let Err(e) = self.samples.try_reserve(additional) {
            log::warn!("could not reserve {} diagnostic samples: {}", additional, e);
        }
    }

    /// Append `frame`, up to the cap. Returns the number of samples kept.
    pub fn record(&mut self, frame: &AudioFrame<'_>) -> usize {
        if self.is_full() {
            self.dropped += frame.len() as u64;
            return 0;
        }
        let room = self.cap.saturating_sub(self.samples.len());
        let kept = room.min(frame.len());
        self.samples.extend_from_slice(&frame.samples[..kept]);
        self.dropped += (frame.len() - kept) as u64;
        kept
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.cap
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples refused because the cap was reached.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    /// Copy of the recording so far.
    pub fn to_waveform(&self) -> Result<WaveformBuffer, LinkError> {
        if self.samples.is_empty() {
            return Err(LinkError::NoData);
        }
        Ok(WaveformBuffer::new(self.samples.clone(), self.sample_rate))
    }

    /// Write the recording to `dir` as a WAV file with a metadata sidecar.
    pub fn save(&self, dir: &Path) -> Result<RecordingResult, LinkError> {
        save_waveform(&self.to_waveform()?, dir)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}

/// Write `waveform` to `dir/recorded_audio_<unix millis>.wav` plus sidecar.
pub fn save_waveform(waveform: &WaveformBuffer, dir: &Path) -> Result<RecordingResult, LinkError> {
    if waveform.is_empty() {
        return Err(LinkError::NoData);
    }

    let file_path = dir.join(format!("recorded_audio_{}.wav", Utc::now().timestamp_millis()));
    let mut writer = WavFileWriter::new(file_path.clone(), waveform.sample_rate);
    writer.open()?;
    writer.write_samples(&waveform.samples)?;
    let checksum = writer.close()?;

    let metadata = RecordingMetadata::new_mono(
        waveform.sample_rate,
        waveform.len() as u64,
        &file_path.to_string_lossy(),
        &checksum,
    );
    write_metadata(&metadata, &file_path)?;

    log::info!(
        "saved {:.2}s diagnostic recording to {}",
        metadata.duration_secs,
        file_path.display()
    );
    Ok(RecordingResult {
        file_path,
        duration_secs: metadata.duration_secs,
        metadata,
        checksum,
    })
}
