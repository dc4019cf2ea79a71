use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A block of mono f32 samples handed down the receive path.
///
/// Borrowed from the capture callback and consumed synchronously; never retained.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    pub samples: &'a [f32],
    pub sample_rate: u32,
}

impl<'a> AudioFrame<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Samples produced by the encode engine (or decoded from a recording) for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WaveformBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Nominal rendering time of the buffer.
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Periodic signal-strength snapshot (RMS and peak over one block, 0.0–1.0 for normalized audio).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSample {
    pub rms: f32,
    pub peak: f32,
    /// RMS above the noise floor. A UI hint only, not a protocol signal.
    pub signal_present: bool,
    pub timestamp: DateTime<Utc>,
}

/// A text payload successfully decoded from captured audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Zero-based index of the frame, within the current capture run, that produced the text.
    pub frame_index: u64,
}

/// Direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Input,
    Output,
}

/// An audio device available for capture or playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub is_default: bool,
    pub default_sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Counters for debugging a capture run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureDiagnostics {
    pub callback_count: u64,
    pub samples_total: u64,
    pub input_sample_rate: u32,
    pub input_channels: u16,
    pub frames_decoded: u64,
    pub samples_discarded: u64,
    pub engine_busy_skips: u64,
    pub events_dropped: u64,
    pub recorded_samples: u64,
    /// Samples refused because the diagnostic recording was full.
    pub recording_dropped_samples: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_duration() {
        let waveform = WaveformBuffer::new(vec![0.0; 24_000], 48_000);
        assert_eq!(waveform.duration(), std::time::Duration::from_millis(500));
        assert_eq!(WaveformBuffer::new(vec![0.0; 10], 0).duration(), std::time::Duration::ZERO);
    }

    #[test]
    fn frame_len() {
        let samples = [0.1f32, 0.2, 0.3];
        let frame = AudioFrame::new(&samples, 48_000);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
        assert!(AudioFrame::new(&[], 48_000).is_empty());
    }
}
