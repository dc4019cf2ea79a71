use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::LinkError;
use super::protocol::Protocol;
use crate::processing::level_meter::DEFAULT_NOISE_FLOOR;

/// Longest diagnostic recording a configuration may ask for.
pub const MAX_DIAGNOSTIC_CAP_SECS: f64 = 600.0;

/// Largest mono 16-bit sample count whose WAV data chunk still fits a u32 size.
pub const MAX_DIAGNOSTIC_CAP_SAMPLES: usize = (u32::MAX as usize - 44) / 2;

/// How captured blocks are cut into frames for the decode engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FramingPolicy {
    /// Forward each captured block unmodified.
    PassThrough,
    /// Split each block into frames of exactly `samples`. The tail of a block
    /// shorter than `samples` is discarded, not carried into the next block.
    FixedChunk { samples: usize },
}

/// What a second `play` does while another playback holds the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOverlap {
    /// Fail immediately with `LinkError::PlaybackBusy`.
    Reject,
    /// Block until the current playback releases the output, then play.
    Wait,
}

/// Configuration for a link session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfiguration {
    /// Rate the engine runs at; captured audio is resampled to it (default: 48000).
    pub sample_rate: u32,

    pub framing: FramingPolicy,

    /// Emit a level sample every this many captured blocks (default: 10).
    pub level_interval_blocks: u32,

    /// RMS above which the "signal present" hint is set (default: 0.001).
    pub noise_floor: f32,

    /// Diagnostic recording cap in seconds of audio, at most 600 (default: 30).
    pub diagnostic_cap_secs: f64,

    /// Extra wait after the nominal playback duration to absorb device buffering (default: 100ms).
    pub playback_margin_ms: u64,

    pub playback_overlap: PlaybackOverlap,

    /// Bound of the queue between the audio callback and the delegate (default: 256).
    pub event_queue_capacity: usize,

    /// Emit `decode_failed` when an analyzed transmission ends without a message.
    pub report_decode_failures: bool,

    pub default_protocol: Protocol,

    /// Transmit volume, 0–100 (default: 50).
    pub default_volume: u8,

    /// Specific input device id, or None for the system default.
    pub input_device_id: Option<String>,

    /// Directory where diagnostic recordings are saved.
    pub output_directory: PathBuf,
}

impl LinkConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if let FramingPolicy::FixedChunk { samples: 0 } = self.framing {
            return Err("fixed chunk size must be positive".into());
        }
        if self.level_interval_blocks == 0 {
            return Err("level interval must be at least one block".into());
        }
        if self.noise_floor.is_nan() || self.noise_floor < 0.0 {
            return Err(format!("invalid noise floor: {}", self.noise_floor));
        }
        if !(self.diagnostic_cap_secs > 0.0 && self.diagnostic_cap_secs <= MAX_DIAGNOSTIC_CAP_SECS) {
            return Err(format!("invalid diagnostic cap: {}s", self.diagnostic_cap_secs));
        }
        if self.event_queue_capacity == 0 {
            return Err("event queue capacity must be positive".into());
        }
        if self.default_volume > 100 {
            return Err(format!("volume out of range: {}", self.default_volume));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, LinkError> {
        let json = fs::read_to_string(path)
            .map_err(|e| LinkError::StorageError(format!("failed to read config: {}", e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| LinkError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(LinkError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Maximum number of samples the diagnostic recorder keeps.
    ///
    /// Bounded even for a configuration that never went through `validate`.
    pub fn diagnostic_cap_samples(&self) -> usize {
        let secs = self.diagnostic_cap_secs.clamp(0.0, MAX_DIAGNOSTIC_CAP_SECS);
        let samples = (secs * self.sample_rate as f64).round() as usize;
        samples.min(MAX_DIAGNOSTIC_CAP_SAMPLES)
    }

    pub fn playback_margin(&self) -> Duration {
        Duration::from_millis(self.playback_margin_ms)
    }
}

impl Default for LinkConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            framing: FramingPolicy::PassThrough,
            level_interval_blocks: 10,
            noise_floor: DEFAULT_NOISE_FLOOR,
            diagnostic_cap_secs: 30.0,
            playback_margin_ms: 100,
            playback_overlap: PlaybackOverlap::Reject,
            event_queue_capacity: 256,
            report_decode_failures: false,
            default_protocol: Protocol::AudibleFast,
            default_volume: 50,
            input_device_id: None,
            output_directory: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(LinkConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_chunk() {
        let config = LinkConfiguration {
            framing: FramingPolicy::FixedChunk { samples: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_volume_and_interval() {
        let config = LinkConfiguration {
            default_volume: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LinkConfiguration {
            level_interval_blocks: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cap_in_samples() {
        let config = LinkConfiguration {
            sample_rate: 44100,
            diagnostic_cap_secs: 2.0,
            ..Default::default()
        };
        assert_eq!(config.diagnostic_cap_samples(), 88200);
    }

    #[test]
    fn rejects_oversized_diagnostic_cap() {
        for secs in [1e300, f64::INFINITY, MAX_DIAGNOSTIC_CAP_SECS + 1.0, f64::NAN, 0.0] {
            let config = LinkConfiguration {
                diagnostic_cap_secs: secs,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{secs} accepted");
        }

        let config = LinkConfiguration {
            diagnostic_cap_secs: MAX_DIAGNOSTIC_CAP_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unvalidated_cap_stays_bounded() {
        let config = LinkConfiguration {
            diagnostic_cap_secs: 1e300,
            ..Default::default()
        };
        assert_eq!(config.diagnostic_cap_samples(), 600 * 48000);

        let config = LinkConfiguration {
            diagnostic_cap_secs: f64::NAN,
            ..Default::default()
        };
        assert_eq!(config.diagnostic_cap_samples(), 0);

        let config = LinkConfiguration {
            sample_rate: u32::MAX,
            diagnostic_cap_secs: MAX_DIAGNOSTIC_CAP_SECS,
            ..Default::default()
        };
        assert_eq!(config.diagnostic_cap_samples(), MAX_DIAGNOSTIC_CAP_SAMPLES);
    }

    #[test]
    fn default_noise_floor_matches_meter() {
        assert_eq!(LinkConfiguration::default().noise_floor, DEFAULT_NOISE_FLOOR);
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.json");
        fs::write(
            &path,
            r#"{ "sample_rate": 44100, "framing": { "mode": "fixed_chunk", "samples": 1024 } }"#,
        )
        .unwrap();

        let config = LinkConfiguration::from_json_file(&path).unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.framing, FramingPolicy::FixedChunk { samples: 1024 });
        assert_eq!(config.level_interval_blocks, 10);
        assert_eq!(config.playback_overlap, PlaybackOverlap::Reject);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.json");
        fs::write(&path, r#"{ "sample_rate": 0 }"#).unwrap();

        assert!(matches!(
            LinkConfiguration::from_json_file(&path),
            Err(LinkError::ConfigurationFailed(_))
        ));
    }
}
