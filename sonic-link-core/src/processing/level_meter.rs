use chrono::Utc;

use crate::models::audio_models::LevelSample;

pub const DEFAULT_NOISE_FLOOR: f32 = 0.001;

/// Compute RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Level metering on every Kth captured block.
///
/// Runs on the same tap as framing but on its own cadence, so the event
/// rate stays bounded and most callbacks pay nothing for metering.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    interval_blocks: u32,
    noise_floor: f32,
    blocks_seen: u64,
}

impl LevelMeter {
    pub fn new(interval_blocks: u32, noise_floor: f32) -> Self {
        Self {
            interval_blocks: interval_blocks.max(1),
            noise_floor,
            blocks_seen: 0,
        }
    }

    /// Count one block; measure and return a sample if it is the Kth.
    pub fn observe(&mut self, block: &[f32]) -> Option<LevelSample> {
        self.blocks_seen += 1;
        if self.blocks_seen % self.interval_blocks as u64 != 0 {
            return None;
        }

        let rms = rms_level(block);
        Some(LevelSample {
            rms,
            peak: peak_level(block),
            signal_present: rms > self.noise_floor,
            timestamp: Utc::now(),
        })
    }

    pub fn blocks_seen(&self) -> u64 {
        self.blocks_seen
    }
}
