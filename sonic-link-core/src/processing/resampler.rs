use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};

use crate::models::error::LinkError;

/// Input frames consumed per resampler step.
pub const RESAMPLER_CHUNK: usize = 256;

/// Streaming mono resampler to a fixed target rate.
///
/// Input that does not fill a whole chunk is held until the next call,
/// and the interpolation phase carries across calls, so a stream cut into
/// arbitrarily small blocks resamples to the same length as one long
/// block. A change of source rate restarts the stream.
pub struct Resampler {
    target_sample_rate: u32,
    source_sample_rate: u32,
    inner: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
    output: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate,
            source_sample_rate: target_sample_rate,
            inner: None,
            pending: Vec::with_capacity(RESAMPLER_CHUNK * 2),
            output: Vec::new(),
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn needs_resampling(&self, source_sample_rate: u32) -> bool {
        source_sample_rate != self.target_sample_rate && source_sample_rate != 0
    }

    /// Input frames held back waiting for a full chunk.
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Output samples by which the resampled stream lags its input.
    pub fn output_delay(&self) -> usize {
        self.inner.as_ref().map_or(0, |r| r.output_delay())
    }

    /// Feed one block at `source_sample_rate`, replacing `output` with
    /// whatever resampled audio is ready. Same-rate input is copied through.
    pub fn process(&mut self, samples: &[f32], source_sample_rate: u32, output: &mut Vec<f32>) -> Result<(), LinkError> {
        output.clear();
        if source_sample_rate != self.source_sample_rate {
            self.configure(source_sample_rate)?;
        }

        let Some(inner) = self.inner.as_mut() else {
            output.extend_from_slice(samples);
            return Ok(());
        };

        self.pending.extend_from_slice(samples);
        let mut consumed = 0;
        while self.pending.len() - consumed >= RESAMPLER_CHUNK {
            let chunk = [&self.pending[consumed..consumed + RESAMPLER_CHUNK]];
            let (_, written) = inner
                .process_into_buffer(&chunk, self.output.as_mut_slice(), None)
                .map_err(|e| LinkError::Unknown(format!("resampling failed: {}", e)))?;
            output.extend_from_slice(&self.output[0][..written]);
            consumed += RESAMPLER_CHUNK;
        }
        self.pending.drain(..consumed);
        Ok(())
    }

    fn configure(&mut self, source_sample_rate: u32) -> Result<(), LinkError> {
        self.source_sample_rate = source_sample_rate;
        self.pending.clear();
        if !self.needs_resampling(source_sample_rate) {
            self.inner = None;
            return Ok(());
        }

        let ratio = self.target_sample_rate as f64 / source_sample_rate as f64;
        let inner = FastFixedIn::<f32>::new(ratio, 2.0, PolynomialDegree::Cubic, RESAMPLER_CHUNK, 1)
            .map_err(|e| LinkError::ConfigurationFailed(format!("resampler {} -> {} Hz: {}", source_sample_rate, self.target_sample_rate, e)))?;
        self.output = inner.output_buffer_allocate(true);
        self.inner = Some(inner);
        log::debug!("resampling {} Hz -> {} Hz", source_sample_rate, self.target_sample_rate);
        Ok(())
    }
}

/// Resample a complete mono buffer. The result is aligned with the input
/// and holds `len × target / source` samples, rounded.
pub fn resample_buffer(samples: &[f32], source_sample_rate: u32, target_sample_rate: u32) -> Result<Vec<f32>, LinkError> {
    let mut resampler = Resampler::new(target_sample_rate);
    if !resampler.needs_resampling(source_sample_rate) || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected =
        (samples.len() as f64 * target_sample_rate as f64 / source_sample_rate as f64).round() as usize;
    let mut resampled = Vec::with_capacity(expected + RESAMPLER_CHUNK * 2);
    let mut block = Vec::new();
    resampler.process(samples, source_sample_rate, &mut block)?;
    resampled.extend_from_slice(&block);

    // Flush the held tail and the filter delay with silence.
    let delay = resampler.output_delay();
    let silence = [0.0f32; RESAMPLER_CHUNK];
    while resampled.len() < delay + expected {
        resampler.process(&silence, source_sample_rate, &mut block)?;
        resampled.extend_from_slice(&block);
    }

    resampled.truncate(delay + expected);
    resampled.drain(..delay);
    Ok(resampled)
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
///
/// Replaces the contents of `mono`. A trailing partial frame is ignored.
pub fn downmix_to_mono_into(samples: &[f32], channels: usize, mono: &mut Vec<f32>) {
    mono.clear();
    if channels <= 1 {
        mono.extend_from_slice(samples);
        return;
    }
    let scale = 1.0 / channels as f32;
    mono.extend(
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
