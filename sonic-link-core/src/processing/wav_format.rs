/// WAV container utilities.
///
/// Generates the canonical 44-byte RIFF header used for both diagnostic
/// recordings and the in-memory container handed to the speaker, and
/// decodes arbitrary PCM/float WAV input back to mono f32.
use std::io::Read;
use std::path::Path;

use crate::models::audio_models::WaveformBuffer;
use crate::models::error::LinkError;
use crate::processing::resampler::downmix_to_mono_into;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bit depth of every container this crate writes.
pub const PCM_BIT_DEPTH: u16 = 16;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = total_file_size.saturating_sub(8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    header[40..44].copy_from_slice(&(data_size as u32).to_le_bytes());
}

/// Quantize one normalized sample to signed 16-bit.
///
/// Out-of-range input is clamped to [-1.0, 1.0] first, so full scale maps
/// to ±32767 symmetrically.
pub fn sample_to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Append 16-bit little-endian PCM for `samples` to `out`.
pub fn encode_pcm16_into(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&sample_to_pcm16(sample).to_le_bytes());
    }
}

/// Build a complete mono 16-bit WAV container in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, LinkError> {
    if sample_rate == 0 {
        return Err(LinkError::EncodingFailed("sample rate must be non-zero".into()));
    }
    let data_size = u32::try_from(samples.len() * 2)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| LinkError::EncodingFailed(format!("{} samples exceed WAV size limit", samples.len())))?;

    let mut container = Vec::with_capacity(WAV_HEADER_SIZE + data_size as usize);
    container.extend_from_slice(&generate_wav_header(sample_rate, PCM_BIT_DEPTH, 1, data_size));
    encode_pcm16_into(samples, &mut container);
    Ok(container)
}

/// Fields read back from a canonical 44-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeaderInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub data_size: u32,
}

/// Parse a canonical header as produced by [`generate_wav_header`].
///
/// Files with extra chunks between `fmt ` and `data` are rejected here;
/// use [`decode_wav`] for general input.
pub fn parse_header(bytes: &[u8]) -> Result<WavHeaderInfo, LinkError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(LinkError::InvalidContainer(format!(
            "header is {} bytes, expected {WAV_HEADER_SIZE}",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(LinkError::InvalidContainer("missing RIFF/WAVE magic".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(LinkError::InvalidContainer("non-canonical chunk layout".into()));
    }
    let format_code = u16::from_le_bytes([bytes[20], bytes[21]]);
    if format_code != 1 {
        return Err(LinkError::InvalidContainer(format!("unsupported format code {format_code}")));
    }

    Ok(WavHeaderInfo {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
        data_size: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
    })
}

/// Decode a WAV stream to mono f32, downmixing multi-channel input.
///
/// Accepts integer PCM of any depth hound supports and 32-bit float.
pub fn decode_wav<R: Read>(reader: R) -> Result<WaveformBuffer, LinkError> {
    let reader = hound::WavReader::new(reader).map_err(|e| LinkError::InvalidContainer(e.to_string()))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(LinkError::InvalidContainer("zero channels or sample rate".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| LinkError::InvalidContainer(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| LinkError::InvalidContainer(e.to_string()))?
        }
    };

    let mut mono = Vec::with_capacity(interleaved.len() / spec.channels as usize);
    downmix_to_mono_into(&interleaved, spec.channels as usize, &mut mono);
    Ok(WaveformBuffer::new(mono, spec.sample_rate))
}

/// Read and decode a WAV file from disk.
pub fn load_wav(path: &Path) -> Result<WaveformBuffer, LinkError> {
    let file = std::fs::File::open(path)
        .map_err(|e| LinkError::StorageError(format!("open {}: {e}", path.display())))?;
    decode_wav(std::io::BufReader::new(file))
}
