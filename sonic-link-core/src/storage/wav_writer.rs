use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::LinkError;
use crate::processing::wav_format;

/// Streaming mono 16-bit WAV writer for diagnostic recordings.
///
/// ```text
/// [44-byte WAV header, sizes zero until close]
/// [raw 16-bit PCM data...]
/// ```
///
/// Sizes are patched into the header on [`WavFileWriter::close`], which
/// also returns the SHA-256 of the finished file.
pub struct WavFileWriter {
    file_path: PathBuf,
    sample_rate: u32,
    file: Option<BufWriter<File>>,
    total_bytes_written: u64,
    scratch: Vec<u8>,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, sample_rate: u32) -> Self {
        Self {
            file_path,
            sample_rate,
            file: None,
            total_bytes_written: 0,
            scratch: Vec::new(),
        }
    }

    /// Create the file and write the initial header.
    pub fn open(&mut self) -> Result<(), LinkError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| LinkError::StorageError(format!("failed to create directory: {e}")))?;
        }

        let file = File::create(&self.file_path)
            .map_err(|e| LinkError::StorageError(format!("failed to create file: {e}")))?;
        self.file = Some(BufWriter::new(file));
        self.total_bytes_written = 0;

        let header = wav_format::generate_wav_header(self.sample_rate, wav_format::PCM_BIT_DEPTH, 1, 0);
        self.write_raw(&header)
    }

    /// Quantize and append samples.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), LinkError> {
        if self.file.is_none() {
            return Err(LinkError::StorageError("file is not open for writing".into()));
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        wav_format::encode_pcm16_into(samples, &mut scratch);
        let result = self.write_raw(&scratch);
        self.scratch = scratch;
        result
    }

    /// Finalize the header sizes and return the file's SHA-256 hex digest.
    pub fn close(&mut self) -> Result<String, LinkError> {
        let writer = self
            .file
            .take()
            .ok_or_else(|| LinkError::StorageError("file is not open".into()))?;
        let mut file = writer
            .into_inner()
            .map_err(|e| LinkError::StorageError(format!("flush failed: {e}")))?;

        let mut header = [0u8; 8];
        let data_size = self.total_bytes_written - wav_format::WAV_HEADER_SIZE as u64;
        if data_size + 36 > u32::MAX as u64 {
            return Err(LinkError::StorageError(format!("{data_size} data bytes exceed WAV size limit")));
        }

        wav_format::patch_file_size(&mut header, self.total_bytes_written);
        file.seek(SeekFrom::Start(4))
            .and_then(|_| file.write_all(&header[4..8]))
            .map_err(|e| LinkError::StorageError(e.to_string()))?;

        file.seek(SeekFrom::Start(40))
            .and_then(|_| file.write_all(&(data_size as u32).to_le_bytes()))
            .and_then(|_| file.flush())
            .map_err(|e| LinkError::StorageError(e.to_string()))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Total bytes written so far (including WAV header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), LinkError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LinkError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| LinkError::StorageError(format!("write failed: {e}")))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, LinkError> {
    let mut file = File::open(path)
        .map_err(|e| LinkError::StorageError(format!("failed to read file for checksum: {e}")))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .map_err(|e| LinkError::StorageError(format!("failed to read file for checksum: {e}")))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
