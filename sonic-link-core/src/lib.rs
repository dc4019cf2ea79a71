//! # sonic-link-core
//!
//! Platform-agnostic core of an acoustic text link.
//!
//! Bridges irregular OS audio callbacks to a frame-oriented modem engine:
//! framing, level metering, decode-state edge detection, playback
//! sequencing and WAV diagnostics. Platform backends implement
//! `CaptureProvider`, `PlaybackProvider` and `PermissionProvider` and plug
//! into the generic `LinkSession`. The modem itself sits behind
//! `DecodeEngine` / `EncodeEngine`.
//!
//! ## Architecture
//!
//! ```text
//! sonic-link-core (this crate)
//! ├── traits/       ← CaptureProvider, PlaybackProvider, PermissionProvider, engines, LinkDelegate
//! ├── models/       ← LinkError, CaptureState, LinkConfiguration, LinkEvent, Protocol, etc.
//! ├── processing/   ← FrameReassembler, LevelMeter, Resampler, WAV codec
//! ├── session/      ← LinkSession, CaptureSession, DecodeOrchestrator, PlaybackSession, DiagnosticRecorder
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioFrame, AudioSource, CaptureDiagnostics, DecodedMessage, DeviceKind, LevelSample, WaveformBuffer,
};
pub use models::config::{FramingPolicy, LinkConfiguration, PlaybackOverlap};
pub use models::error::LinkError;
pub use models::events::{DecodeEvent, DecodeEventKind, LinkEvent, TransmissionPhase};
pub use models::protocol::Protocol;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::framer::FrameReassembler;
pub use processing::level_meter::LevelMeter;
pub use processing::resampler::{resample_buffer, Resampler};
pub use processing::wav_format::{decode_wav, encode_wav, load_wav};
pub use session::capture::CaptureSession;
pub use session::link::{LinkProviders, LinkSession};
pub use session::playback::PlaybackSession;
pub use session::recorder::DiagnosticRecorder;
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::delegate::{ChannelDelegate, LinkDelegate};
pub use traits::engine::{AcousticEngine, DecodeEngine, EncodeEngine};
pub use traits::permission::{AlwaysGranted, PermissionProvider, PermissionStatus};
pub use traits::playback_provider::PlaybackProvider;
