use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur on the capture, playback and diagnostic paths.
///
/// A decode miss is not represented here: an empty decode result is the
/// normal case for frames without a transmission.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("capture session already active")]
    AlreadyActive,

    #[error("waveform is empty")]
    EmptyBuffer,

    #[error("no recorded audio")]
    NoData,

    #[error("playback already in progress")]
    PlaybackBusy,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("invalid audio container: {0}")]
    InvalidContainer(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl LinkError {
    /// Whether the caller may keep using the session after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyActive | Self::PlaybackBusy | Self::NoData | Self::EmptyBuffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(LinkError::EmptyBuffer.to_string(), "waveform is empty");
        assert_eq!(
            LinkError::DeviceUnavailable("no input".into()).to_string(),
            "audio device unavailable: no input"
        );
    }

    #[test]
    fn already_active_is_recoverable() {
        assert!(LinkError::AlreadyActive.is_recoverable());
        assert!(!LinkError::PermissionDenied.is_recoverable());
        assert!(!LinkError::DeviceUnavailable(String::new()).is_recoverable());
    }
}
