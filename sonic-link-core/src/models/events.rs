use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audio_models::{DecodedMessage, LevelSample};
use super::state::CaptureState;

/// Snapshot of the decode engine's marker flags, sampled once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolState {
    pub receiving: bool,
    pub analyzing: bool,
}

/// Where the decode orchestrator is within a transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionPhase {
    #[default]
    Idle,
    Receiving,
    Analyzing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeEventKind {
    StartMarker,
    EndMarker,
    DecodeSuccess,
    DecodeFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEvent {
    #[serde(rename = "type")]
    pub kind: DecodeEventKind,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecodeEvent {
    pub fn new(kind: DecodeEventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: None,
            timestamp,
        }
    }

    pub fn success(message: &DecodedMessage) -> Self {
        Self {
            kind: DecodeEventKind::DecodeSuccess,
            message: Some(message.text.clone()),
            timestamp: message.timestamp,
        }
    }
}

/// Everything a link session reports to the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LinkEvent {
    DataReceived(DecodedMessage),
    AudioLevel(LevelSample),
    Decode(DecodeEvent),
    StateChanged(CaptureState),
    Error { message: String },
}

impl LinkEvent {
    /// The decode event kind, if this is a decode lifecycle event.
    pub fn decode_kind(&self) -> Option<DecodeEventKind> {
        match self {
            Self::Decode(event) => Some(event.kind),
            _ => None,
        }
    }
}
