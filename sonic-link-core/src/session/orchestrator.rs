use chrono::Utc;

use crate::models::audio_models::DecodedMessage;
use crate::models::events::{DecodeEvent, DecodeEventKind, LinkEvent, ProtocolState, TransmissionPhase};
use crate::traits::engine::DecodeEngine;

/// Turns the decode engine's level-style flags into edge-triggered events.
///
/// ```text
///          receiving↑            analyzing↑
///   Idle ─────────────▶ Receiving ──────────▶ Analyzing
///    ▲   start_marker       │      end_marker     │
///    └──────────────────────┴─────────────────────┘
///                      receiving↓ (silent reset)
/// ```
///
/// Flags are sampled once per frame, after `decode`. A marker is emitted
/// exactly once per edge; holding a flag emits nothing. A non-empty decode
/// result is emitted in the same frame it is returned, after any marker
/// events for that frame.
#[derive(Debug, Clone)]
pub struct DecodeOrchestrator {
    phase: TransmissionPhase,
    report_failures: bool,
    decoded_since_start: bool,
    frames: u64,
}

impl DecodeOrchestrator {
    /// With `report_failures`, a transmission that reached `Analyzing` and
    /// reset without any decoded message yields a `DecodeFailed` event.
    pub fn new(report_failures: bool) -> Self {
        Self {
            phase: TransmissionPhase::Idle,
            report_failures,
            decoded_since_start: false,
            frames: 0,
        }
    }

    pub fn phase(&self) -> TransmissionPhase {
        self.phase
    }

    /// Frames fed to the engine since construction.
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Decode one frame and emit every event it produces, in order.
    ///
    /// Returns the decoded message, if any.
    pub fn process<E, F>(&mut self, engine: &mut E, frame: &[f32], mut emit: F) -> Option<DecodedMessage>
    where
        E: DecodeEngine + ?Sized,
        F: FnMut(LinkEvent),
    {
        let timestamp = Utc::now();
        let frame_index = self.frames;
        self.frames += 1;

        let text = engine.decode(frame).filter(|text| !text.is_empty());
        let flags = ProtocolState {
            receiving: engine.is_receiving(),
            analyzing: engine.is_analyzing(),
        };

        let marker = |kind| LinkEvent::Decode(DecodeEvent::new(kind, timestamp));
        match self.phase {
            TransmissionPhase::Idle => {
                if flags.receiving {
                    self.decoded_since_start = false;
                    self.phase = TransmissionPhase::Receiving;
                    emit(marker(DecodeEventKind::StartMarker));
                    if flags.analyzing {
                        self.phase = TransmissionPhase::Analyzing;
                        emit(marker(DecodeEventKind::EndMarker));
                    }
                }
            }
            TransmissionPhase::Receiving => {
                if !flags.receiving {
                    self.phase = TransmissionPhase::Idle;
                } else if flags.analyzing {
                    self.phase = TransmissionPhase::Analyzing;
                    emit(marker(DecodeEventKind::EndMarker));
                }
            }
            TransmissionPhase::Analyzing => {
                if !flags.receiving {
                    self.phase = TransmissionPhase::Idle;
                    if self.report_failures && !self.decoded_since_start && text.is_none() {
                        emit(marker(DecodeEventKind::DecodeFailed));
                    }
                }
            }
        }

        let text = text?;
        self.decoded_since_start = true;
        let message = DecodedMessage {
            text,
            timestamp,
            frame_index,
        };
        log::debug!("decoded {} chars at frame {}", message.text.len(), frame_index);
        emit(LinkEvent::DataReceived(message.clone()));
        emit(LinkEvent::Decode(DecodeEvent::success(&message)));
        Some(message)
    }
}
