use crate::models::error::LinkError;
use crate::models::protocol::Protocol;

/// Receive half of the acoustic modem.
///
/// Single-owner: the link session serializes every call.
pub trait DecodeEngine {
    /// Feed one frame of mono samples at [`DecodeEngine::sample_rate`].
    ///
    /// `None` (or an empty string) means no message completed in this frame.
    fn decode(&mut self, samples: &[f32]) -> Option<String>;

    /// A start marker has been seen and payload is being collected.
    fn is_receiving(&self) -> bool;

    /// The end marker has been seen and the payload is being analyzed.
    fn is_analyzing(&self) -> bool;

    fn sample_rate(&self) -> u32;
}

/// Transmit half of the acoustic modem.
pub trait EncodeEngine {
    /// Synthesize `text` as a mono waveform at the engine's sample rate.
    ///
    /// `volume` is 0–100.
    fn encode(&mut self, text: &str, protocol: Protocol, volume: u8) -> Result<Vec<f32>, LinkError>;

    fn available_protocols(&self) -> Vec<Protocol> {
        Protocol::ALL.to_vec()
    }
}

/// One engine instance serving both directions.
pub trait AcousticEngine: DecodeEngine + EncodeEngine + Send {}

impl<T: DecodeEngine + EncodeEngine + Send> AcousticEngine for T {}
