use serde::{Deserialize, Serialize};

/// Transmission protocol understood by the encode engine.
///
/// The numeric ids are stable and shared with callers that pass protocols
/// across a language boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    AudibleNormal = 0,
    AudibleFast = 1,
    AudibleFastest = 2,
    UltrasoundNormal = 3,
    UltrasoundFast = 4,
    UltrasoundFastest = 5,
}

impl Protocol {
    pub const ALL: [Protocol; 6] = [
        Protocol::AudibleNormal,
        Protocol::AudibleFast,
        Protocol::AudibleFastest,
        Protocol::UltrasoundNormal,
        Protocol::UltrasoundFast,
        Protocol::UltrasoundFastest,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn is_ultrasound(self) -> bool {
        matches!(
            self,
            Self::UltrasoundNormal | Self::UltrasoundFast | Self::UltrasoundFastest
        )
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::AudibleFast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable() {
        assert_eq!(Protocol::AudibleNormal.id(), 0);
        assert_eq!(Protocol::UltrasoundFastest.id(), 5);
        assert_eq!(Protocol::from_id(4), Some(Protocol::UltrasoundFast));
        assert_eq!(Protocol::from_id(6), None);
    }

    #[test]
    fn ultrasound_classification() {
        assert!(!Protocol::AudibleFastest.is_ultrasound());
        assert!(Protocol::UltrasoundNormal.is_ultrasound());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Protocol::UltrasoundFast).unwrap();
        assert_eq!(json, "\"ultrasound_fast\"");
    }
}
