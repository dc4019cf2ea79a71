use serde::{Deserialize, Serialize};

use super::error::LinkError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → requesting_permission → active → stopping → idle
///               ↓
///            failed
/// ```
/// `failed` is left by the next `start` or `stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    RequestingPermission,
    Active { duration_secs: f64 },
    Stopping,
    Failed { error: LinkError },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// True while a start is in progress or the stream is live.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::RequestingPermission | Self::Active { .. })
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Active { duration_secs } => Some(*duration_secs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_states() {
        assert!(CaptureState::RequestingPermission.is_busy());
        assert!(CaptureState::Active { duration_secs: 1.0 }.is_busy());
        assert!(!CaptureState::Idle.is_busy());
        assert!(!CaptureState::Failed {
            error: LinkError::PermissionDenied
        }
        .is_busy());
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(CaptureState::Active { duration_secs: 2.5 }).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["duration_secs"], 2.5);
    }
}
