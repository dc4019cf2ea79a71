use serde::{Deserialize, Serialize};

/// Microphone authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Platform microphone authorization.
pub trait PermissionProvider: Send + Sync {
    /// Current status without prompting.
    fn status(&self) -> PermissionStatus;

    /// Prompt the user if needed and block until they answer.
    ///
    /// Never returns `Undetermined`; implementations that cannot prompt
    /// report `Denied`.
    fn request_access(&self) -> PermissionStatus;
}

/// For platforms without a microphone permission model.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl PermissionProvider for AlwaysGranted {
    fn status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request_access(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }
}
