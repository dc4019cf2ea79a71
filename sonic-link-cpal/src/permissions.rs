//! Desktop microphone permission check.
//!
//! Desktop hosts have no consent API reachable through cpal. On macOS
//! (TCC) and Windows (privacy settings) a blocked microphone shows up as a
//! device whose configuration cannot be queried, so that is the signal
//! used here.

use cpal::traits::DeviceTrait;

use sonic_link_core::traits::permission::{PermissionProvider, PermissionStatus};

use crate::device_enumerator::DeviceEnumerator;

/// Permission source probing the input device itself.
#[derive(Debug, Clone, Default)]
pub struct DesktopMicPermission {
    device_id: Option<String>,
}

impl DesktopMicPermission {
    pub fn new(device_id: Option<String>) -> Self {
        Self { device_id }
    }

    fn query(&self) -> PermissionStatus {
        let device = match DeviceEnumerator::new().input_device(self.device_id.as_deref()) {
            Ok(device) => device,
            // No device to ask about
            Err(_) => return PermissionStatus::Undetermined,
        };

        match device.default_input_config() {
            Ok(_) => PermissionStatus::Granted,
            Err(e) => {
                log::warn!("input device refused configuration query: {}", e);
                PermissionStatus::Denied
            }
        }
    }
}

impl PermissionProvider for DesktopMicPermission {
    fn status(&self) -> PermissionStatus {
        self.query()
    }

    /// There is no prompt to show. A missing device is reported as granted
    /// so the capture path fails with `DeviceUnavailable` instead.
    fn request_access(&self) -> PermissionStatus {
        match self.query() {
            PermissionStatus::Undetermined => PermissionStatus::Granted,
            status => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_undetermined_then_granted() {
        let permission = DesktopMicPermission::new(Some("no-such-device-7f3a".into()));

        assert_eq!(permission.status(), PermissionStatus::Undetermined);
        assert_eq!(permission.request_access(), PermissionStatus::Granted);
    }
}
