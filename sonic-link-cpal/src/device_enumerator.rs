//! Audio device enumeration via cpal.
//!
//! Lists input (microphone) and output (speaker/headphone) devices of the
//! default host. cpal identifies devices by name only, so the name doubles
//! as the device id.

use cpal::traits::{DeviceTrait, HostTrait};

use sonic_link_core::models::audio_models::{AudioSource, DeviceKind};
use sonic_link_core::models::error::LinkError;

/// Audio device enumerator over the default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Name of the host API in use (ALSA, CoreAudio, WASAPI...).
    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// List input devices. The default device is flagged.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, LinkError> {
        let default_name = self.default_input_device_id();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| LinkError::DeviceUnavailable(format!("input enumeration failed: {}", e)))?;

        Ok(devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device.default_input_config().ok();
                Some(AudioSource {
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    id: name.clone(),
                    name,
                    kind: DeviceKind::Input,
                    default_sample_rate: config.as_ref().map(|c| c.sample_rate().0),
                    channels: config.as_ref().map(|c| c.channels()),
                })
            })
            .collect())
    }

    /// List output devices. The default device is flagged.
    pub fn list_output_devices(&self) -> Result<Vec<AudioSource>, LinkError> {
        let default_name = self.default_output_device_id();
        let devices = self
            .host
            .output_devices()
            .map_err(|e| LinkError::DeviceUnavailable(format!("output enumeration failed: {}", e)))?;

        Ok(devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device.default_output_config().ok();
                Some(AudioSource {
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    id: name.clone(),
                    name,
                    kind: DeviceKind::Output,
                    default_sample_rate: config.as_ref().map(|c| c.sample_rate().0),
                    channels: config.as_ref().map(|c| c.channels()),
                })
            })
            .collect())
    }

    pub fn default_input_device_id(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    pub fn default_output_device_id(&self) -> Option<String> {
        self.host.default_output_device().and_then(|d| d.name().ok())
    }

    /// Resolve an input device by id, or the default device for `None`.
    pub fn input_device(&self, id: Option<&str>) -> Result<cpal::Device, LinkError> {
        match id {
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| LinkError::DeviceUnavailable("no default input device".into())),
            Some(id) => self
                .host
                .input_devices()
                .map_err(|e| LinkError::DeviceUnavailable(format!("input enumeration failed: {}", e)))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| LinkError::DeviceUnavailable(format!("input device '{}' not found", id))),
        }
    }

    /// Resolve an output device by id, or the default device for `None`.
    pub fn output_device(&self, id: Option<&str>) -> Result<cpal::Device, LinkError> {
        match id {
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| LinkError::DeviceUnavailable("no default output device".into())),
            Some(id) => self
                .host
                .output_devices()
                .map_err(|e| LinkError::DeviceUnavailable(format!("output enumeration failed: {}", e)))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| LinkError::DeviceUnavailable(format!("output device '{}' not found", id))),
        }
    }
}
