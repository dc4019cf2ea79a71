//! # sonic-link-cpal
//!
//! cpal backend for sonic-link.
//!
//! Provides:
//! - `CpalMicCapture`: microphone capture on a dedicated stream thread
//! - `CpalSpeakerOutput`: WAV container playback on the output device
//! - `DeviceEnumerator`: input and output device listing
//! - `DesktopMicPermission`: microphone access check
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use sonic_link_core::{LinkConfiguration, LinkProviders, LinkSession, ChannelDelegate};
//! use sonic_link_cpal::{CpalMicCapture, CpalSpeakerOutput, DesktopMicPermission};
//!
//! let config = LinkConfiguration::default();
//! let providers = LinkProviders {
//!     capture: CpalMicCapture::from_config(&config),
//!     output: CpalSpeakerOutput::default_device(),
//!     permission: Arc::new(DesktopMicPermission::default()),
//! };
//! let (delegate, events) = ChannelDelegate::new();
//! let session = LinkSession::new(config, providers, my_engine, delegate)?;
//! session.start_listening()?;
//! ```

pub mod device_enumerator;
pub mod mic_capture;
pub mod permissions;
pub mod speaker_output;

pub use device_enumerator::DeviceEnumerator;
pub use mic_capture::{CpalMicCapture, StreamFormat};
pub use permissions::DesktopMicPermission;
pub use speaker_output::CpalSpeakerOutput;
