pub mod capture_provider;
pub mod delegate;
pub mod engine;
pub mod permission;
pub mod playback_provider;
