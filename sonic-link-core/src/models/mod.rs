pub mod audio_models;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod recording_result;
pub mod state;
