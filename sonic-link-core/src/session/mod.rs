pub mod capture;
pub mod dispatcher;
pub mod link;
pub mod orchestrator;
pub mod playback;
pub mod receive;
pub mod recorder;
