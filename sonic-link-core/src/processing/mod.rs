pub mod framer;
pub mod level_meter;
pub mod resampler;
pub mod wav_format;
