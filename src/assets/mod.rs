//! Decoding of narration, music and background inputs.

pub mod media;

pub use media::{StillImage, decode_audio_f32, decode_image};
