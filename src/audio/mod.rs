pub mod mix;
pub mod pcm;

pub use mix::{MixedAudioTrack, fit_music, mix_tracks};
pub use pcm::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE};
