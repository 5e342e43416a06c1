use crate::audio::pcm::AudioPcm;
use crate::foundation::error::{ReelError, ReelResult};

/// Default music attenuation relative to its source amplitude.
pub const DEFAULT_MUSIC_GAIN: f32 = 0.1;

/// Music stretched to the narration length by tiling or trimming.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedMusic {
    /// Interleaved in the narration's channel layout, exactly `target_frames` long.
    pub interleaved_f32: Vec<f32>,
    /// Number of (possibly partial) copies of the source laid end to end.
    pub copies: u32,
}

impl FittedMusic {
    /// Points where one copy of the music ends and the next begins.
    pub fn loop_boundaries(&self) -> u32 {
        self.copies.saturating_sub(1)
    }
}

/// Final audio signal for one render.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudioTrack {
    pub pcm: AudioPcm,
    /// `Some` when music was mixed in.
    pub music: Option<MusicSummary>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MusicSummary {
    pub gain: f32,
    pub copies: u32,
    pub source_secs: f64,
}

impl MixedAudioTrack {
    pub fn narration_only(narration: &AudioPcm) -> Self {
        Self {
            pcm: narration.clone(),
            music: None,
        }
    }
}

/// Tile `music` by back-to-back copies until it covers `target_frames`, then truncate.
///
/// Music longer than the target is simply truncated from its beginning. Mono music is
/// duplicated across `channels`.
pub fn fit_music(music: &AudioPcm, target_frames: usize, channels: u16) -> ReelResult<FittedMusic> {
    let src_frames = music.frames();
    if src_frames == 0 {
        return Err(ReelError::validation("music track has no samples"));
    }
    if music.channels != channels && music.channels != 1 {
        return Err(ReelError::validation(format!(
            "music has {} channels; expected 1 or {channels}",
            music.channels
        )));
    }

    let ch = usize::from(channels);
    let src_ch = usize::from(music.channels);
    let mut out = Vec::with_capacity(target_frames * ch);
    for frame in 0..target_frames {
        let src = (frame % src_frames) * src_ch;
        for c in 0..ch {
            out.push(music.interleaved_f32[src + c.min(src_ch - 1)]);
        }
    }

    let copies = if target_frames == 0 {
        0
    } else {
        target_frames.div_ceil(src_frames) as u32
    };
    Ok(FittedMusic {
        interleaved_f32: out,
        copies,
    })
}

/// Mix attenuated, duration-fitted music under the narration.
///
/// The narration defines the output length and is never attenuated. Without music the result is
/// the narration unchanged, sample for sample.
pub fn mix_tracks(
    narration: &AudioPcm,
    music: Option<&AudioPcm>,
    music_gain: f32,
) -> ReelResult<MixedAudioTrack> {
    let Some(music) = music else {
        return Ok(MixedAudioTrack::narration_only(narration));
    };
    if music.sample_rate != narration.sample_rate {
        return Err(ReelError::validation(format!(
            "music sample rate {} does not match narration sample rate {}",
            music.sample_rate, narration.sample_rate
        )));
    }
    if !music_gain.is_finite() || music_gain < 0.0 {
        return Err(ReelError::validation("music gain must be finite and >= 0"));
    }

    let fitted = fit_music(music, narration.frames(), narration.channels)?;
    let mut out = narration.interleaved_f32.clone();
    for (dst, m) in out.iter_mut().zip(&fitted.interleaved_f32) {
        *dst = (*dst + m * music_gain).clamp(-1.0, 1.0);
    }

    Ok(MixedAudioTrack {
        pcm: AudioPcm {
            sample_rate: narration.sample_rate,
            channels: narration.channels,
            interleaved_f32: out,
        },
        music: Some(MusicSummary {
            gain: music_gain,
            copies: fitted.copies,
            source_secs: music.duration_secs(),
        }),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
