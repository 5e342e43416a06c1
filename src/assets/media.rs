use std::path::Path;
use std::process::Command;

use anyhow::Context;

use crate::audio::pcm::{AudioPcm, f32le_from_bytes};
use crate::foundation::error::{ReelError, ReelResult, RenderStage};

/// Decoded still image, premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StillImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

/// Decode any raster format supported by `image`.
pub fn decode_image(bytes: &[u8]) -> ReelResult<StillImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(StillImage {
        width,
        height,
        rgba8_premul,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// Decode the audio stream of `path` to interleaved `f32` at the given layout using `ffmpeg`.
///
/// A file without any audio stream decodes to empty PCM.
pub fn decode_audio_f32(path: &Path, sample_rate: u32, channels: u16) -> ReelResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            ReelError::environment(
                RenderStage::AudioMix,
                format!("failed to run ffmpeg for audio decode: {e}"),
            )
        })?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
            || msg.contains("does not contain any stream")
        {
            return AudioPcm::new(sample_rate, channels, Vec::new());
        }
        return Err(ReelError::input(
            RenderStage::AudioMix,
            format!(
                "ffmpeg audio decode failed for '{}': {}",
                path.display(),
                msg.trim()
            ),
        ));
    }

    AudioPcm::new(sample_rate, channels, f32le_from_bytes(&out.stdout)?)
}

/// Container-reported duration of a media file, via `ffprobe`.
pub fn probe_duration_secs(path: &Path) -> ReelResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: ProbeFormat,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(path)
        .output()
        .context("failed to run ffprobe")?;
    if !out.status.success() {
        return Err(ReelError::validation(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::serde(format!("ffprobe json parse error: {e}")))?;
    parsed
        .format
        .duration
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ReelError::validation("ffprobe reported no duration"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
