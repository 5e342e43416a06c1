use std::path::PathBuf;

use crate::audio::pcm::f32le_from_bytes;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ReelResult;
use crate::render::FrameRGBA;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Mixed audio to mux alongside the frames.
    pub audio: Option<AudioInputConfig>,
    /// Exact duration the output must have, in seconds.
    pub duration_secs: f64,
}

/// Raw PCM audio input for sinks that mux audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Consumer of composited frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing, gapless `FrameIndex`
/// values starting at 0.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Called once after the last frame; the output is complete when this returns `Ok`.
    fn end(&mut self) -> ReelResult<()>;
}

/// Sink that keeps everything in memory. Used by tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    keep_frames: bool,
    indices: Vec<FrameIndex>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    audio: Option<Vec<f32>>,
    finished: bool,
}

impl InMemorySink {
    /// Sink that records frame indices and audio but drops pixel data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that also keeps every pushed frame.
    pub fn keeping_frames() -> Self {
        Self {
            keep_frames: true,
            ..Self::default()
        }
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Interleaved samples read from the audio input at `begin`.
    pub fn audio(&self) -> Option<&[f32]> {
        self.audio.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.audio = match cfg.audio.as_ref() {
            Some(a) => {
                use anyhow::Context as _;
                let bytes = std::fs::read(&a.path)
                    .with_context(|| format!("failed to read audio input '{}'", a.path.display()))?;
                Some(f32le_from_bytes(&bytes)?)
            }
            None => None,
        };
        self.cfg = Some(cfg);
        self.indices.clear();
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        self.indices.push(idx);
        if self.keep_frames {
            self.frames.push((idx, frame.clone()));
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }
}
