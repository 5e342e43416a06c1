use std::fs::File;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::assets::media::{StillImage, decode_audio_f32, decode_image};
use crate::audio::pcm::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::FrameSink;
use crate::foundation::error::{ReelError, ReelResult, RenderStage};

/// Anything opened for the duration of one render that must be released afterwards.
pub trait MediaHandle: Send {
    /// Short role name used in logs (`narration`, `music`, `background`, `encoder`).
    fn label(&self) -> &str;
    /// Release the underlying file, decoder or process. Called exactly once by [`Scoped`].
    fn release(&mut self) -> ReelResult<()>;
}

/// Opened audio input.
pub trait AudioInput: MediaHandle {
    fn decode(&mut self) -> ReelResult<AudioPcm>;
}

/// Opened still-image input.
pub trait ImageInput: MediaHandle {
    fn decode(&mut self) -> ReelResult<StillImage>;
}

/// Opened encoder.
pub trait EncoderHandle: MediaHandle + FrameSink {}

impl<T: MediaHandle + FrameSink> EncoderHandle for T {}

impl<T: MediaHandle + ?Sized> MediaHandle for Box<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn release(&mut self) -> ReelResult<()> {
        (**self).release()
    }
}

/// Opens the inputs and the encoder of a render.
pub trait MediaProvider: Send + Sync {
    fn open_audio(&self, label: &str, path: &Path) -> ReelResult<Box<dyn AudioInput>>;
    fn open_image(&self, path: &Path) -> ReelResult<Box<dyn ImageInput>>;
    fn open_encoder(&self, out_path: &Path, overwrite: bool) -> ReelResult<Box<dyn EncoderHandle>>;
}

/// Release-on-drop guard around a [`MediaHandle`].
///
/// The handle is released exactly once: either explicitly through [`Scoped::release`] or when the
/// guard is dropped (including during unwinding). Release failures on drop are logged and never
/// replace the result of the render.
pub struct Scoped<H: MediaHandle> {
    handle: H,
    released: bool,
}

impl<H: MediaHandle> Scoped<H> {
    pub fn new(handle: H) -> Self {
        tracing::debug!(handle = handle.label(), "opened");
        Self {
            handle,
            released: false,
        }
    }

    /// Release now and report the outcome.
    pub fn release(mut self) -> ReelResult<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> ReelResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::debug!(handle = self.handle.label(), "releasing");
        self.handle.release()
    }
}

impl<H: MediaHandle> Deref for Scoped<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H: MediaHandle> DerefMut for Scoped<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

impl<H: MediaHandle> Drop for Scoped<H> {
    fn drop(&mut self) {
        if let Err(e) = self.release_once() {
            tracing::warn!(handle = self.handle.label(), error = %e, "failed to release handle");
        }
    }
}

/// Temporary file removed when the guard is dropped.
#[derive(Debug, Default)]
pub struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    /// Unique path in the system temp directory.
    pub fn in_temp_dir(prefix: &str, ext: &str) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self(Some(std::env::temp_dir().join(format!(
            "{prefix}_{}_{nanos}.{ext}",
            std::process::id()
        ))))
    }

    pub fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Audio file decoded with the system `ffmpeg`.
///
/// The file is held open from `open` until release so it cannot vanish mid-render.
pub struct FfmpegAudioInput {
    label: String,
    path: PathBuf,
    file: Option<File>,
}

impl MediaHandle for FfmpegAudioInput {
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) -> ReelResult<()> {
        drop(self.file.take());
        Ok(())
    }
}

impl AudioInput for FfmpegAudioInput {
    fn decode(&mut self) -> ReelResult<AudioPcm> {
        if self.file.is_none() {
            return Err(ReelError::validation(format!(
                "{} input already released",
                self.label
            )));
        }
        decode_audio_f32(&self.path, MIX_SAMPLE_RATE, MIX_CHANNELS)
    }
}

/// Still image read from disk and decoded with `image`.
pub struct FileImageInput {
    path: PathBuf,
    file: Option<File>,
}

impl MediaHandle for FileImageInput {
    fn label(&self) -> &str {
        "background"
    }

    fn release(&mut self) -> ReelResult<()> {
        drop(self.file.take());
        Ok(())
    }
}

impl ImageInput for FileImageInput {
    fn decode(&mut self) -> ReelResult<StillImage> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ReelError::validation("background input already released"))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            ReelError::validation(format!(
                "failed to read background image '{}': {e}",
                self.path.display()
            ))
        })?;
        decode_image(&bytes)
    }
}

impl MediaHandle for FfmpegSink {
    fn label(&self) -> &str {
        "encoder"
    }

    fn release(&mut self) -> ReelResult<()> {
        self.abort()
    }
}

/// Production provider: files on disk, `ffmpeg` for audio decode and encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMediaProvider {
    /// Color transparent output pixels are flattened against.
    pub bg_rgb: [u8; 3],
}

fn open_file(path: &Path, what: &str) -> ReelResult<File> {
    File::open(path).map_err(|e| {
        ReelError::input(
            RenderStage::OpenInputs,
            format!("cannot open {what} '{}': {e}", path.display()),
        )
    })
}

impl MediaProvider for FfmpegMediaProvider {
    fn open_audio(&self, label: &str, path: &Path) -> ReelResult<Box<dyn AudioInput>> {
        let file = open_file(path, label)?;
        Ok(Box::new(FfmpegAudioInput {
            label: label.to_owned(),
            path: path.to_path_buf(),
            file: Some(file),
        }))
    }

    fn open_image(&self, path: &Path) -> ReelResult<Box<dyn ImageInput>> {
        let file = open_file(path, "background image")?;
        Ok(Box::new(FileImageInput {
            path: path.to_path_buf(),
            file: Some(file),
        }))
    }

    fn open_encoder(&self, out_path: &Path, overwrite: bool) -> ReelResult<Box<dyn EncoderHandle>> {
        let mut opts = FfmpegSinkOpts::new(out_path);
        opts.overwrite = overwrite;
        opts.bg_rgb = self.bg_rgb;
        Ok(Box::new(FfmpegSink::new(opts)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/resources.rs"]
mod tests;
