use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::audio::mix::{MixedAudioTrack, mix_tracks};
use crate::audio::pcm::{AudioPcm, write_f32le_file};
use crate::captions::cue::{CaptionCue, ParsedCues, clamp_cues};
use crate::config::RenderConfig;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult, RenderStage};
use crate::render::FrameRGBA;
use crate::render::background::{Background, fit_background};
use crate::render::compositor::{FrameCompositor, prepare_captions};
use crate::session::resources::{
    AudioInput, FfmpegMediaProvider, ImageInput, MediaProvider, Scoped, TempFileGuard,
};
use crate::text::font::{FontOrigin, ResolvedFont, resolve_font};
use crate::text::raster::TextRasterizer;

/// Upper bound on frames held between rendering and encoding.
const MAX_CHUNK_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Music file names probed by [`find_background_music`], in order.
const MUSIC_FILE_NAMES: &[&str] = &["bgm.mp3", "bgm.wav"];

/// Cooperative cancellation flag shared between the caller and a running render.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, stage: RenderStage) -> ReelResult<()> {
        if self.is_cancelled() {
            tracing::info!(%stage, "render cancelled");
            return Err(ReelError::Cancelled(stage));
        }
        Ok(())
    }
}

/// Inputs and output of one render call.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub narration_audio: PathBuf,
    pub background_image: Option<PathBuf>,
    pub background_music: Option<PathBuf>,
    pub cues: Vec<CaptionCue>,
    /// Number of cue blocks the parser rejected; reported back as a degradation.
    pub malformed_cues: usize,
    pub output_path: PathBuf,
    pub canvas: Canvas,
    pub fps: Fps,
}

impl RenderJob {
    /// Job with the canvas and frame rate of `config` and no optional inputs.
    pub fn new(
        narration_audio: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        config: &RenderConfig,
    ) -> Self {
        Self {
            narration_audio: narration_audio.into(),
            background_image: None,
            background_music: None,
            cues: Vec::new(),
            malformed_cues: 0,
            output_path: output_path.into(),
            canvas: config.canvas,
            fps: config.fps,
        }
    }

    pub fn with_background_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.background_image = Some(path.into());
        self
    }

    pub fn with_background_music(mut self, path: impl Into<PathBuf>) -> Self {
        self.background_music = Some(path.into());
        self
    }

    pub fn with_cues(mut self, cues: Vec<CaptionCue>) -> Self {
        self.cues = cues;
        self
    }

    /// Take the well-formed cues of a parse and remember how many blocks were rejected.
    pub fn with_parsed_cues(mut self, parsed: ParsedCues) -> Self {
        self.malformed_cues = parsed.errors.len();
        self.cues = parsed.cues;
        self
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::validation("canvas width/height must be > 0"));
        }
        if self.canvas.width % 2 != 0 || self.canvas.height % 2 != 0 {
            return Err(ReelError::validation(
                "canvas width/height must be even for yuv420p output",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(ReelError::validation("frame rate must be > 0"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ReelError::validation("output path must not be empty"));
        }
        Ok(())
    }
}

/// A recoverable problem the render worked around.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Degradation {
    /// Background image missing or unusable; the solid fallback color was used.
    BackgroundImage { reason: String },
    /// Background music missing or unusable; the narration was used alone.
    BackgroundMusic { reason: String },
    /// No outline font could be loaded; captions used the built-in font.
    BuiltinFont,
    /// Cue blocks the parser rejected.
    MalformedCues { count: usize },
    /// Cues running past the narration were shortened or removed.
    CuesClamped { truncated: usize, dropped: usize },
}

/// Summary of a finished render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    pub output_path: PathBuf,
    pub duration: Duration,
    pub frames: u64,
    pub cues_rendered: usize,
    pub cues_dropped: usize,
    /// Copies of the music laid end to end, when music was mixed in.
    pub music_copies: Option<u32>,
    pub font: FontOrigin,
    pub degradations: Vec<Degradation>,
}

impl RenderReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Everything derived from the inputs before any frame is produced.
struct Prepared {
    compositor: FrameCompositor,
    mixed: MixedAudioTrack,
    duration: Duration,
    frames: u64,
    cues_dropped: usize,
    font: FontOrigin,
}

/// Renders [`RenderJob`]s with one configuration.
pub struct RenderSession {
    config: RenderConfig,
    provider: Arc<dyn MediaProvider>,
}

impl RenderSession {
    /// Session backed by files on disk and the system `ffmpeg`.
    pub fn new(config: RenderConfig) -> ReelResult<Self> {
        let bg = config.background_color;
        Self::with_provider(
            config,
            Arc::new(FfmpegMediaProvider {
                bg_rgb: [bg.r, bg.g, bg.b],
            }),
        )
    }

    pub fn with_provider(config: RenderConfig, provider: Arc<dyn MediaProvider>) -> ReelResult<Self> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `job` end to end.
    ///
    /// Every handle opened along the way is released before this returns, whatever the outcome.
    /// Partial output is left in place on failure.
    #[tracing::instrument(skip_all, fields(out = %job.output_path.display()))]
    pub fn render(&self, job: &RenderJob, cancel: &CancelToken) -> ReelResult<RenderReport> {
        let started = Instant::now();
        job.validate()?;
        if !self.config.overwrite && job.output_path.exists() {
            return Err(ReelError::input(
                RenderStage::OpenInputs,
                format!("output file '{}' already exists", job.output_path.display()),
            ));
        }

        let mut degradations = Vec::new();
        let prepared = self.prepare(job, cancel, &mut degradations)?;

        // Mixed audio goes to a temp file the encoder reads; it must outlive the encoder.
        let audio_tmp = TempFileGuard::in_temp_dir("storyreel_mix", "f32le");
        let audio_path = audio_tmp
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| ReelError::environment(RenderStage::AudioMix, "no temp path"))?;
        write_f32le_file(&prepared.mixed.pcm.interleaved_f32, &audio_path)
            .map_err(|e| e.at_stage(RenderStage::AudioMix))?;

        cancel.check(RenderStage::Encode)?;
        let mut encoder = Scoped::new(
            self.provider
                .open_encoder(&job.output_path, self.config.overwrite)
                .map_err(|e| e.at_stage(RenderStage::Encode))?,
        );
        encoder
            .begin(SinkConfig {
                width: job.canvas.width,
                height: job.canvas.height,
                fps: job.fps,
                audio: Some(AudioInputConfig {
                    path: audio_path,
                    sample_rate: prepared.mixed.pcm.sample_rate,
                    channels: prepared.mixed.pcm.channels,
                }),
                duration_secs: prepared.duration.as_secs_f64(),
            })
            .map_err(|e| e.at_stage(RenderStage::Encode))?;

        self.render_frames(
            &prepared.compositor,
            job.fps,
            prepared.frames,
            &mut **encoder,
            cancel,
        )?;

        cancel.check(RenderStage::Finalize)?;
        encoder
            .end()
            .map_err(|e| e.at_stage(RenderStage::Finalize))?;
        if let Err(e) = encoder.release() {
            tracing::warn!(error = %e, "encoder release failed after a finished render");
        }

        let report = RenderReport {
            output_path: job.output_path.clone(),
            duration: prepared.duration,
            frames: prepared.frames,
            cues_rendered: prepared.compositor.captions().len(),
            cues_dropped: prepared.cues_dropped,
            music_copies: prepared.mixed.music.map(|m| m.copies),
            font: prepared.font,
            degradations,
        };
        tracing::info!(
            frames = report.frames,
            duration_secs = report.duration.as_secs_f64(),
            degraded = report.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render finished"
        );
        Ok(report)
    }

    /// Compose the single frame shown at `t` without encoding anything.
    #[tracing::instrument(skip_all, fields(t_secs = t.as_secs_f64()))]
    pub fn render_preview_frame(&self, job: &RenderJob, t: Duration) -> ReelResult<FrameRGBA> {
        job.validate()?;
        let mut degradations = Vec::new();
        let prepared = self.prepare(job, &CancelToken::new(), &mut degradations)?;
        if t >= prepared.duration {
            return Err(ReelError::validation(format!(
                "preview time {:.3}s is past the narration end ({:.3}s)",
                t.as_secs_f64(),
                prepared.duration.as_secs_f64()
            )));
        }
        Ok(prepared.compositor.compose(t))
    }

    /// Open inputs, fit the background, mix audio and rasterize captions.
    ///
    /// Input handles are scoped to this call and released on every return path.
    fn prepare(
        &self,
        job: &RenderJob,
        cancel: &CancelToken,
        degradations: &mut Vec<Degradation>,
    ) -> ReelResult<Prepared> {
        if job.malformed_cues > 0 {
            tracing::warn!(count = job.malformed_cues, "skipping malformed cue blocks");
            degradations.push(Degradation::MalformedCues {
                count: job.malformed_cues,
            });
        }

        cancel.check(RenderStage::OpenInputs)?;
        let mut narration = Scoped::new(
            self.provider
                .open_audio("narration", &job.narration_audio)
                .map_err(|e| e.at_stage(RenderStage::OpenInputs))?,
        );
        let mut music = job
            .background_music
            .as_deref()
            .and_then(|path| match self.provider.open_audio("music", path) {
                Ok(h) => Some(Scoped::new(h)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "background music unavailable");
                    degradations.push(Degradation::BackgroundMusic {
                        reason: e.to_string(),
                    });
                    None
                }
            });
        let mut image = job
            .background_image
            .as_deref()
            .and_then(|path| match self.provider.open_image(path) {
                Ok(h) => Some(Scoped::new(h)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "background image unavailable");
                    degradations.push(Degradation::BackgroundImage {
                        reason: e.to_string(),
                    });
                    None
                }
            });

        cancel.check(RenderStage::Background)?;
        let background = self.build_background(image.as_deref_mut(), job.canvas, degradations);
        drop(image);

        cancel.check(RenderStage::AudioMix)?;
        let narration_pcm = narration
            .decode()
            .map_err(|e| e.at_stage(RenderStage::AudioMix))?;
        if narration_pcm.is_empty() {
            return Err(ReelError::input(
                RenderStage::AudioMix,
                format!(
                    "narration '{}' has no audio samples",
                    job.narration_audio.display()
                ),
            ));
        }
        let mixed = self.build_audio(&narration_pcm, music.as_deref_mut(), degradations);
        drop(music);
        drop(narration);

        let duration = narration_pcm.duration();
        let frames = job.fps.frames_covering_secs(duration.as_secs_f64());

        let (cues, cues_dropped) = clamp_cues(&job.cues, duration);
        let truncated = job
            .cues
            .iter()
            .filter(|c| c.start < duration && c.end > duration)
            .count();
        if truncated > 0 || cues_dropped > 0 {
            tracing::warn!(truncated, dropped = cues_dropped, "cues clamped to narration length");
            degradations.push(Degradation::CuesClamped {
                truncated,
                dropped: cues_dropped,
            });
        }

        let font = if self.config.font.builtin {
            ResolvedFont::Builtin
        } else {
            resolve_font(&self.config.font.spec())
        };
        let mut rasterizer = TextRasterizer::new(&font);
        if rasterizer.is_builtin() && !self.config.font.builtin {
            degradations.push(Degradation::BuiltinFont);
        }
        let font_origin = if rasterizer.is_builtin() {
            FontOrigin::Builtin
        } else {
            font.origin()
        };
        let captions = prepare_captions(
            &cues,
            &mut rasterizer,
            job.canvas,
            &self.config.caption_style(),
        );
        tracing::debug!(
            captions = captions.len(),
            frames,
            duration_secs = duration.as_secs_f64(),
            "inputs prepared"
        );

        Ok(Prepared {
            compositor: FrameCompositor::new(background, captions),
            mixed,
            duration,
            frames,
            cues_dropped,
            font: font_origin,
        })
    }

    fn build_background(
        &self,
        image: Option<&mut Box<dyn ImageInput>>,
        canvas: Canvas,
        degradations: &mut Vec<Degradation>,
    ) -> Background {
        let fallback = self.config.background_color;
        let Some(image) = image else {
            return Background::solid(canvas, fallback);
        };
        let background = match image.decode() {
            Ok(still) => fit_background(Some(&still), canvas, fallback),
            Err(e) => {
                tracing::warn!(error = %e, "background image could not be decoded; using solid color");
                let mut bg = Background::solid(canvas, fallback);
                bg.fallback_reason = Some(e.to_string());
                bg
            }
        };
        if let Some(reason) = &background.fallback_reason {
            degradations.push(Degradation::BackgroundImage {
                reason: reason.clone(),
            });
        }
        background
    }

    fn build_audio(
        &self,
        narration: &AudioPcm,
        music: Option<&mut Box<dyn AudioInput>>,
        degradations: &mut Vec<Degradation>,
    ) -> MixedAudioTrack {
        let Some(music) = music else {
            return MixedAudioTrack::narration_only(narration);
        };
        let mixed = music
            .decode()
            .and_then(|pcm| mix_tracks(narration, Some(&pcm), self.config.music_gain));
        match mixed {
            Ok(track) => {
                if let Some(m) = &track.music {
                    tracing::debug!(copies = m.copies, source_secs = m.source_secs, "music mixed");
                }
                track
            }
            Err(e) => {
                tracing::warn!(error = %e, "background music failed; using narration only");
                degradations.push(Degradation::BackgroundMusic {
                    reason: e.to_string(),
                });
                MixedAudioTrack::narration_only(narration)
            }
        }
    }

    /// Compose frames in batches and push them to `sink` in strictly increasing order.
    fn render_frames<S: FrameSink + ?Sized>(
        &self,
        compositor: &FrameCompositor,
        fps: Fps,
        total_frames: u64,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> ReelResult<()> {
        let opts = &self.config.render;
        let bytes_per_frame = (compositor.canvas().rgba_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_CHUNK_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = (opts.chunk_size.max(1) as u64).min(max_chunk_by_mem);

        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };

        let range = FrameRange::new(FrameIndex(0), FrameIndex(total_frames))?;
        for chunk in range.chunks(chunk_size) {
            cancel.check(RenderStage::FrameRender)?;
            let frames: Vec<FrameRGBA> = match pool.as_ref() {
                Some(pool) => pool.install(|| {
                    (chunk.start.0..chunk.end.0)
                        .into_par_iter()
                        .map(|f| compositor.compose_frame(fps, FrameIndex(f)))
                        .collect()
                }),
                None => (chunk.start.0..chunk.end.0)
                    .map(|f| compositor.compose_frame(fps, FrameIndex(f)))
                    .collect(),
            };
            for (offset, frame) in frames.iter().enumerate() {
                sink.push_frame(FrameIndex(chunk.start.0 + offset as u64), frame)
                    .map_err(|e| e.at_stage(RenderStage::Encode))?;
            }
        }
        Ok(())
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(ReelError::validation(
            "render 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        ReelError::environment(
            RenderStage::FrameRender,
            format!("failed to build rayon thread pool: {e}"),
        )
    })
}

/// Background music stored next to the other inputs of a job, by naming convention.
pub fn find_background_music(dir: &Path) -> Option<PathBuf> {
    MUSIC_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
