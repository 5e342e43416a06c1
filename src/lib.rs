//! Storyreel turns a narration track, a background image and a list of timed captions into a
//! short captioned video.
//!
//! The public API is session-oriented:
//!
//! - Load a [`RenderConfig`] and parse cues with [`parse_cue_file`]
//! - Describe the inputs with a [`RenderJob`]
//! - Create a [`RenderSession`] and call [`RenderSession::render`] for the MP4, or
//!   [`RenderSession::render_preview_frame`] for a single still
#![forbid(unsafe_code)]

pub mod assets;
pub mod audio;
pub mod captions;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod render;
pub mod session;
pub mod text;

pub use crate::foundation::color::Rgba8;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
pub use crate::foundation::error::{ReelError, ReelResult, RenderStage};

pub use crate::captions::cue::{CaptionCue, ParsedCues, parse_cue_file, parse_cues};
pub use crate::config::RenderConfig;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::FrameRGBA;
pub use crate::session::render_session::{
    CancelToken, Degradation, RenderJob, RenderReport, RenderSession, find_background_music,
};
