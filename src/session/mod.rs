//! Render orchestration: resource handling, cancellation and the end-to-end render call.

pub mod render_session;
pub mod resources;

pub use render_session::{
    CancelToken, Degradation, RenderJob, RenderReport, RenderSession, find_background_music,
};
pub use resources::{
    AudioInput, EncoderHandle, FfmpegMediaProvider, ImageInput, MediaHandle, MediaProvider, Scoped,
    TempFileGuard,
};
