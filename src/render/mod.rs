//! Per-frame image generation: background fitting, wipe masks and layer compositing.

pub mod background;
pub mod blend;
pub mod compositor;
pub mod mask;

pub use background::{Background, fit_background};
pub use compositor::{CaptionStyle, FrameCompositor, PreparedCaption, prepare_captions};
pub use mask::{CoverageMask, WipeMask};

/// One composited frame, row-major RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}
