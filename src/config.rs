use std::io::Read;
use std::path::Path;

use crate::audio::mix::DEFAULT_MUSIC_GAIN;
use crate::foundation::color::Rgba8;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::compositor::CaptionStyle;
use crate::text::font::FontSpec;

/// Caption font preferences and size.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub path: Option<std::path::PathBuf>,
    pub family: Option<String>,
    pub size_px: f32,
    /// Skip outline fonts entirely and draw with the built-in bitmap font.
    pub builtin: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            family: None,
            size_px: 60.0,
            builtin: false,
        }
    }
}

impl FontConfig {
    pub fn spec(&self) -> FontSpec {
        FontSpec {
            path: self.path.clone(),
            family: self.family.clone(),
        }
    }
}

/// Frame-generation threading.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Render frame batches on a rayon pool.
    pub parallel: bool,
    /// Worker count; `None` uses the rayon default.
    pub threads: Option<usize>,
    /// Frames rendered per batch. Cancellation is checked between batches.
    pub chunk_size: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            chunk_size: 48,
        }
    }
}

/// Caller-facing configuration of a render.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub font: FontConfig,
    pub base_color: Rgba8,
    pub active_color: Rgba8,
    pub stroke_color: Rgba8,
    pub stroke_width_px: f32,
    /// Top of the caption as a fraction of canvas height.
    pub caption_anchor_y: f32,
    pub caption_margin_px: u32,
    /// Translucent box drawn behind each caption.
    pub caption_backdrop: Option<Rgba8>,
    pub text_padding_px: u32,
    pub music_gain: f32,
    pub background_color: Rgba8,
    pub render: ThreadingConfig,
    pub overwrite: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            font: FontConfig::default(),
            base_color: Rgba8::WHITE,
            active_color: Rgba8::YELLOW,
            stroke_color: Rgba8::BLACK,
            stroke_width_px: 2.0,
            caption_anchor_y: 0.8,
            caption_margin_px: 40,
            caption_backdrop: None,
            text_padding_px: 20,
            music_gain: DEFAULT_MUSIC_GAIN,
            background_color: Rgba8::BLACK,
            render: ThreadingConfig::default(),
            overwrite: true,
        }
    }
}

impl RenderConfig {
    /// Load a JSON config file.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let f = std::fs::File::open(path).map_err(|e| {
            ReelError::validation(format!("failed to open config '{}': {e}", path.display()))
        })?;
        Self::from_reader(std::io::BufReader::new(f))
    }

    pub fn from_reader(reader: impl Read) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_reader(reader)
            .map_err(|e| ReelError::serde(format!("config json parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
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
            return Err(ReelError::validation("fps must be > 0"));
        }
        if !self.font.size_px.is_finite() || self.font.size_px <= 0.0 {
            return Err(ReelError::validation("font.size_px must be finite and > 0"));
        }
        if !self.stroke_width_px.is_finite() || self.stroke_width_px < 0.0 {
            return Err(ReelError::validation(
                "stroke_width_px must be finite and >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.caption_anchor_y) {
            return Err(ReelError::validation("caption_anchor_y must be in [0, 1]"));
        }
        if self.caption_margin_px.saturating_mul(2) >= self.canvas.width {
            return Err(ReelError::validation(
                "caption_margin_px leaves no room for text",
            ));
        }
        if !self.music_gain.is_finite() || self.music_gain < 0.0 {
            return Err(ReelError::validation("music_gain must be finite and >= 0"));
        }
        if self.render.threads == Some(0) {
            return Err(ReelError::validation("render.threads must be >= 1 when set"));
        }
        Ok(())
    }

    pub fn caption_style(&self) -> CaptionStyle {
        CaptionStyle {
            size_px: self.font.size_px,
            base_color: self.base_color,
            active_color: self.active_color,
            stroke_color: self.stroke_color,
            stroke_width_px: self.stroke_width_px,
            anchor_y: self.caption_anchor_y,
            margin_px: self.caption_margin_px,
            padding_px: self.text_padding_px,
            backdrop: self.caption_backdrop,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
