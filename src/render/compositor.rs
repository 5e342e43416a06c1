use std::sync::Arc;
use std::time::Duration;

use crate::captions::cue::CaptionCue;
use crate::foundation::color::Rgba8;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::render::FrameRGBA;
use crate::render::background::Background;
use crate::render::blend::{self, Placement};
use crate::render::mask::WipeMask;
use crate::text::raster::{TextImage, TextRasterizer, TextStyle};

/// How captions are styled and placed on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptionStyle {
    pub size_px: f32,
    pub base_color: Rgba8,
    pub active_color: Rgba8,
    pub stroke_color: Rgba8,
    pub stroke_width_px: f32,
    /// Top edge of the caption as a fraction of canvas height.
    pub anchor_y: f32,
    /// Horizontal margin per side; the wrap width is `canvas.width - 2 * margin`.
    pub margin_px: u32,
    pub padding_px: u32,
    pub backdrop: Option<Rgba8>,
}

impl CaptionStyle {
    fn text_style(&self, canvas: Canvas) -> TextStyle {
        TextStyle {
            size_px: self.size_px,
            fill: self.base_color,
            stroke: self.stroke_color,
            stroke_width_px: self.stroke_width_px,
            max_width_px: canvas.width.saturating_sub(2 * self.margin_px).max(1) as f32,
            padding_px: self.padding_px,
        }
    }
}

/// One cue rasterized once in both colors, plus its wipe mask and placement.
#[derive(Clone, Debug)]
pub struct PreparedCaption {
    pub cue: CaptionCue,
    pub base: TextImage,
    pub active: TextImage,
    pub mask: WipeMask,
    pub x: i64,
    pub y: i64,
    pub backdrop: Option<Rgba8>,
}

impl PreparedCaption {
    pub fn prepare(
        cue: &CaptionCue,
        rasterizer: &mut TextRasterizer,
        canvas: Canvas,
        style: &CaptionStyle,
    ) -> Option<Self> {
        let coverage = rasterizer.coverage(&cue.text, &style.text_style(canvas));
        if coverage.is_empty() {
            tracing::debug!(text = %cue.text, "cue has no drawable text");
            return None;
        }
        let base = coverage.colorize(style.base_color, style.stroke_color);
        let active = coverage.colorize(style.active_color, style.stroke_color);
        let mask = WipeMask::new(active.glyph_alpha(), active.width, active.height, cue.duration());

        let x = (i64::from(canvas.width) - i64::from(base.width)) / 2;
        let y = (f64::from(canvas.height) * f64::from(style.anchor_y)).round() as i64;
        Some(Self {
            cue: cue.clone(),
            base,
            active,
            mask,
            x,
            y,
            backdrop: style.backdrop,
        })
    }

    fn placement(&self, canvas: Canvas) -> Option<Placement> {
        Placement::clip(
            canvas.width,
            canvas.height,
            self.base.width,
            self.base.height,
            self.x,
            self.y,
        )
    }

    /// Draw the base copy, then the active copy under the wipe for `t`.
    pub fn draw(&self, frame: &mut [u8], canvas: Canvas, t: Duration) {
        let Some(p) = self.placement(canvas) else {
            return;
        };
        if let Some(color) = self.backdrop {
            blend::fill_rect_over(frame, canvas.width, color.to_premul(), p);
        }
        blend::over_layer(frame, canvas.width, &self.base.rgba8_premul, self.base.width, None, p);

        let elapsed = t.saturating_sub(self.cue.start);
        if self.mask.revealed_columns(elapsed) == 0 {
            return;
        }
        let coverage = self.mask.coverage(elapsed);
        blend::over_layer(
            frame,
            canvas.width,
            &self.active.rgba8_premul,
            self.active.width,
            Some(&coverage.data),
            p,
        );
    }
}

/// Rasterize every cue once, in order. Cues without drawable text are skipped.
pub fn prepare_captions(
    cues: &[CaptionCue],
    rasterizer: &mut TextRasterizer,
    canvas: Canvas,
    style: &CaptionStyle,
) -> Vec<PreparedCaption> {
    cues.iter()
        .filter_map(|cue| PreparedCaption::prepare(cue, rasterizer, canvas, style))
        .collect()
}

/// Pure per-frame compositor: background, then every active caption in cue order.
#[derive(Clone, Debug)]
pub struct FrameCompositor {
    canvas: Canvas,
    background: Arc<Background>,
    captions: Arc<Vec<PreparedCaption>>,
}

impl FrameCompositor {
    pub fn new(background: Background, captions: Vec<PreparedCaption>) -> Self {
        Self {
            canvas: background.canvas,
            background: Arc::new(background),
            captions: Arc::new(captions),
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn captions(&self) -> &[PreparedCaption] {
        &self.captions
    }

    /// Captions whose `[start, end)` contains `t`, in draw order.
    pub fn active_at(&self, t: Duration) -> impl Iterator<Item = &PreparedCaption> {
        self.captions.iter().filter(move |c| c.cue.is_active_at(t))
    }

    pub fn compose(&self, t: Duration) -> FrameRGBA {
        let mut data = self.background.rgba8_premul.clone();
        for caption in self.active_at(t) {
            caption.draw(&mut data, self.canvas, t);
        }
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
            premultiplied: true,
        }
    }

    pub fn compose_frame(&self, fps: Fps, frame: FrameIndex) -> FrameRGBA {
        self.compose(fps.frame_time(frame))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
