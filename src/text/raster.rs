use kurbo::Affine;

use crate::foundation::color::Rgba8;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u8;
use crate::text::builtin;
use crate::text::font::{FontFace, ResolvedFont};
use crate::text::layout::wrap_greedy;

/// Height of one wrapped line relative to the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.5;

/// Styling inputs for one caption rasterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size_px: f32,
    pub fill: Rgba8,
    pub stroke: Rgba8,
    pub stroke_width_px: f32,
    pub max_width_px: f32,
    pub padding_px: u32,
}

/// Shape of a wrapped caption: separate fill and stroke coverage planes, one byte per pixel.
///
/// Colorizing the same coverage twice yields two images whose alpha channels are identical,
/// which is what lets the active-color copy line up with the base copy under a wipe mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphCoverage {
    pub width: u32,
    pub height: u32,
    pub fill: Vec<u8>,
    pub stroke: Vec<u8>,
    pub lines: Vec<String>,
}

impl GlyphCoverage {
    fn empty(lines: Vec<String>) -> Self {
        Self {
            width: 0,
            height: 0,
            fill: Vec::new(),
            stroke: Vec::new(),
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Paint fill over stroke in the given colors (premultiplied output).
    pub fn colorize(&self, fill: Rgba8, stroke: Rgba8) -> TextImage {
        let fill_p = fill.to_premul();
        let stroke_p = stroke.to_premul();
        let mut out = vec![0u8; self.fill.len() * 4];
        for (i, px) in out.chunks_exact_mut(4).enumerate() {
            let f = u16::from(self.fill[i]);
            let s = u16::from(self.stroke[i]);
            if f == 0 && s == 0 {
                continue;
            }
            let top: [u8; 4] = std::array::from_fn(|c| mul_div255_u8(u16::from(fill_p[c]), f));
            let under: [u8; 4] =
                std::array::from_fn(|c| mul_div255_u8(u16::from(stroke_p[c]), s));
            let inv = 255 - u16::from(top[3]);
            for c in 0..4 {
                px[c] = top[c].saturating_add(mul_div255_u8(u16::from(under[c]), inv));
            }
        }
        TextImage {
            width: self.width,
            height: self.height,
            rgba8_premul: out,
            lines: self.lines.clone(),
        }
    }
}

/// Rasterized caption, premultiplied RGBA8 on a transparent background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
    pub lines: Vec<String>,
}

impl TextImage {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Alpha channel, row-major.
    pub fn glyph_alpha(&self) -> Vec<u8> {
        self.rgba8_premul.chunks_exact(4).map(|px| px[3]).collect()
    }
}

/// Renders wrapped, stroked caption text.
///
/// Uses the resolved outline font when one is available and the embedded bitmap font otherwise.
pub struct TextRasterizer {
    outline: Option<OutlineEngine>,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer")
            .field("builtin", &self.is_builtin())
            .finish()
    }
}

impl TextRasterizer {
    pub fn new(font: &ResolvedFont) -> Self {
        match font {
            ResolvedFont::Outline(face) => match OutlineEngine::new(face) {
                Ok(engine) => Self {
                    outline: Some(engine),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "outline font unusable; using built-in font");
                    Self::builtin()
                }
            },
            ResolvedFont::Builtin => Self::builtin(),
        }
    }

    pub fn builtin() -> Self {
        Self { outline: None }
    }

    pub fn is_builtin(&self) -> bool {
        self.outline.is_none()
    }

    /// Wrap `text` and produce its fill/stroke coverage.
    pub fn coverage(&mut self, text: &str, style: &TextStyle) -> GlyphCoverage {
        let size = if style.size_px.is_finite() && style.size_px > 0.0 {
            style.size_px
        } else {
            1.0
        };
        let stroke = style.stroke_width_px.max(0.0).round() as u32;
        let max_width = (style.max_width_px - 2.0 * stroke as f32).max(1.0);

        if let Some(engine) = self.outline.as_mut() {
            match engine.coverage(text, size, stroke, max_width, style.padding_px) {
                Ok(cov) => return cov,
                Err(e) => {
                    tracing::warn!(error = %e, "outline text rendering failed; using built-in font")
                }
            }
        }
        builtin_coverage(text, size, stroke, max_width, style.padding_px)
    }

    /// Rasterize `text` in the style's fill and stroke colors.
    pub fn rasterize(&mut self, text: &str, style: &TextStyle) -> TextImage {
        self.coverage(text, style).colorize(style.fill, style.stroke)
    }
}

fn buffer_size(widest: u32, lines: usize, size: f32, stroke: u32, padding: u32) -> (u32, u32) {
    let width = widest + 2 * (padding + stroke);
    let height = (lines as f32 * LINE_HEIGHT_FACTOR * size).ceil() as u32 + 2 * padding;
    (
        width.min(u32::from(u16::MAX)),
        height.min(u32::from(u16::MAX)),
    )
}

fn builtin_coverage(text: &str, size: f32, stroke: u32, max_width: f32, padding: u32) -> GlyphCoverage {
    let scale = builtin::scale_for_size(size);
    let lines = wrap_greedy(text, max_width, &mut |line: &str| {
        builtin::measure(line, scale) as f32
    });
    if lines.is_empty() {
        return GlyphCoverage::empty(lines);
    }

    let widest = lines
        .iter()
        .map(|l| builtin::measure(l, scale))
        .max()
        .unwrap_or(0);
    let (width, height) = buffer_size(widest, lines.len(), size, stroke, padding);
    let line_h = LINE_HEIGHT_FACTOR * size;
    let glyph_h = (builtin::GLYPH_H * scale) as f32;

    let mut fill = vec![0u8; (width as usize) * (height as usize)];
    for (i, line) in lines.iter().enumerate() {
        let x = i64::from(padding + stroke);
        let y = (padding as f32 + i as f32 * line_h + (line_h - glyph_h) / 2.0).round() as i64;
        builtin::draw_line(&mut fill, width, height, line, scale, x, y);
    }
    let stroke_plane = if stroke > 0 {
        builtin::dilate(&fill, width, height, stroke)
    } else {
        vec![0u8; fill.len()]
    };

    GlyphCoverage {
        width,
        height,
        fill,
        stroke: stroke_plane,
        lines,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct GlyphBrush;

struct OutlineEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl OutlineEngine {
    fn new(face: &FontFace) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(face.bytes.to_vec()), None);
        let family_id = families
            .iter()
            .find(|(_, fonts)| fonts.iter().any(|f| f.index() == face.index))
            .or_else(|| families.first())
            .map(|(id, _)| *id)
            .ok_or_else(|| ReelError::validation("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes.to_vec()),
            face.index,
        );
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
        })
    }

    fn layout_line(&mut self, text: &str, size_px: f32) -> parley::Layout<GlyphBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    fn coverage(
        &mut self,
        text: &str,
        size: f32,
        stroke: u32,
        max_width: f32,
        padding: u32,
    ) -> ReelResult<GlyphCoverage> {
        let lines = wrap_greedy(text, max_width, &mut |line: &str| {
            self.layout_line(line, size).width()
        });
        if lines.is_empty() {
            return Ok(GlyphCoverage::empty(lines));
        }

        let layouts: Vec<_> = lines.iter().map(|l| self.layout_line(l, size)).collect();
        let widest = layouts
            .iter()
            .map(|l| l.width().ceil() as u32)
            .max()
            .unwrap_or(0);
        let (width, height) = buffer_size(widest, lines.len(), size, stroke, padding);
        let line_h = LINE_HEIGHT_FACTOR * size;
        let origins: Vec<Affine> = layouts
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let y = padding as f32 + i as f32 * line_h + (line_h - l.height()) / 2.0;
                Affine::translate((f64::from(padding + stroke), f64::from(y.round())))
            })
            .collect();

        let fill = self.draw(&layouts, &origins, width, height, None)?;
        let stroke_plane = if stroke > 0 {
            self.draw(&layouts, &origins, width, height, Some(stroke))?
        } else {
            vec![0u8; fill.len()]
        };

        Ok(GlyphCoverage {
            width,
            height,
            fill,
            stroke: stroke_plane,
            lines,
        })
    }

    /// Render every glyph in white and return the alpha plane.
    fn draw(
        &self,
        layouts: &[parley::Layout<GlyphBrush>],
        origins: &[Affine],
        width: u32,
        height: u32,
        stroke: Option<u32>,
    ) -> ReelResult<Vec<u8>> {
        let w = u16::try_from(width).map_err(|_| ReelError::validation("text image too wide"))?;
        let h = u16::try_from(height).map_err(|_| ReelError::validation("text image too tall"))?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        if let Some(sw) = stroke {
            // Strokes straddle the outline; double the width so the visible outside is `sw`.
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(2 * sw)));
        }
        for (layout, origin) in layouts.iter().zip(origins) {
            ctx.set_transform(affine_to_cpu(*origin));
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    let builder = ctx.glyph_run(&self.font).font_size(run.run().font_size());
                    if stroke.is_some() {
                        builder.stroke_glyphs(glyphs);
                    } else {
                        builder.fill_glyphs(glyphs);
                    }
                }
            }
        }
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        Ok(pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .map(|px| px[3])
            .collect())
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/text/raster.rs"]
mod tests;
