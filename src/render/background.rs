use image::{ImageBuffer, Rgba, RgbaImage, imageops};

use crate::assets::media::StillImage;
use crate::foundation::color::Rgba8;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// A canvas-sized, premultiplied RGBA8 background shared by every frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Background {
    pub canvas: Canvas,
    pub rgba8_premul: Vec<u8>,
    /// Why the solid fallback was used in place of a supplied image, if it was.
    pub fallback_reason: Option<String>,
}

impl Background {
    pub fn solid(canvas: Canvas, color: Rgba8) -> Self {
        let px = color.to_premul();
        let mut rgba8_premul = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..(canvas.width as usize) * (canvas.height as usize) {
            rgba8_premul.extend_from_slice(&px);
        }
        Self {
            canvas,
            rgba8_premul,
            fallback_reason: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Fit `image` to the canvas, or fall back to `fallback` when absent or unusable.
pub fn fit_background(image: Option<&StillImage>, canvas: Canvas, fallback: Rgba8) -> Background {
    let Some(image) = image else {
        return Background::solid(canvas, fallback);
    };
    match fit_and_crop(image, canvas) {
        Ok(rgba8_premul) => Background {
            canvas,
            rgba8_premul,
            fallback_reason: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "background image could not be fitted; using solid color");
            let mut bg = Background::solid(canvas, fallback);
            bg.fallback_reason = Some(e.to_string());
            bg
        }
    }
}

/// Scale uniformly so the image covers the canvas, cropping the overflow around the center.
///
/// The crop happens in source pixels first, so only the visible region is ever resampled.
pub fn fit_and_crop(image: &StillImage, canvas: Canvas) -> ReelResult<Vec<u8>> {
    if image.width == 0 || image.height == 0 {
        return Err(ReelError::validation("background image has zero size"));
    }
    if canvas.width == 0 || canvas.height == 0 {
        return Err(ReelError::validation("canvas has zero size"));
    }
    let src = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        image.width,
        image.height,
        image.rgba8_premul.clone(),
    )
    .ok_or_else(|| ReelError::validation("background image buffer size mismatch"))?;

    let scale = f64::max(
        f64::from(canvas.width) / f64::from(image.width),
        f64::from(canvas.height) / f64::from(image.height),
    );
    let crop_w = source_extent(canvas.width, scale, image.width);
    let crop_h = source_extent(canvas.height, scale, image.height);
    let x = (image.width - crop_w) / 2;
    let y = (image.height - crop_h) / 2;
    let cropped: RgbaImage = imageops::crop_imm(&src, x, y, crop_w, crop_h).to_image();

    if (crop_w, crop_h) == (canvas.width, canvas.height) {
        return Ok(cropped.into_raw());
    }
    let fitted = imageops::resize(
        &cropped,
        canvas.width,
        canvas.height,
        imageops::FilterType::Triangle,
    );
    Ok(fitted.into_raw())
}

/// Source pixels covered by `canvas_extent` output pixels at `scale`, within `[1, image_extent]`.
fn source_extent(canvas_extent: u32, scale: f64, image_extent: u32) -> u32 {
    let extent = (f64::from(canvas_extent) / scale).round();
    (extent as u32).clamp(1, image_extent)
}

#[cfg(test)]
#[path = "../../tests/unit/render/background.rs"]
mod tests;
