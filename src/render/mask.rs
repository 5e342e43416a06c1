use std::time::Duration;

/// Per-pixel coverage for one instant, same shape as the glyph image. `255` means fully covered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CoverageMask {
    /// Coverage at `(x, y)` in `[0, 1]`.
    pub fn value(&self, x: u32, y: u32) -> f32 {
        f32::from(self.data[(y * self.width + x) as usize]) / 255.0
    }
}

/// Left-to-right linear wipe over a caption's glyph alpha.
///
/// `coverage(t)` reveals every column left of `floor(width * clamp(t / duration, 0, 1))` and
/// multiplies by the glyph alpha, so pixels without ink are never covered.
#[derive(Clone, Debug)]
pub struct WipeMask {
    glyph_alpha: Vec<u8>,
    width: u32,
    height: u32,
    duration: Duration,
}

impl WipeMask {
    pub fn new(glyph_alpha: Vec<u8>, width: u32, height: u32, duration: Duration) -> Self {
        debug_assert_eq!(glyph_alpha.len(), (width as usize) * (height as usize));
        Self {
            glyph_alpha,
            width,
            height,
            duration,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Wipe progress in `[0, 1]`. A non-positive duration counts as fully revealed.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Number of columns revealed after `elapsed`.
    pub fn revealed_columns(&self, elapsed: Duration) -> u32 {
        let cols = (f64::from(self.width) * self.progress(elapsed)).floor() as u32;
        cols.min(self.width)
    }

    pub fn coverage(&self, elapsed: Duration) -> CoverageMask {
        let revealed = self.revealed_columns(elapsed) as usize;
        let w = self.width as usize;
        let mut data = vec![0u8; self.glyph_alpha.len()];
        if revealed > 0 {
            for (dst, src) in data
                .chunks_exact_mut(w)
                .zip(self.glyph_alpha.chunks_exact(w))
            {
                dst[..revealed].copy_from_slice(&src[..revealed]);
            }
        }
        CoverageMask {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mask.rs"]
mod tests;
