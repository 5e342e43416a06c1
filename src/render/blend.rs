use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Scale a premultiplied pixel so that its alpha becomes `coverage`.
///
/// `coverage` is expected to be at most the pixel's own alpha; it is clamped otherwise so the
/// result never gains opacity the glyph did not have.
pub fn with_coverage(src: PremulRgba8, coverage: u8) -> PremulRgba8 {
    let a = src[3];
    if coverage == 0 || a == 0 {
        return [0; 4];
    }
    if coverage >= a {
        return src;
    }
    let scale = |c: u8| -> u8 {
        ((u32::from(c) * u32::from(coverage) + u32::from(a) / 2) / u32::from(a)) as u8
    };
    [scale(src[0]), scale(src[1]), scale(src[2]), coverage]
}

/// Placement of a `src_w x src_h` layer on a `dst_w x dst_h` canvas, clipped to the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// `None` when the layer lies entirely outside the canvas.
    pub fn clip(dst_w: u32, dst_h: u32, src_w: u32, src_h: u32, x: i64, y: i64) -> Option<Self> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src_w)).min(i64::from(dst_w));
        let y1 = (y + i64::from(src_h)).min(i64::from(dst_h));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            src_x: (x0 - x) as u32,
            src_y: (y0 - y) as u32,
            dst_x: x0 as u32,
            dst_y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Composite `src` over `dst` at `p`, optionally replacing each source pixel's alpha with the
/// matching `coverage` byte (same shape as `src`).
pub fn over_layer(
    dst: &mut [u8],
    dst_w: u32,
    src: &[u8],
    src_w: u32,
    coverage: Option<&[u8]>,
    p: Placement,
) {
    for row in 0..p.height {
        let sy = (p.src_y + row) as usize;
        let dy = (p.dst_y + row) as usize;
        for col in 0..p.width {
            let sx = (p.src_x + col) as usize;
            let dx = (p.dst_x + col) as usize;
            let si = sy * src_w as usize + sx;
            let di = (dy * dst_w as usize + dx) * 4;
            let mut s = [src[si * 4], src[si * 4 + 1], src[si * 4 + 2], src[si * 4 + 3]];
            if let Some(cov) = coverage {
                s = with_coverage(s, cov[si]);
            }
            if s[3] == 0 {
                continue;
            }
            let d = [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]];
            dst[di..di + 4].copy_from_slice(&over(d, s));
        }
    }
}

/// Fill the placement rectangle with a premultiplied color using source-over.
pub fn fill_rect_over(dst: &mut [u8], dst_w: u32, color: PremulRgba8, p: Placement) {
    if color[3] == 0 {
        return;
    }
    for row in 0..p.height {
        let dy = (p.dst_y + row) as usize;
        for col in 0..p.width {
            let di = (dy * dst_w as usize + (p.dst_x + col) as usize) * 4;
            let d = [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]];
            dst[di..di + 4].copy_from_slice(&over(d, color));
        }
    }
}

/// Flatten premultiplied pixels over an opaque background color.
pub fn flatten_over_opaque(rgba_premul: &mut [u8], bg: [u8; 3]) {
    for px in rgba_premul.chunks_exact_mut(4) {
        let inv = 255u16 - u16::from(px[3]);
        for i in 0..3 {
            px[i] = px[i].saturating_add(mul_div255_u8(u16::from(bg[i]), inv));
        }
        px[3] = 255;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
