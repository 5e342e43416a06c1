use super::*;

fn still(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> StillImage {
    let mut rgba8_premul = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            rgba8_premul.extend_from_slice(&f(x, y));
        }
    }
    StillImage {
        width,
        height,
        rgba8_premul,
    }
}

fn near(px: &[u8], expected: [u8; 4]) -> bool {
    px.iter().zip(expected).all(|(&a, b)| a.abs_diff(b) <= 1)
}

#[test]
fn output_matches_canvas_for_any_aspect() {
    let canvas = Canvas {
        width: 54,
        height: 96,
    };
    for (w, h) in [(1920, 1080), (100, 100), (10, 400), (53, 97), (1, 1)] {
        let img = still(w, h, |_, _| [10, 20, 30, 255]);
        let bg = fit_background(Some(&img), canvas, Rgba8::BLACK);
        assert!(!bg.is_fallback(), "{w}x{h}");
        assert_eq!(bg.rgba8_premul.len(), canvas.rgba_len(), "{w}x{h}");
    }
}

#[test]
fn crop_is_centered() {
    // Wide image: left third red, middle third green, right third blue.
    let img = still(30, 10, |x, _| match x / 10 {
        0 => [255, 0, 0, 255],
        1 => [0, 255, 0, 255],
        _ => [0, 0, 255, 255],
    });
    let canvas = Canvas {
        width: 10,
        height: 10,
    };
    let out = fit_and_crop(&img, canvas).unwrap();
    // Same height, so no scaling: the crop is exactly the green middle.
    assert!(out.chunks_exact(4).all(|px| px == [0, 255, 0, 255]));
}

#[test]
fn extreme_aspect_crops_before_scaling() {
    // 2x4000 strip, red except two green rows at the exact center.
    let img = still(2, 4000, |_, y| {
        if (1999..2001).contains(&y) {
            [0, 255, 0, 255]
        } else {
            [255, 0, 0, 255]
        }
    });
    let canvas = Canvas {
        width: 4,
        height: 4,
    };
    // Cover scale is 2, so only the 2x2 center block of the source is visible.
    let out = fit_and_crop(&img, canvas).unwrap();
    assert_eq!(out.len(), canvas.rgba_len());
    assert!(out.chunks_exact(4).all(|px| near(px, [0, 255, 0, 255])));

    let thin = still(1, 2000, |_, _| [40, 50, 60, 255]);
    let canvas = Canvas {
        width: 54,
        height: 96,
    };
    let out = fit_and_crop(&thin, canvas).unwrap();
    assert_eq!(out.len(), canvas.rgba_len());
    assert!(out.chunks_exact(4).all(|px| near(px, [40, 50, 60, 255])));
}

#[test]
fn no_image_is_uniform_fallback_color() {
    let canvas = Canvas {
        width: 4,
        height: 6,
    };
    let color = Rgba8::opaque(12, 34, 56);
    let bg = fit_background(None, canvas, color);
    assert_eq!(bg.rgba8_premul.len(), canvas.rgba_len());
    assert!(bg.rgba8_premul.chunks_exact(4).all(|px| px == [12, 34, 56, 255]));
    assert!(!bg.is_fallback());
}

#[test]
fn broken_image_degrades_to_solid() {
    let canvas = Canvas {
        width: 4,
        height: 4,
    };
    let broken = StillImage {
        width: 10,
        height: 10,
        rgba8_premul: vec![0; 3],
    };
    let bg = fit_background(Some(&broken), canvas, Rgba8::BLACK);
    assert!(bg.is_fallback());
    assert!(bg.rgba8_premul.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));

    let empty = StillImage {
        width: 0,
        height: 5,
        rgba8_premul: Vec::new(),
    };
    assert!(fit_background(Some(&empty), canvas, Rgba8::BLACK).is_fallback());
}
