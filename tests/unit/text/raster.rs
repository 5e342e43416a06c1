use super::*;

fn style() -> TextStyle {
    TextStyle {
        size_px: 16.0,
        fill: Rgba8::WHITE,
        stroke: Rgba8::BLACK,
        stroke_width_px: 2.0,
        max_width_px: 1000.0,
        padding_px: 4,
    }
}

#[test]
fn builtin_buffer_matches_layout_formula() {
    let mut r = TextRasterizer::builtin();
    let img = r.rasterize("Hello", &style());
    // scale 2: 5 chars -> (30 - 1) * 2 = 58 px wide.
    assert_eq!(img.width, 58 + 2 * (4 + 2));
    assert_eq!(img.height, 24 + 2 * 4);
    assert_eq!(img.rgba8_premul.len(), (img.width * img.height * 4) as usize);
    assert_eq!(img.lines, vec!["Hello"]);
}

#[test]
fn rasterizing_twice_is_pixel_identical() {
    let mut r = TextRasterizer::builtin();
    let a = r.rasterize("Same text", &style());
    let b = r.rasterize("Same text", &style());
    assert_eq!(a, b);
}

#[test]
fn recolored_copies_share_glyph_alpha() {
    let mut r = TextRasterizer::builtin();
    let cov = r.coverage("Karaoke", &style());
    let base = cov.colorize(Rgba8::WHITE, Rgba8::BLACK);
    let active = cov.colorize(Rgba8::YELLOW, Rgba8::BLACK);
    assert_eq!(base.glyph_alpha(), active.glyph_alpha());
    assert_ne!(base.rgba8_premul, active.rgba8_premul);
}

#[test]
fn background_stays_transparent() {
    let mut r = TextRasterizer::builtin();
    let img = r.rasterize("I", &style());
    // Top-left corner lies in the padding.
    assert_eq!(&img.rgba8_premul[0..4], &[0, 0, 0, 0]);
    assert!(img.glyph_alpha().iter().any(|&a| a == 255));
}

#[test]
fn stroke_is_drawn_under_fill() {
    let mut r = TextRasterizer::builtin();
    let cov = r.coverage("|", &style());
    let img = cov.colorize(Rgba8::WHITE, Rgba8::BLACK);
    let mut saw_fill = false;
    let mut saw_stroke = false;
    for (i, px) in img.rgba8_premul.chunks_exact(4).enumerate() {
        if cov.fill[i] == 255 {
            assert_eq!(px, &[255, 255, 255, 255]);
            saw_fill = true;
        } else if cov.stroke[i] == 255 {
            assert_eq!(px, &[0, 0, 0, 255]);
            saw_stroke = true;
        }
    }
    assert!(saw_fill && saw_stroke);
}

#[test]
fn zero_stroke_leaves_empty_stroke_plane() {
    let mut r = TextRasterizer::builtin();
    let mut s = style();
    s.stroke_width_px = 0.0;
    let cov = r.coverage("A", &s);
    assert!(cov.stroke.iter().all(|&v| v == 0));
    assert_eq!(cov.width, 10 + 2 * 4);
}

#[test]
fn long_text_wraps_to_multiple_lines() {
    let mut r = TextRasterizer::builtin();
    let mut s = style();
    s.max_width_px = 60.0;
    let img = r.rasterize("abcdefghij", &s);
    assert!(img.lines.len() > 1);
    let expected_h = (img.lines.len() as f32 * LINE_HEIGHT_FACTOR * 16.0).ceil() as u32 + 8;
    assert_eq!(img.height, expected_h);
}

#[test]
fn empty_text_yields_empty_image() {
    let mut r = TextRasterizer::builtin();
    let img = r.rasterize("", &style());
    assert!(img.is_empty());
    assert!(img.rgba8_premul.is_empty());
}

#[test]
fn unusable_outline_font_falls_back_to_builtin() {
    let face = FontFace {
        bytes: std::sync::Arc::new(b"not a font".to_vec()),
        index: 0,
        origin: crate::text::font::FontOrigin::Builtin,
    };
    let r = TextRasterizer::new(&ResolvedFont::Outline(face));
    assert!(r.is_builtin());
}

fn outline_rasterizer() -> Option<TextRasterizer> {
    let face = crate::text::font::lookup_system_font(None)?;
    let r = TextRasterizer::new(&ResolvedFont::Outline(face));
    assert!(!r.is_builtin(), "installed font failed to load");
    Some(r)
}

fn outline_coverage(r: &mut TextRasterizer, text: &str, s: &TextStyle) -> GlyphCoverage {
    let stroke = s.stroke_width_px.round() as u32;
    let max_width = s.max_width_px - 2.0 * stroke as f32;
    r.outline
        .as_mut()
        .unwrap()
        .coverage(text, s.size_px, stroke, max_width, s.padding_px)
        .unwrap()
}

#[test]
fn outline_font_renders_deterministic_coverage() {
    let Some(mut r) = outline_rasterizer() else {
        eprintln!("skipping: no installed outline font");
        return;
    };
    let s = style();
    let cov = outline_coverage(&mut r, "Hello", &s);
    assert_eq!(cov.lines, vec!["Hello"]);
    assert_eq!(cov.height, (LINE_HEIGHT_FACTOR * 16.0).ceil() as u32 + 2 * 4);
    assert!(cov.width > 2 * (4 + 2));
    assert_eq!(cov.fill.len(), (cov.width * cov.height) as usize);
    assert!(cov.fill.iter().any(|&a| a > 0));

    let again = outline_coverage(&mut r, "Hello", &s);
    assert_eq!(cov.fill, again.fill);
    assert_eq!(cov.stroke, again.stroke);
    assert_eq!(r.rasterize("Hello", &s), r.rasterize("Hello", &s));
}

#[test]
fn outline_copies_share_glyph_alpha_and_keep_background_clear() {
    let Some(mut r) = outline_rasterizer() else {
        eprintln!("skipping: no installed outline font");
        return;
    };
    let cov = outline_coverage(&mut r, "Karaoke", &style());
    let base = cov.colorize(Rgba8::WHITE, Rgba8::BLACK);
    let active = cov.colorize(Rgba8::YELLOW, Rgba8::BLACK);
    assert_eq!(base.glyph_alpha(), active.glyph_alpha());
    assert_ne!(base.rgba8_premul, active.rgba8_premul);

    assert_eq!(&base.rgba8_premul[0..4], &[0, 0, 0, 0]);
    for (i, px) in base.rgba8_premul.chunks_exact(4).enumerate() {
        if cov.fill[i] == 0 && cov.stroke[i] == 0 {
            assert_eq!(px, &[0, 0, 0, 0], "pixel {i}");
        }
    }
}

#[test]
fn outline_stroke_reaches_past_the_fill() {
    let Some(mut r) = outline_rasterizer() else {
        eprintln!("skipping: no installed outline font");
        return;
    };
    let cov = outline_coverage(&mut r, "O", &style());
    let rim = cov
        .fill
        .iter()
        .zip(&cov.stroke)
        .filter(|&(&f, &s)| f == 0 && s > 0)
        .count();
    assert!(rim > 0);

    let mut s = style();
    s.stroke_width_px = 0.0;
    let bare = outline_coverage(&mut r, "O", &s);
    assert!(bare.stroke.iter().all(|&v| v == 0));
}

#[test]
fn outline_long_text_wraps() {
    let Some(mut r) = outline_rasterizer() else {
        eprintln!("skipping: no installed outline font");
        return;
    };
    let mut s = style();
    s.max_width_px = 80.0;
    let cov = outline_coverage(&mut r, "one two three four five six", &s);
    assert!(cov.lines.len() > 1, "{:?}", cov.lines);
    let expected_h = (cov.lines.len() as f32 * LINE_HEIGHT_FACTOR * 16.0).ceil() as u32 + 8;
    assert_eq!(cov.height, expected_h);
}
