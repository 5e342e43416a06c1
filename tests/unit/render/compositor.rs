use super::*;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];

fn canvas() -> Canvas {
    Canvas {
        width: 200,
        height: 100,
    }
}

fn style() -> CaptionStyle {
    CaptionStyle {
        size_px: 16.0,
        base_color: Rgba8::WHITE,
        active_color: Rgba8::YELLOW,
        stroke_color: Rgba8::BLACK,
        stroke_width_px: 0.0,
        anchor_y: 0.5,
        margin_px: 10,
        padding_px: 2,
        backdrop: None,
    }
}

fn compositor(cues: &[CaptionCue], style: &CaptionStyle) -> FrameCompositor {
    let mut r = TextRasterizer::builtin();
    let captions = prepare_captions(cues, &mut r, canvas(), style);
    FrameCompositor::new(Background::solid(canvas(), Rgba8::BLACK), captions)
}

fn count(frame: &FrameRGBA, px: [u8; 4]) -> usize {
    frame.data.chunks_exact(4).filter(|p| *p == px).count()
}

fn secs(v: f64) -> Duration {
    Duration::from_secs_f64(v)
}

#[test]
fn caption_is_centered_at_anchor() {
    let c = compositor(&[CaptionCue::from_secs(0.0, 3.0, "Hi")], &style());
    let cap = &c.captions()[0];
    assert_eq!(cap.base.width, 26);
    assert_eq!(cap.x, 87);
    assert_eq!(cap.y, 50);
}

#[test]
fn no_active_cue_yields_plain_background() {
    let c = compositor(&[CaptionCue::from_secs(1.0, 2.0, "Hi")], &style());
    let frame = c.compose(secs(0.5));
    assert!(frame.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
    let after = c.compose(secs(2.0));
    assert!(after.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[test]
fn wipe_progresses_left_to_right() {
    let c = compositor(&[CaptionCue::from_secs(0.0, 3.0, "Hi")], &style());

    let start = c.compose(secs(0.0));
    assert!(count(&start, WHITE) > 0);
    assert_eq!(count(&start, YELLOW), 0);

    let mid = c.compose(secs(1.5));
    assert!(count(&mid, WHITE) > 0);
    assert!(count(&mid, YELLOW) > 0);
    // Yellow only in the left half of the caption box.
    let cap = &c.captions()[0];
    let split = (cap.x + i64::from(cap.base.width) / 2) as usize;
    for (i, px) in mid.data.chunks_exact(4).enumerate() {
        if px == YELLOW {
            assert!(i % 200 < split);
        }
    }

    let end = c.compose(secs(2.999));
    assert_eq!(count(&end, WHITE), 0);
    assert_eq!(count(&end, YELLOW), count(&start, WHITE));
}

#[test]
fn non_glyph_pixels_keep_the_background() {
    let c = compositor(&[CaptionCue::from_secs(0.0, 1.0, "Hi")], &style());
    let cap = &c.captions()[0];
    let alpha = cap.active.glyph_alpha();
    let frame = c.compose(secs(0.999));
    for row in 0..cap.base.height {
        for col in 0..cap.base.width {
            if alpha[(row * cap.base.width + col) as usize] != 0 {
                continue;
            }
            let x = (cap.x + i64::from(col)) as usize;
            let y = (cap.y + i64::from(row)) as usize;
            let i = (y * 200 + x) * 4;
            assert_eq!(&frame.data[i..i + 4], &[0, 0, 0, 255]);
        }
    }
}

#[test]
fn later_cue_draws_on_top() {
    let cues = [
        CaptionCue::from_secs(0.0, 2.0, "Hi"),
        CaptionCue::from_secs(1.0, 3.0, "Hi"),
    ];
    let c = compositor(&cues, &style());
    // First cue is half revealed, second just started and covers it in the base color.
    let frame = c.compose(secs(1.0));
    assert_eq!(count(&frame, YELLOW), 0);
    assert!(count(&frame, WHITE) > 0);
}

#[test]
fn backdrop_is_not_tinted_by_the_wipe() {
    let mut s = style();
    s.backdrop = Some(Rgba8::opaque(0, 0, 255));
    let c = compositor(&[CaptionCue::from_secs(0.0, 1.0, "Hi")], &s);
    let cap = &c.captions()[0];
    let frame = c.compose(secs(0.999));
    let blue = count(&frame, [0, 0, 255, 255]);
    let ink = cap.active.glyph_alpha().iter().filter(|&&a| a != 0).count();
    assert_eq!(blue + ink, (cap.base.width * cap.base.height) as usize);
}

#[test]
fn off_canvas_caption_is_clipped() {
    let mut s = style();
    s.anchor_y = 0.99;
    let c = compositor(&[CaptionCue::from_secs(0.0, 1.0, "Hi")], &s);
    let frame = c.compose(secs(0.5));
    assert_eq!(frame.data.len(), canvas().rgba_len());
}

#[test]
fn compose_frame_uses_frame_timestamp() {
    let c = compositor(&[CaptionCue::from_secs(1.0, 2.0, "Hi")], &style());
    let fps = Fps::new(10, 1).unwrap();
    assert_eq!(count(&c.compose_frame(fps, FrameIndex(9)), WHITE), 0);
    assert!(count(&c.compose_frame(fps, FrameIndex(10)), WHITE) > 0);
}
