use super::*;
use crate::captions::cue::parse_cues;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("storyreel_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!token.is_cancelled());
    clone.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(
        token.check(RenderStage::Encode),
        Err(ReelError::Cancelled(RenderStage::Encode))
    ));
}

#[test]
fn job_takes_canvas_and_fps_from_config() {
    let mut cfg = RenderConfig::default();
    cfg.canvas = Canvas {
        width: 720,
        height: 1280,
    };
    let job = RenderJob::new("a.wav", "out.mp4", &cfg)
        .with_background_image("bg.png")
        .with_background_music("bgm.mp3");
    assert_eq!(job.canvas, cfg.canvas);
    assert_eq!(job.fps, cfg.fps);
    assert_eq!(job.background_image.as_deref(), Some(Path::new("bg.png")));
    assert_eq!(job.background_music.as_deref(), Some(Path::new("bgm.mp3")));
    assert!(job.validate().is_ok());
}

#[test]
fn job_rejects_bad_canvas_and_empty_output() {
    let cfg = RenderConfig::default();
    let mut job = RenderJob::new("a.wav", "out.mp4", &cfg);
    job.canvas.height = 0;
    assert!(job.validate().is_err());

    let mut job = RenderJob::new("a.wav", "out.mp4", &cfg);
    job.canvas.width = 1081;
    assert!(job.validate().unwrap_err().is_input());

    let job = RenderJob::new("a.wav", "", &cfg);
    assert!(job.validate().unwrap_err().is_input());
}

#[test]
fn parsed_cues_carry_the_malformed_count() {
    let parsed = parse_cues("00:00.000 --> 00:01.000\nok\n\nbad --> 00:02.000\nnope\n");
    let job = RenderJob::new("a.wav", "out.mp4", &RenderConfig::default()).with_parsed_cues(parsed);
    assert_eq!(job.cues.len(), 1);
    assert_eq!(job.malformed_cues, 1);
}

#[test]
fn existing_output_is_refused_without_overwrite() {
    let dir = temp_dir("overwrite");
    let out = dir.join("out.mp4");
    std::fs::write(&out, b"old").unwrap();

    let mut cfg = RenderConfig::default();
    cfg.overwrite = false;
    let session = RenderSession::new(cfg.clone()).unwrap();
    let job = RenderJob::new(dir.join("narration.wav"), &out, &cfg);
    let err = session.render(&job, &CancelToken::new()).unwrap_err();
    assert!(err.is_input());
    assert_eq!(std::fs::read(&out).unwrap(), b"old");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_narration_fails_at_open_inputs() {
    let dir = temp_dir("no_narration");
    let cfg = RenderConfig::default();
    let session = RenderSession::new(cfg.clone()).unwrap();
    let job = RenderJob::new(dir.join("missing.wav"), dir.join("out.mp4"), &cfg);
    let err = session.render(&job, &CancelToken::new()).unwrap_err();
    assert_eq!(err.stage(), Some(RenderStage::OpenInputs));
    assert!(err.is_input());
    assert!(!dir.join("out.mp4").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_is_rejected_by_the_session() {
    let mut cfg = RenderConfig::default();
    cfg.music_gain = f32::NAN;
    assert!(RenderSession::new(cfg).is_err());
}

#[test]
fn background_music_prefers_mp3_then_wav() {
    let dir = temp_dir("bgm_lookup");
    assert_eq!(find_background_music(&dir), None);

    std::fs::write(dir.join("bgm.wav"), b"w").unwrap();
    assert_eq!(find_background_music(&dir), Some(dir.join("bgm.wav")));

    std::fs::write(dir.join("bgm.mp3"), b"m").unwrap();
    assert_eq!(find_background_music(&dir), Some(dir.join("bgm.mp3")));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn thread_pool_honors_requested_size() {
    assert!(build_thread_pool(Some(0)).is_err());
    let pool = build_thread_pool(Some(2)).unwrap();
    assert_eq!(pool.current_num_threads(), 2);
}

#[test]
fn report_is_degraded_only_with_degradations() {
    let mut report = RenderReport {
        output_path: PathBuf::from("out.mp4"),
        duration: Duration::from_secs(1),
        frames: 24,
        cues_rendered: 0,
        cues_dropped: 0,
        music_copies: None,
        font: FontOrigin::Builtin,
        degradations: Vec::new(),
    };
    assert!(!report.is_degraded());
    report.degradations.push(Degradation::BuiltinFont);
    assert!(report.is_degraded());
}
