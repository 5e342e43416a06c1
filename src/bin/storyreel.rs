use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use storyreel::render::blend::flatten_over_opaque;
use storyreel::{CancelToken, RenderConfig, RenderJob, RenderSession, find_background_music};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the captioned MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Narration audio; its length is the video length.
    #[arg(long)]
    narration: PathBuf,

    /// Timed-text cue file (WebVTT or SRT).
    #[arg(long)]
    cues: Option<PathBuf>,

    /// Background image, fitted and cropped to the canvas.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Background music. Defaults to `bgm.mp3`/`bgm.wav` next to the narration.
    #[arg(long)]
    music: Option<PathBuf>,

    /// Disable the background music lookup next to the narration.
    #[arg(long, default_value_t = false)]
    no_music: bool,

    /// Render config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Refuse to replace an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Render frames on a single thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Timestamp in seconds.
    #[arg(long)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_logging(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(p) => RenderConfig::from_path(p).with_context(|| format!("load config '{}'", p.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn build_job(inputs: &InputArgs, out: &Path, cfg: &RenderConfig) -> anyhow::Result<RenderJob> {
    let mut job = RenderJob::new(&inputs.narration, out, cfg);
    if let Some(path) = &inputs.cues {
        let parsed = storyreel::parse_cue_file(path)
            .with_context(|| format!("read cues '{}'", path.display()))?;
        for err in &parsed.errors {
            tracing::warn!("{err}");
        }
        job = job.with_parsed_cues(parsed);
    }
    if let Some(path) = &inputs.image {
        job = job.with_background_image(path);
    }
    let music = match (&inputs.music, inputs.no_music) {
        (Some(path), _) => Some(path.clone()),
        (None, false) => inputs
            .narration
            .parent()
            .and_then(find_background_music),
        (None, true) => None,
    };
    if let Some(path) = music {
        job = job.with_background_music(path);
    }
    Ok(job)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.inputs.config.as_deref())?;
    if args.no_overwrite {
        cfg.overwrite = false;
    }
    if args.sequential {
        cfg.render.parallel = false;
    }
    if args.threads.is_some() {
        cfg.render.threads = args.threads;
    }

    let job = build_job(&args.inputs, &args.out, &cfg)?;
    let session = RenderSession::new(cfg)?;
    let report = session.render(&job, &CancelToken::new())?;

    for d in &report.degradations {
        eprintln!("warning: {d:?}");
    }
    eprintln!(
        "wrote {} ({} frames, {:.3}s)",
        report.output_path.display(),
        report.frames,
        report.duration.as_secs_f64()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.at.is_finite() && args.at >= 0.0,
        "--at must be a non-negative number of seconds"
    );
    let cfg = load_config(args.inputs.config.as_deref())?;
    let bg = cfg.background_color;
    let job = build_job(&args.inputs, &args.out, &cfg)?;
    let session = RenderSession::new(cfg)?;
    let mut frame = session.render_preview_frame(&job, Duration::from_secs_f64(args.at))?;
    flatten_over_opaque(&mut frame.data, [bg.r, bg.g, bg.b]);

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
