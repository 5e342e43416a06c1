#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use storyreel::assets::StillImage;
use storyreel::audio::AudioPcm;
use storyreel::session::{AudioInput, EncoderHandle, ImageInput, MediaHandle, MediaProvider};
use storyreel::{
    CancelToken, Canvas, Fps, FrameIndex, FrameRGBA, FrameSink, InMemorySink, ReelError,
    ReelResult, RenderConfig, RenderStage, SinkConfig,
};

/// Sample rate of every fake audio track. Low to keep the tests light.
pub const RATE: u32 = 8_000;

pub fn small_config() -> RenderConfig {
    let mut cfg = RenderConfig::default();
    cfg.canvas = Canvas {
        width: 160,
        height: 90,
    };
    cfg.fps = Fps::new(24, 1).unwrap();
    cfg.font.builtin = true;
    cfg.font.size_px = 14.0;
    cfg.stroke_width_px = 0.0;
    cfg.caption_margin_px = 8;
    cfg.text_padding_px = 2;
    cfg.caption_anchor_y = 0.4;
    cfg.render.chunk_size = 16;
    cfg
}

/// Stereo tone of `secs` seconds at constant amplitude `level`.
pub fn tone(secs: f64, level: f32) -> AudioPcm {
    let frames = (secs * f64::from(RATE)).round() as usize;
    AudioPcm::new(RATE, 2, vec![level; frames * 2]).unwrap()
}

/// Opens and releases of every handle the fake provider handed out.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Vec<(String, usize)>>,
}

impl Ledger {
    fn open(&self, label: &str) -> usize {
        let mut entries = self.entries.lock().unwrap();
        entries.push((label.to_owned(), 0));
        entries.len() - 1
    }

    fn release(&self, id: usize) {
        self.entries.lock().unwrap()[id].1 += 1;
    }

    pub fn opened(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(l, _)| l.clone())
            .collect()
    }

    /// Handles whose release count is not exactly one.
    pub fn unbalanced(&self) -> Vec<(String, usize)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n)| *n != 1)
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub enum FakeAudio {
    Pcm(AudioPcm),
    DecodeError,
}

#[derive(Clone)]
pub enum FakeImage {
    Still(StillImage),
    DecodeError,
    DecodePanic,
}

#[derive(Clone, Default)]
pub enum FakeEncoder {
    #[default]
    Ok,
    /// Cancel `token` once this many frames were pushed.
    CancelAfter(u64, CancelToken),
    FailOnPush(u64),
    FailOnEnd,
}

/// In-process media provider. Paths not registered are reported missing.
#[derive(Clone, Default)]
pub struct FakeMedia {
    audio: HashMap<PathBuf, FakeAudio>,
    images: HashMap<PathBuf, FakeImage>,
    pub encoder: FakeEncoder,
    pub ledger: Arc<Ledger>,
    pub sink: Arc<Mutex<InMemorySink>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(InMemorySink::keeping_frames())),
            ..Self::default()
        }
    }

    pub fn with_audio(mut self, path: &str, audio: FakeAudio) -> Self {
        self.audio.insert(PathBuf::from(path), audio);
        self
    }

    pub fn with_image(mut self, path: &str, image: FakeImage) -> Self {
        self.images.insert(PathBuf::from(path), image);
        self
    }

    pub fn with_encoder(mut self, encoder: FakeEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn frames(&self) -> Vec<(FrameIndex, FrameRGBA)> {
        self.sink.lock().unwrap().frames().to_vec()
    }

    pub fn pushed(&self) -> usize {
        self.sink.lock().unwrap().indices().len()
    }

    pub fn audio(&self) -> Option<Vec<f32>> {
        self.sink.lock().unwrap().audio().map(<[f32]>::to_vec)
    }

    pub fn sink_config(&self) -> Option<SinkConfig> {
        self.sink.lock().unwrap().config().cloned()
    }

    pub fn finished(&self) -> bool {
        self.sink.lock().unwrap().is_finished()
    }
}

fn missing(path: &Path) -> ReelError {
    ReelError::input(
        RenderStage::OpenInputs,
        format!("no such file '{}'", path.display()),
    )
}

struct AudioHandle {
    label: String,
    id: usize,
    ledger: Arc<Ledger>,
    audio: FakeAudio,
}

impl MediaHandle for AudioHandle {
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) -> ReelResult<()> {
        self.ledger.release(self.id);
        Ok(())
    }
}

impl AudioInput for AudioHandle {
    fn decode(&mut self) -> ReelResult<AudioPcm> {
        match &self.audio {
            FakeAudio::Pcm(pcm) => Ok(pcm.clone()),
            FakeAudio::DecodeError => Err(ReelError::validation("corrupt audio stream")),
        }
    }
}

struct ImageHandle {
    id: usize,
    ledger: Arc<Ledger>,
    image: FakeImage,
}

impl MediaHandle for ImageHandle {
    fn label(&self) -> &str {
        "background"
    }

    fn release(&mut self) -> ReelResult<()> {
        self.ledger.release(self.id);
        Ok(())
    }
}

impl ImageInput for ImageHandle {
    fn decode(&mut self) -> ReelResult<StillImage> {
        match &self.image {
            FakeImage::Still(img) => Ok(img.clone()),
            FakeImage::DecodeError => Err(ReelError::validation("corrupt image")),
            FakeImage::DecodePanic => panic!("image decoder crashed"),
        }
    }
}

struct EncoderFake {
    id: usize,
    ledger: Arc<Ledger>,
    sink: Arc<Mutex<InMemorySink>>,
    behavior: FakeEncoder,
}

impl MediaHandle for EncoderFake {
    fn label(&self) -> &str {
        "encoder"
    }

    fn release(&mut self) -> ReelResult<()> {
        self.ledger.release(self.id);
        Ok(())
    }
}

impl FrameSink for EncoderFake {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.sink.lock().unwrap().begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let mut sink = self.sink.lock().unwrap();
        sink.push_frame(idx, frame)?;
        let pushed = sink.indices().len() as u64;
        match &self.behavior {
            FakeEncoder::CancelAfter(n, token) if pushed >= *n => token.cancel(),
            FakeEncoder::FailOnPush(n) if pushed >= *n => {
                return Err(ReelError::environment(RenderStage::Encode, "encoder pipe closed"));
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        if matches!(self.behavior, FakeEncoder::FailOnEnd) {
            return Err(ReelError::environment(
                RenderStage::Finalize,
                "muxer failed to write trailer",
            ));
        }
        self.sink.lock().unwrap().end()
    }
}

impl MediaProvider for FakeMedia {
    fn open_audio(&self, label: &str, path: &Path) -> ReelResult<Box<dyn AudioInput>> {
        let audio = self.audio.get(path).cloned().ok_or_else(|| missing(path))?;
        Ok(Box::new(AudioHandle {
            label: label.to_owned(),
            id: self.ledger.open(label),
            ledger: self.ledger.clone(),
            audio,
        }))
    }

    fn open_image(&self, path: &Path) -> ReelResult<Box<dyn ImageInput>> {
        let image = self.images.get(path).cloned().ok_or_else(|| missing(path))?;
        Ok(Box::new(ImageHandle {
            id: self.ledger.open("background"),
            ledger: self.ledger.clone(),
            image,
        }))
    }

    fn open_encoder(&self, _out_path: &Path, _overwrite: bool) -> ReelResult<Box<dyn EncoderHandle>> {
        Ok(Box::new(EncoderFake {
            id: self.ledger.open("encoder"),
            ledger: self.ledger.clone(),
            sink: self.sink.clone(),
            behavior: self.encoder.clone(),
        }))
    }
}

/// Output path in the temp dir that does not exist yet.
pub fn out_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("storyreel_{name}_{}.mp4", std::process::id()))
}
