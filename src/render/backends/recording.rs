use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use anyhow::{anyhow, bail, Result};

use crate::render::backend::{BackendFont, DrawBackend, Primitive, Surface, SurfaceSize, TextureId};
use crate::render::backends::null::decode_png;

/// One call made on a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    MakeCurrent(ThreadId),
    RecreateRenderer(ThreadId),
    DecodeImage { len: usize },
    CreateTexture(TextureId),
    DestroyTexture(TextureId),
    OpenFont { path: PathBuf, size: u32, font: BackendFont },
    CloseFont(BackendFont),
    TextSize { font: BackendFont, text: String },
    Draw(Primitive<'static>),
    Present,
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<BackendCall>,
    next_id: u64,
    /// Draw calls left before drawing starts failing
    draws_until_failure: Option<usize>,
    fail_make_current: bool,
}

/// Shared view on what a [`RecordingBackend`] was asked to do. Stays usable after the backend
/// itself has been moved into a context.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Every primitive drawn so far, in order.
    pub fn draws(&self) -> Vec<Primitive<'static>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Lets `n` more draw calls succeed, then fails every following one.
    pub fn fail_draws_after(&self, n: usize) {
        self.lock().draws_until_failure = Some(n);
    }

    pub fn fail_make_current(&self, fail: bool) {
        self.lock().fail_make_current = fail;
    }

    /// Back to a backend that never fails.
    pub fn heal(&self) {
        let mut state = self.lock();
        state.draws_until_failure = None;
        state.fail_make_current = false;
    }
}

/// Headless backend that records every call. Text is measured as `size / 2` pixels per
/// character and `size` pixels high; fonts only need to exist on disk.
#[derive(Debug)]
pub struct RecordingBackend {
    recorder: Recorder,
    font_sizes: Vec<(BackendFont, u32)>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        let backend = Self {
            recorder: recorder.clone(),
            font_sizes: Vec::new(),
        };
        (backend, recorder)
    }

    fn record(&self, call: BackendCall) {
        self.recorder.lock().calls.push(call);
    }

    fn next_id(&self) -> u64 {
        let mut state = self.recorder.lock();
        state.next_id += 1;
        state.next_id
    }
}

impl DrawBackend for RecordingBackend {
    fn name(&self) -> &str {
        "RecordingBackend"
    }

    fn make_current(&mut self) -> Result<()> {
        if self.recorder.lock().fail_make_current {
            bail!("context cannot be made current");
        }
        self.record(BackendCall::MakeCurrent(thread::current().id()));
        Ok(())
    }

    fn recreate_renderer(&mut self) -> Result<()> {
        self.record(BackendCall::RecreateRenderer(thread::current().id()));
        Ok(())
    }

    fn decode_image(&mut self, bytes: &[u8]) -> Result<Surface> {
        self.record(BackendCall::DecodeImage { len: bytes.len() });
        decode_png(bytes)
    }

    fn create_texture(&mut self, _surface: &Surface) -> Result<TextureId> {
        let texture = TextureId(self.next_id());
        self.record(BackendCall::CreateTexture(texture));
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.record(BackendCall::DestroyTexture(texture));
    }

    fn open_font(&mut self, path: &Path, size: u32) -> Result<BackendFont> {
        if !path.is_file() {
            bail!("no font file at {}", path.display());
        }
        let font = BackendFont(self.next_id());
        self.font_sizes.push((font, size));
        self.record(BackendCall::OpenFont {
            path: path.to_path_buf(),
            size,
            font,
        });
        Ok(font)
    }

    fn close_font(&mut self, font: BackendFont) {
        self.font_sizes.retain(|(f, _)| *f != font);
        self.record(BackendCall::CloseFont(font));
    }

    fn text_size(&mut self, font: BackendFont, text: &str) -> Result<SurfaceSize> {
        let size = self
            .font_sizes
            .iter()
            .find(|(f, _)| *f == font)
            .map(|(_, size)| *size)
            .ok_or_else(|| anyhow!("font {} is not open", font.0))?;
        self.record(BackendCall::TextSize {
            font,
            text: text.to_string(),
        });
        Ok(SurfaceSize::new(text.chars().count() as u32 * size / 2, size))
    }

    fn draw(&mut self, primitive: Primitive<'_>) -> Result<()> {
        {
            let mut state = self.recorder.lock();
            match state.draws_until_failure {
                Some(0) => bail!("injected draw failure"),
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        self.record(BackendCall::Draw(primitive.into_owned()));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.record(BackendCall::Present);
        Ok(())
    }
}
