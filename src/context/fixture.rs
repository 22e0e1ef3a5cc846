use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::config::DrawConfig;
use crate::context::DrawContext;
use crate::render::backends::recording::{Recorder, RecordingBackend};

/// A context over a recording backend and a throwaway resources directory holding two fonts,
/// `img/tile.png` (4x2) and `img/sheet.png` (32x8).
pub(crate) struct Fixture {
    pub dir: TempDir,
    pub recorder: Recorder,
    pub ctx: DrawContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut DrawConfig)) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        let img = dir.path().join("img");
        fs::create_dir_all(&fonts).unwrap();
        fs::create_dir_all(&img).unwrap();
        fs::write(fonts.join("IBMPlexSans-Medium.ttf"), b"").unwrap();
        fs::write(fonts.join("Other.ttf"), b"").unwrap();
        write_png(&img.join("tile.png"), 4, 2);
        write_png(&img.join("sheet.png"), 32, 8);

        let mut config = DrawConfig {
            resources_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        tweak(&mut config);

        let (backend, recorder) = RecordingBackend::new();
        let ctx = DrawContext::new(config, Box::new(backend)).unwrap();
        Self { dir, recorder, ctx }
    }
}

fn write_png(path: &Path, width: u32, height: u32) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(file, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer
        .write_image_data(&vec![0x80; (width * height * 4) as usize])
        .unwrap();
}
