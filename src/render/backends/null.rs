use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use hashbrown::HashMap;
use skrifa::instance::{LocationRef, Size};
use skrifa::MetadataProvider;

use crate::render::backend::{BackendFont, DrawBackend, PixelFormat, Primitive, Surface, SurfaceSize, TextureId};

/// Null backend that does not put anything on screen.
///
/// Images are really decoded (PNG) and fonts are really parsed, so loading and text measurement
/// behave like they would with a windowed backend. Drawing only counts primitives.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_id: u64,
    textures: HashMap<u64, SurfaceSize>,
    fonts: HashMap<u64, NullFont>,
    primitives: u64,
    frame_id: u64,
}

#[derive(Debug)]
struct NullFont {
    data: Vec<u8>,
    size: u32,
}

impl NullBackend {
    /// Creates a new instance of the null backend.
    pub fn new() -> Result<Self> {
        Ok(Self::default())
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn open_fonts(&self) -> usize {
        self.fonts.len()
    }

    pub fn primitives_drawn(&self) -> u64 {
        self.primitives
    }

    pub fn frames_presented(&self) -> u64 {
        self.frame_id
    }
}

impl DrawBackend for NullBackend {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn make_current(&mut self) -> Result<()> {
        Ok(())
    }

    fn recreate_renderer(&mut self) -> Result<()> {
        // textures do not survive the renderer
        self.textures.clear();
        Ok(())
    }

    fn decode_image(&mut self, bytes: &[u8]) -> Result<Surface> {
        decode_png(bytes)
    }

    fn create_texture(&mut self, surface: &Surface) -> Result<TextureId> {
        let id = self.next_id();
        self.textures.insert(id, surface.size());
        Ok(TextureId(id))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_none() {
            log::warn!("NullBackend: destroying unknown texture {}", texture.0);
        }
    }

    fn open_font(&mut self, path: &Path, size: u32) -> Result<BackendFont> {
        let data = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        skrifa::FontRef::new(&data).map_err(|e| anyhow!("parsing font {}: {e}", path.display()))?;

        let id = self.next_id();
        self.fonts.insert(id, NullFont { data, size });
        Ok(BackendFont(id))
    }

    fn close_font(&mut self, font: BackendFont) {
        self.fonts.remove(&font.0);
    }

    fn text_size(&mut self, font: BackendFont, text: &str) -> Result<SurfaceSize> {
        let NullFont { data, size } = self
            .fonts
            .get(&font.0)
            .ok_or_else(|| anyhow!("unknown font {}", font.0))?;
        let font_ref = skrifa::FontRef::new(data).map_err(|e| anyhow!("parsing font: {e}"))?;

        let px = Size::new(*size as f32);
        let charmap = font_ref.charmap();
        let glyph_metrics = font_ref.glyph_metrics(px, LocationRef::default());
        let width: f32 = text
            .chars()
            .map(|ch| {
                let gid = charmap.map(ch).unwrap_or_default();
                glyph_metrics.advance_width(gid).unwrap_or_default()
            })
            .sum();

        let metrics = font_ref.metrics(px, LocationRef::default());
        let height = metrics.ascent - metrics.descent;

        Ok(SurfaceSize::new(width.ceil() as u32, height.ceil() as u32))
    }

    fn draw(&mut self, _primitive: Primitive<'_>) -> Result<()> {
        self.primitives += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }
}

/// Decodes a PNG file into tightly packed RGBA8 pixels.
pub fn decode_png(bytes: &[u8]) -> Result<Surface> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let pixels = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 0xFF])
            .collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 0xFF]).collect(),
        png::ColorType::Indexed => bail!("indexed PNG was not expanded"),
    };

    Surface::from_raw(pixels, info.width, info.height, info.width * 4, PixelFormat::Rgba8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32, color: png::ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn decodes_rgba_and_rgb() {
        let rgba = encode_png(2, 1, png::ColorType::Rgba, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let surface = decode_png(&rgba).unwrap();
        assert_eq!(surface.size(), SurfaceSize::new(2, 1));
        assert_eq!(surface.stride, 8);
        assert_eq!(surface.pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let rgb = encode_png(1, 2, png::ColorType::Rgb, &[9, 8, 7, 6, 5, 4]);
        let surface = decode_png(&rgb).unwrap();
        assert_eq!(surface.pixels, vec![9, 8, 7, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_png(b"definitely not a png").is_err());

        let mut backend = NullBackend::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(backend.open_font(&path, 12).is_err());
        assert!(backend.open_font(&dir.path().join("missing.ttf"), 12).is_err());
        assert_eq!(backend.open_fonts(), 0);
    }

    #[test]
    fn textures_die_with_the_renderer() {
        let mut backend = NullBackend::new().unwrap();
        let surface = Surface::from_raw(vec![0; 4], 1, 1, 4, PixelFormat::Rgba8).unwrap();
        let a = backend.create_texture(&surface).unwrap();
        let b = backend.create_texture(&surface).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_textures(), 2);

        backend.destroy_texture(a);
        assert_eq!(backend.live_textures(), 1);

        backend.recreate_renderer().unwrap();
        assert_eq!(backend.live_textures(), 0);
    }
}
