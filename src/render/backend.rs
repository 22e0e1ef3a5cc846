use std::borrow::Cow;
use std::path::Path;

use crate::render::{Color, Coord, Rect};

/// Size of a surface in pixels. It's a simple struct to hold width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

/// Decoded CPU-side pixels of an image.
///
/// Loaded images keep their surface next to the texture: textures die with the renderer, so
/// when the rendering context moves to another thread every texture is rebuilt from it.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
}

impl Surface {
    pub fn from_raw(pixels: Vec<u8>, width: u32, height: u32, stride: u32, format: PixelFormat) -> anyhow::Result<Self> {
        let needed = (height as usize) * (stride as usize);
        if pixels.len() < needed {
            anyhow::bail!("pixel buffer too small for image dimensions ({} < {needed})", pixels.len());
        }

        Ok(Self {
            pixels,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

/// Backend-side texture. Only valid for the renderer that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Backend-side opened font face at a fixed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BackendFont(pub u64);

/// A single drawing call in device coordinates. The global offset and every resource lookup
/// have already been applied by the time a backend sees one of these.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive<'a> {
    Clear {
        color: Color,
    },
    Arc {
        x: i32,
        y: i32,
        radius: i32,
        start: i32,
        end: i32,
        color: Color,
    },
    Ellipse {
        x: i32,
        y: i32,
        rx: i32,
        ry: i32,
        color: Color,
    },
    Rect {
        rect: Rect,
        filled: bool,
        color: Color,
    },
    Circle {
        x: i32,
        y: i32,
        radius: i32,
        color: Color,
    },
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        thickness: u8,
        color: Color,
    },
    Polygon {
        points: Cow<'a, [Coord]>,
        color: Color,
    },
    Triangle {
        points: [Coord; 3],
        color: Color,
    },
    /// Copy `src` of a texture (whole texture when `None`) into `dst`.
    Texture {
        texture: TextureId,
        src: Option<Rect>,
        dst: Rect,
    },
    Text {
        font: BackendFont,
        text: Cow<'a, str>,
        x: i32,
        y: i32,
        color: Color,
    },
}

impl Primitive<'_> {
    /// Detaches the primitive from the job it was built from.
    pub fn into_owned(self) -> Primitive<'static> {
        match self {
            Primitive::Clear { color } => Primitive::Clear { color },
            Primitive::Arc { x, y, radius, start, end, color } => Primitive::Arc { x, y, radius, start, end, color },
            Primitive::Ellipse { x, y, rx, ry, color } => Primitive::Ellipse { x, y, rx, ry, color },
            Primitive::Rect { rect, filled, color } => Primitive::Rect { rect, filled, color },
            Primitive::Circle { x, y, radius, color } => Primitive::Circle { x, y, radius, color },
            Primitive::Line { x1, y1, x2, y2, thickness, color } => Primitive::Line { x1, y1, x2, y2, thickness, color },
            Primitive::Polygon { points, color } => Primitive::Polygon {
                points: Cow::Owned(points.into_owned()),
                color,
            },
            Primitive::Triangle { points, color } => Primitive::Triangle { points, color },
            Primitive::Texture { texture, src, dst } => Primitive::Texture { texture, src, dst },
            Primitive::Text { font, text, x, y, color } => Primitive::Text {
                font,
                text: Cow::Owned(text.into_owned()),
                x,
                y,
                color,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Clear { .. } => "clear",
            Primitive::Arc { .. } => "arc",
            Primitive::Ellipse { .. } => "ellipse",
            Primitive::Rect { .. } => "rect",
            Primitive::Circle { .. } => "circle",
            Primitive::Line { .. } => "line",
            Primitive::Polygon { .. } => "polygon",
            Primitive::Triangle { .. } => "triangle",
            Primitive::Texture { .. } => "texture",
            Primitive::Text { .. } => "text",
        }
    }
}

/// Drawing backend interface.
///
/// Everything that touches the renderer (`recreate_renderer`, textures, `draw`, `present`) is
/// only called from the thread that currently holds the rendering context. Decoding and font
/// handling do not depend on the renderer.
pub trait DrawBackend: Send {
    fn name(&self) -> &str;

    /// Make the rendering context current on the calling thread.
    fn make_current(&mut self) -> anyhow::Result<()>;

    /// Throw away the renderer and build a new one for the current thread. Every texture created
    /// before this call is invalid afterwards.
    fn recreate_renderer(&mut self) -> anyhow::Result<()>;

    /// Decode an encoded image file into CPU pixels.
    fn decode_image(&mut self, bytes: &[u8]) -> anyhow::Result<Surface>;

    fn create_texture(&mut self, surface: &Surface) -> anyhow::Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn open_font(&mut self, path: &Path, size: u32) -> anyhow::Result<BackendFont>;

    fn close_font(&mut self, font: BackendFont);

    /// Size of `text` rendered with `font`.
    fn text_size(&mut self, font: BackendFont, text: &str) -> anyhow::Result<SurfaceSize>;

    fn draw(&mut self, primitive: Primitive<'_>) -> anyhow::Result<()>;

    /// Show everything drawn since the last present.
    fn present(&mut self) -> anyhow::Result<()>;
}
