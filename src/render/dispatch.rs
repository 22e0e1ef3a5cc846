//! Turns queued jobs into backend primitives on the render thread.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::errors::{DrawError, Result};
use crate::render::backend::{DrawBackend, Primitive};
use crate::render::{Color, Coord, DrawJob, Rect};
use crate::resources::{FontRegistry, ImageRegistry};

/// Everything a job may need while it is drawn.
pub struct DispatchTarget<'a> {
    pub backend: &'a mut dyn DrawBackend,
    pub images: &'a ImageRegistry,
    pub fonts: &'a FontRegistry,
}

impl DispatchTarget<'_> {
    /// Draws `job` with `offset` added to every coordinate it carries.
    pub fn dispatch(&mut self, job: &DrawJob, offset: Coord) -> Result<()> {
        log::trace!("dispatching {} job", job.kind());
        let at = |x: i32, y: i32| Coord::new(x, y).offset(offset.x, offset.y);

        match job {
            DrawJob::Clear { color } => self.draw(Primitive::Clear { color: *color }),
            DrawJob::Arc { x, y, radius, start, end, color } => {
                let c = at(*x, *y);
                self.draw(Primitive::Arc {
                    x: c.x,
                    y: c.y,
                    radius: *radius,
                    start: *start,
                    end: *end,
                    color: *color,
                })
            }
            DrawJob::Ellipse { x, y, rx, ry, color } => {
                let c = at(*x, *y);
                self.draw(Primitive::Ellipse {
                    x: c.x,
                    y: c.y,
                    rx: *rx,
                    ry: *ry,
                    color: *color,
                })
            }
            DrawJob::Text { text, x, y, color, font } => {
                let font = self.fonts.backend_font(*font)?;
                let c = at(*x, *y);
                self.draw(Primitive::Text {
                    font,
                    text: Cow::Borrowed(text.as_str()),
                    x: c.x,
                    y: c.y,
                    color: *color,
                })
            }
            DrawJob::Rect { x, y, w, h, color } | DrawJob::FilledRect { x, y, w, h, color } => {
                let c = at(*x, *y);
                self.draw(Primitive::Rect {
                    rect: Rect::new(c.x, c.y, *w, *h),
                    filled: matches!(job, DrawJob::FilledRect { .. }),
                    color: *color,
                })
            }
            DrawJob::Circle { x, y, radius, color } => {
                let c = at(*x, *y);
                self.draw(Primitive::Circle {
                    x: c.x,
                    y: c.y,
                    radius: *radius,
                    color: *color,
                })
            }
            DrawJob::Line { x1, y1, x2, y2, thickness, color } => {
                self.line(at(*x1, *y1), at(*x2, *y2), *thickness, *color)
            }
            DrawJob::Polygon { points, color } => {
                let mut shifted = Vec::new();
                shifted
                    .try_reserve_exact(points.len())
                    .map_err(|e| DrawError::Allocation(format!("polygon points: {e}")))?;
                shifted.extend(points.iter().map(|p| p.offset(offset.x, offset.y)));
                self.draw(Primitive::Polygon {
                    points: Cow::Owned(shifted),
                    color: *color,
                })
            }
            DrawJob::Triangle { points, color } => self.draw(Primitive::Triangle {
                points: points.map(|p| p.offset(offset.x, offset.y)),
                color: *color,
            }),
            DrawJob::Image { path, x, y } => self.image_file(path, at(*x, *y), 1.0),
            DrawJob::ScaledImage { path, x, y, scale } => self.image_file(path, at(*x, *y), *scale),
            DrawJob::LoadedImage { image, x, y } => {
                let info = self.images.draw_info(*image)?;
                let c = at(*x, *y);
                self.draw(Primitive::Texture {
                    texture: info.texture,
                    src: None,
                    dst: Rect::new(
                        c.x,
                        c.y,
                        (info.size.width as f32 * info.scale) as i32,
                        (info.size.height as f32 * info.scale) as i32,
                    ),
                })
            }
            DrawJob::LoadedImageCrop { image, x, y, crop } => {
                let info = self.images.draw_info(*image)?;
                let c = at(*x, *y);
                self.draw(Primitive::Texture {
                    texture: info.texture,
                    src: Some(*crop),
                    dst: Rect::new(c.x, c.y, crop.w, crop.h),
                })
            }
            DrawJob::Arrow { x1, y1, x2, y2, head_length, thickness, color } => {
                let (from, to) = (at(*x1, *y1), at(*x2, *y2));
                self.line(from, to, *thickness, *color)?;
                if let Some(barbs) = arrow_head(from, to, *head_length) {
                    for barb in barbs {
                        self.line(barb, to, *thickness, *color)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn draw(&mut self, primitive: Primitive<'_>) -> Result<()> {
        let name = primitive.name();
        self.backend
            .draw(primitive)
            .map_err(|e| DrawError::backend(format!("drawing {name}"), e))
    }

    fn line(&mut self, from: Coord, to: Coord, thickness: u8, color: Color) -> Result<()> {
        self.draw(Primitive::Line {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            thickness,
            color,
        })
    }

    /// Decodes `path` into a throwaway texture, draws it and destroys it again.
    fn image_file(&mut self, path: &Path, at: Coord, scale: f32) -> Result<()> {
        let bytes = fs::read(path)?;
        let surface = self
            .backend
            .decode_image(&bytes)
            .map_err(|e| DrawError::backend(format!("decoding {}", path.display()), e))?;
        let texture = self
            .backend
            .create_texture(&surface)
            .map_err(|e| DrawError::backend(format!("creating texture for {}", path.display()), e))?;

        let result = self.draw(Primitive::Texture {
            texture,
            src: None,
            dst: Rect::new(
                at.x,
                at.y,
                (surface.width as f32 * scale) as i32,
                (surface.height as f32 * scale) as i32,
            ),
        });
        self.backend.destroy_texture(texture);
        result
    }
}

/// End points of the two barbs of an arrow pointing from `from` to `to`. Each barb starts
/// `head_length` back along the shaft and `head_length` off to one side. A zero-length arrow
/// has no direction and therefore no head.
pub fn arrow_head(from: Coord, to: Coord, head_length: i32) -> Option<[Coord; 2]> {
    let dx = (i64::from(to.x) - i64::from(from.x)) as f32;
    let dy = (i64::from(to.y) - i64::from(from.y)) as f32;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return None;
    }

    let (ux, uy) = (dx / length, dy / length);
    let h = head_length as f32;
    let (tx, ty) = (to.x as f32, to.y as f32);

    Some([
        Coord::new(
            (tx - ux * h - uy * h).round() as i32,
            (ty - uy * h + ux * h).round() as i32,
        ),
        Coord::new(
            (tx - ux * h + uy * h).round() as i32,
            (ty - uy * h - ux * h).round() as i32,
        ),
    ])
}
