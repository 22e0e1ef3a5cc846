//! Draw jobs.
//!
//! A [`DrawJob`] is the queued description of one drawing operation. Producers build them on
//! any thread; the render thread turns each one into backend [`Primitive`]s, applying the global
//! offset at that point.
//!
//! Jobs own everything they carry (text, polygon points, file paths). Jobs that reference a
//! loaded image or font hold one reference count on it, taken at submission and given back
//! right after dispatch.
//!
//! [`Primitive`]: crate::render::backend::Primitive

use std::path::PathBuf;

use crate::render::Color;
use crate::resources::{FontHandle, ImageHandle};

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with its top-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// A single queued drawing operation.
#[derive(Clone, Debug)]
pub enum DrawJob {
    /// Clear the entire screen. Not affected by the global offset.
    Clear { color: Color },

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

    /// Text drawn with `font`, which this job holds a reference on.
    Text {
        text: String,
        x: i32,
        y: i32,
        color: Color,
        font: FontHandle,
    },

    Rect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },

    FilledRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },

    /// Filled circle.
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

    Polygon { points: Vec<Coord>, color: Color },

    /// Filled triangle.
    Triangle { points: [Coord; 3], color: Color },

    /// Image decoded from `path` when the job is dispatched and thrown away afterwards.
    Image { path: PathBuf, x: i32, y: i32 },

    /// Whole loaded image, drawn at its current scale.
    LoadedImage { image: ImageHandle, x: i32, y: i32 },

    /// `crop` of a loaded image, drawn unscaled at `(x, y)`.
    LoadedImageCrop {
        image: ImageHandle,
        x: i32,
        y: i32,
        crop: Rect,
    },

    /// Like [`DrawJob::Image`] with a scale factor.
    ScaledImage {
        path: PathBuf,
        x: i32,
        y: i32,
        scale: f32,
    },

    Arrow {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        head_length: i32,
        thickness: u8,
        color: Color,
    },
}

impl DrawJob {
    /// Short name of the job kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DrawJob::Clear { .. } => "clear",
            DrawJob::Arc { .. } => "arc",
            DrawJob::Ellipse { .. } => "ellipse",
            DrawJob::Text { .. } => "text",
            DrawJob::Rect { .. } => "rect",
            DrawJob::FilledRect { .. } => "filled-rect",
            DrawJob::Circle { .. } => "circle",
            DrawJob::Line { .. } => "line",
            DrawJob::Polygon { .. } => "polygon",
            DrawJob::Triangle { .. } => "triangle",
            DrawJob::Image { .. } => "image",
            DrawJob::LoadedImage { .. } => "loaded-image",
            DrawJob::LoadedImageCrop { .. } => "loaded-image-crop",
            DrawJob::ScaledImage { .. } => "scaled-image",
            DrawJob::Arrow { .. } => "arrow",
        }
    }

    /// The loaded image this job holds a reference on, if any.
    pub fn image_ref(&self) -> Option<ImageHandle> {
        match self {
            DrawJob::LoadedImage { image, .. } | DrawJob::LoadedImageCrop { image, .. } => {
                Some(*image)
            }
            _ => None,
        }
    }

    /// The font this job holds a reference on, if any.
    pub fn font_ref(&self) -> Option<FontHandle> {
        match self {
            DrawJob::Text { font, .. } => Some(*font),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resource_jobs_report_references() {
        let image = ImageHandle::new();
        let font = FontHandle::new();
        let color = Color::from_rgb(0);

        let crop = DrawJob::LoadedImageCrop {
            image,
            x: 0,
            y: 0,
            crop: Rect::new(0, 0, 4, 4),
        };
        assert_eq!(crop.image_ref(), Some(image));
        assert_eq!(crop.font_ref(), None);

        let text = DrawJob::Text {
            text: "hi".into(),
            x: 0,
            y: 0,
            color,
            font,
        };
        assert_eq!(text.font_ref(), Some(font));
        assert_eq!(text.image_ref(), None);

        let circle = DrawJob::Circle { x: 1, y: 1, radius: 3, color };
        assert_eq!(circle.image_ref(), None);
        assert_eq!(circle.font_ref(), None);
        assert_eq!(circle.kind(), "circle");
    }

    #[test]
    fn coord_offset_saturates() {
        assert_eq!(Coord::new(1, 2).offset(10, -5), Coord::new(11, -3));
        assert_eq!(Coord::new(i32::MAX, 0).offset(1, 0).x, i32::MAX);
    }
}
