//! Job submission.
//!
//! Every call validates its arguments right away and appends one job to the queue; nothing is
//! drawn until the render thread calls [`DrawContext::update_screen`].

use std::path::Path;

use crate::animation::{SequenceInstance, SpriteSheet};
use crate::context::DrawContext;
use crate::errors::{DrawError, Result};
use crate::render::{Color, Coord, DrawJob, JobTicket};
use crate::resources::ImageHandle;

fn non_negative(what: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(DrawError::InvalidArgument(format!("{what} cannot be negative ({value})")));
    }
    Ok(())
}

fn valid_thickness(thickness: u8) -> Result<()> {
    if thickness == 0 {
        return Err(DrawError::InvalidArgument("line thickness must be at least 1".into()));
    }
    Ok(())
}

pub(crate) fn valid_scale(scale: f32) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(DrawError::InvalidArgument(format!("invalid image scale {scale}")));
    }
    Ok(())
}

impl DrawContext {
    /// Fills the whole screen. Not affected by the global offset.
    pub fn clear(&self, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("clear", || self.queue.submit(DrawJob::Clear { color }))
    }

    /// Arc around `(x, y)` from `start` to `end` degrees.
    pub fn draw_arc(
        &self,
        x: i32,
        y: i32,
        radius: i32,
        start: i32,
        end: i32,
        color: impl Into<Color>,
    ) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_arc", || {
            non_negative("arc radius", radius)?;
            self.queue.submit(DrawJob::Arc { x, y, radius, start, end, color })
        })
    }

    pub fn draw_ellipse(&self, x: i32, y: i32, rx: i32, ry: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_ellipse", || {
            non_negative("ellipse x radius", rx)?;
            non_negative("ellipse y radius", ry)?;
            self.queue.submit(DrawJob::Ellipse { x, y, rx, ry, color })
        })
    }

    /// Draws `text` with its top-left corner at `(x, y)` using the current font.
    pub fn draw_text(&self, text: &str, x: i32, y: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_text", || self.submit_text(text, x, y, color))
    }

    /// Draws `text` centred on `(x, y)` using the current font.
    ///
    /// Unlike every other submission call this one measures the text with the backend first,
    /// so it waits while the render thread holds the backend in
    /// [`update_screen`](Self::update_screen). Producers that must never wait can measure
    /// once with [`text_size`](Self::text_size) and use [`draw_text`](Self::draw_text).
    pub fn draw_centered_text(&self, text: &str, x: i32, y: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_centered_text", || {
            if text.is_empty() {
                return Err(DrawError::EmptyText);
            }
            let size = self.measure_text(text)?;
            let half = |extent: u32| (extent / 2).try_into().unwrap_or(i32::MAX);
            self.submit_text(
                text,
                x.saturating_sub(half(size.width)),
                y.saturating_sub(half(size.height)),
                color,
            )
        })
    }

    pub fn draw_box(&self, x: i32, y: i32, w: i32, h: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_box", || {
            non_negative("box width", w)?;
            non_negative("box height", h)?;
            self.queue.submit(DrawJob::Rect { x, y, w, h, color })
        })
    }

    pub fn draw_filled_box(&self, x: i32, y: i32, w: i32, h: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_filled_box", || {
            non_negative("box width", w)?;
            non_negative("box height", h)?;
            self.queue.submit(DrawJob::FilledRect { x, y, w, h, color })
        })
    }

    /// Filled circle.
    pub fn draw_circle(&self, x: i32, y: i32, radius: i32, color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_circle", || {
            non_negative("circle radius", radius)?;
            self.queue.submit(DrawJob::Circle { x, y, radius, color })
        })
    }

    pub fn draw_line(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        thickness: u8,
        color: impl Into<Color>,
    ) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_line", || {
            valid_thickness(thickness)?;
            self.queue.submit(DrawJob::Line { x1, y1, x2, y2, thickness, color })
        })
    }

    /// Polygon outline through `points`, closed back to the first point.
    pub fn draw_poly(&self, points: &[Coord], color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_poly", || {
            if points.len() < 3 {
                return Err(DrawError::InvalidArgument(format!(
                    "polygon needs at least 3 points, got {}",
                    points.len()
                )));
            }
            let mut owned = Vec::new();
            owned
                .try_reserve_exact(points.len())
                .map_err(|e| DrawError::Allocation(format!("polygon points: {e}")))?;
            owned.extend_from_slice(points);
            self.queue.submit(DrawJob::Polygon { points: owned, color })
        })
    }

    /// Filled triangle.
    pub fn draw_triangle(&self, points: [Coord; 3], color: impl Into<Color>) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_triangle", || self.queue.submit(DrawJob::Triangle { points, color }))
    }

    /// Draws a loaded image at its current scale.
    pub fn draw_image(&self, image: ImageHandle, x: i32, y: i32) -> Result<JobTicket> {
        self.track("draw_image", || {
            self.submit_with_image(image, DrawJob::LoadedImage { image, x, y })
        })
    }

    /// Draws an image file without loading it. The file is decoded when the job is drawn.
    pub fn draw_image_file(&self, path: impl AsRef<Path>, x: i32, y: i32) -> Result<JobTicket> {
        self.track("draw_image_file", || {
            let path = self.resolve(path.as_ref())?;
            self.queue.submit(DrawJob::Image { path, x, y })
        })
    }

    pub fn draw_scaled_image_file(&self, path: impl AsRef<Path>, x: i32, y: i32, scale: f32) -> Result<JobTicket> {
        self.track("draw_scaled_image_file", || {
            valid_scale(scale)?;
            let path = self.resolve(path.as_ref())?;
            self.queue.submit(DrawJob::ScaledImage { path, x, y, scale })
        })
    }

    /// Draws cell `(column, row)` of `sheet` at `(x, y)`.
    pub fn draw_sprite(&self, sheet: &SpriteSheet, column: u32, row: u32, x: i32, y: i32) -> Result<JobTicket> {
        self.track("draw_sprite", || {
            let crop = sheet.cell_rect(column, row)?;
            let image = sheet.image;
            self.submit_with_image(image, DrawJob::LoadedImageCrop { image, x, y, crop })
        })
    }

    /// Advances `instance` by `delta_ms` and draws its current frame at `(x, y)`.
    pub fn draw_animation_frame(
        &self,
        instance: &mut SequenceInstance,
        delta_ms: u32,
        x: i32,
        y: i32,
    ) -> Result<JobTicket> {
        self.track("draw_animation_frame", || {
            instance.tick(delta_ms);
            let crop = instance.source_rect()?;
            let image = instance.image();
            self.submit_with_image(image, DrawJob::LoadedImageCrop { image, x, y, crop })
        })
    }

    /// Line from `(x1, y1)` to `(x2, y2)` with a head of two barbs at the far end.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arrow(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        head_length: i32,
        thickness: u8,
        color: impl Into<Color>,
    ) -> Result<JobTicket> {
        let color = color.into();
        self.track("draw_arrow", || {
            non_negative("arrow head length", head_length)?;
            valid_thickness(thickness)?;
            self.queue.submit(DrawJob::Arrow {
                x1,
                y1,
                x2,
                y2,
                head_length,
                thickness,
                color,
            })
        })
    }

    /// Sets the offset added to every job drawn from now on, including jobs already queued.
    pub fn set_global_offset(&self, x: i32, y: i32) -> Result<()> {
        self.track("set_global_offset", || self.offset.set(x, y))
    }

    pub fn set_global_x_offset(&self, x: i32) -> Result<()> {
        self.track("set_global_x_offset", || self.offset.set_x(x))
    }

    pub fn set_global_y_offset(&self, y: i32) -> Result<()> {
        self.track("set_global_y_offset", || self.offset.set_y(y))
    }

    pub fn global_offset(&self) -> Result<Coord> {
        self.track("global_offset", || self.offset.get())
    }

    pub fn global_x_offset(&self) -> Result<i32> {
        self.track("global_x_offset", || self.offset.x())
    }

    pub fn global_y_offset(&self) -> Result<i32> {
        self.track("global_y_offset", || self.offset.y())
    }

    fn submit_text(&self, text: &str, x: i32, y: i32, color: Color) -> Result<JobTicket> {
        if text.is_empty() {
            return Err(DrawError::EmptyText);
        }
        let mut owned = String::new();
        owned
            .try_reserve_exact(text.len())
            .map_err(|e| DrawError::Allocation(format!("text buffer: {e}")))?;
        owned.push_str(text);

        let font = self.fonts.acquire_current()?;
        self.queue
            .submit(DrawJob::Text {
                text: owned,
                x,
                y,
                color,
                font,
            })
            .inspect_err(|_| {
                if let Err(e) = self.put_font(font) {
                    log::warn!("{font}: releasing after failed submission: {e}");
                }
            })
    }

    /// Submits a job that references `image`, holding one reference for the job's lifetime.
    fn submit_with_image(&self, image: ImageHandle, job: DrawJob) -> Result<JobTicket> {
        self.images.acquire(image)?;
        self.queue.submit(job).inspect_err(|_| {
            if let Err(e) = self.put_image(image) {
                log::warn!("{image}: releasing after failed submission: {e}");
            }
        })
    }
}
