use crate::errors::{DrawError, Result};
use crate::render::backend::SurfaceSize;
use crate::render::Rect;
use crate::resources::ImageHandle;

/// A uniform grid laid over (part of) a loaded image.
///
/// Cells are `sprite_width x sprite_height` pixels. Between two neighbouring cells there are
/// `2 * padding` pixels on each axis; there is no padding around the outer edge of the bounding
/// box. A sheet does not hold a reference on its image: every job drawn from it takes its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
    pub image: ImageHandle,
    /// Bounding box of the grid inside the image
    pub bounds: Rect,
    pub sprite_width: u32,
    pub sprite_height: u32,
    pub columns: u32,
    pub rows: u32,
    pub padding_x: u32,
    pub padding_y: u32,
}

impl SpriteSheet {
    pub fn builder(image: ImageHandle, image_size: SurfaceSize) -> SpriteSheetBuilder {
        SpriteSheetBuilder::new(image, image_size)
    }

    /// Pixel rectangle of cell `(column, row)` inside the image.
    pub fn cell_rect(&self, column: u32, row: u32) -> Result<Rect> {
        if column >= self.columns || row >= self.rows {
            return Err(DrawError::SpriteCellOutOfRange {
                column,
                row,
                columns: self.columns,
                rows: self.rows,
            });
        }

        let origin = |start: i32, index: u32, sprite: u32, padding: u32| {
            let step = u64::from(sprite) + 2 * u64::from(padding);
            let offset = u64::from(index).saturating_mul(step);
            i32::try_from(i64::from(start).saturating_add_unsigned(offset))
        };
        let out_of_range = |_: std::num::TryFromIntError| DrawError::InvalidArgument(format!("sprite cell ({column}, {row}) lies outside the pixel range"));
        Ok(Rect::new(
            origin(self.bounds.x, column, self.sprite_width, self.padding_x).map_err(out_of_range)?,
            origin(self.bounds.y, row, self.sprite_height, self.padding_y).map_err(out_of_range)?,
            self.sprite_width as i32,
            self.sprite_height as i32,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    /// Padding on each side of every cell
    Padding { x: u32, y: u32 },
    /// Total space between neighbouring cells, split evenly as padding
    Spacing { x: u32, y: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Portion {
    x: u32,
    y: u32,
    sprite_width: u32,
    sprite_height: u32,
}

/// Builds a [`SpriteSheet`] either over the whole image or over a portion of it, with cells
/// that are unpadded, padded, or separated by a fixed spacing.
///
/// ```
/// # use gfx_draw::animation::SpriteSheet;
/// # use gfx_draw::render::backend::SurfaceSize;
/// # fn sheet(image: gfx_draw::resources::ImageHandle) -> gfx_draw::Result<SpriteSheet> {
/// SpriteSheet::builder(image, SurfaceSize::new(256, 64))
///     .grid(8, 2)
///     .padding(1, 1)
///     .build()
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SpriteSheetBuilder {
    image: ImageHandle,
    image_size: SurfaceSize,
    columns: u32,
    rows: u32,
    gap: Gap,
    portion: Option<Portion>,
}

impl SpriteSheetBuilder {
    pub fn new(image: ImageHandle, image_size: SurfaceSize) -> Self {
        Self {
            image,
            image_size,
            columns: 1,
            rows: 1,
            gap: Gap::None,
            portion: None,
        }
    }

    pub fn grid(mut self, columns: u32, rows: u32) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    pub fn padding(mut self, x: u32, y: u32) -> Self {
        self.gap = Gap::Padding { x, y };
        self
    }

    pub fn spacing(mut self, x: u32, y: u32) -> Self {
        self.gap = Gap::Spacing { x, y };
        self
    }

    /// Restricts the grid to cells of the given size starting at `(x, y)` in the image.
    pub fn portion(mut self, x: u32, y: u32, sprite_width: u32, sprite_height: u32) -> Self {
        self.portion = Some(Portion {
            x,
            y,
            sprite_width,
            sprite_height,
        });
        self
    }

    pub fn build(self) -> Result<SpriteSheet> {
        if self.columns == 0 || self.rows == 0 {
            return Err(DrawError::InvalidArgument(
                "sprite sheet needs at least one column and one row".into(),
            ));
        }

        let overflow = || DrawError::InvalidArgument("sprite sheet geometry exceeds the pixel range".into());

        // padding per cell side, and pixels between two neighbouring cells
        let ((padding_x, padding_y), (between_x, between_y)) = match self.gap {
            Gap::None => ((0, 0), (0, 0)),
            Gap::Padding { x, y } => (
                (x, y),
                (
                    x.checked_mul(2).ok_or_else(overflow)?,
                    y.checked_mul(2).ok_or_else(overflow)?,
                ),
            ),
            Gap::Spacing { x, y } => ((x / 2, y / 2), (x, y)),
        };

        let span = |cells: u32, size: u32, between: u32| {
            cells
                .checked_mul(size)?
                .checked_add((cells - 1).checked_mul(between)?)
        };
        let (x, y, width, height) = match self.portion {
            None => (0, 0, self.image_size.width, self.image_size.height),
            Some(p) => (
                p.x,
                p.y,
                span(self.columns, p.sprite_width, between_x).ok_or_else(overflow)?,
                span(self.rows, p.sprite_height, between_y).ok_or_else(overflow)?,
            ),
        };

        let fits = |origin: u32, extent: u32, total: u32| origin.checked_add(extent).is_some_and(|end| end <= total);
        if !fits(x, width, self.image_size.width) || !fits(y, height, self.image_size.height) {
            return Err(DrawError::InvalidArgument(format!(
                "sprite grid {width}x{height} at ({x}, {y}) does not fit a {}x{} image",
                self.image_size.width, self.image_size.height
            )));
        }
        let to_i32 = |v: u32| i32::try_from(v).map_err(|_| overflow());
        let bounds = Rect::new(to_i32(x)?, to_i32(y)?, to_i32(width)?, to_i32(height)?);

        let padded = |total: u32, cells: u32, pad: u32| -> Result<u32> {
            let usable = pad
                .checked_mul(2)
                .and_then(|gap| gap.checked_mul(cells - 1))
                .and_then(|gaps| total.checked_sub(gaps))
                .ok_or_else(|| DrawError::InvalidArgument("sprite padding exceeds the sheet size".into()))?;
            match usable / cells {
                0 => Err(DrawError::InvalidArgument("sprite cells would be empty".into())),
                size => Ok(size),
            }
        };
        let sprite_width = padded(width, self.columns, padding_x)?;
        let sprite_height = padded(height, self.rows, padding_y)?;

        Ok(SpriteSheet {
            image: self.image,
            bounds,
            sprite_width,
            sprite_height,
            columns: self.columns,
            rows: self.rows,
            padding_x,
            padding_y,
        })
    }
}
