use hashbrown::HashMap;

use crate::animation::SpriteSheet;
use crate::errors::{DrawError, Result};

/// Axis and sense in which a sequence walks through the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left to right along a row
    HorizontalPos,
    /// Right to left along a row
    HorizontalNeg,
    /// Top to bottom along a column
    VerticalPos,
    /// Bottom to top along a column
    VerticalNeg,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::HorizontalPos | Direction::HorizontalNeg)
    }

    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::HorizontalNeg | Direction::VerticalNeg)
    }
}

/// `frames` consecutive cells starting at `(start_column, start_row)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSequence {
    pub name: String,
    pub start_row: u32,
    pub start_column: u32,
    pub direction: Direction,
    pub frames: u32,
}

impl AnimationSequence {
    /// Grid cell `(column, row)` shown at frame index `frame` (`0..frames`). Sequences added to
    /// an [`Animation`] never leave the grid for those indices.
    pub fn cell(&self, frame: u32) -> (u32, u32) {
        if self.direction.is_horizontal() {
            (self.start_column + frame, self.start_row)
        } else {
            (self.start_column, self.start_row + frame)
        }
    }
}

/// A sprite sheet plus its named sequences.
#[derive(Debug, Clone)]
pub struct Animation {
    sheet: SpriteSheet,
    sequences: HashMap<String, AnimationSequence>,
}

impl Animation {
    pub fn new(sheet: SpriteSheet) -> Self {
        Self {
            sheet,
            sequences: HashMap::new(),
        }
    }

    pub fn sheet(&self) -> &SpriteSheet {
        &self.sheet
    }

    /// Adds a sequence. Every cell it walks through must lie on the sheet.
    pub fn add_sequence(
        &mut self,
        name: &str,
        start_row: u32,
        start_column: u32,
        direction: Direction,
        frames: u32,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(DrawError::InvalidArgument("sequence requires a name".into()));
        }
        if frames == 0 {
            return Err(DrawError::InvalidArgument(format!(
                "sequence '{name}' needs at least one frame"
            )));
        }
        if self.sequences.contains_key(name) {
            return Err(DrawError::DuplicateSequence(name.to_string()));
        }

        let sequence = AnimationSequence {
            name: name.to_string(),
            start_row,
            start_column,
            direction,
            frames,
        };
        self.sheet.cell_rect(start_column, start_row)?;
        let (last_column, last_row) = if direction.is_horizontal() {
            (start_column.checked_add(frames - 1), Some(start_row))
        } else {
            (Some(start_column), start_row.checked_add(frames - 1))
        };
        match (last_column, last_row) {
            (Some(column), Some(row)) => {
                self.sheet.cell_rect(column, row)?;
            }
            _ => {
                return Err(DrawError::SpriteCellOutOfRange {
                    column: last_column.unwrap_or(u32::MAX),
                    row: last_row.unwrap_or(u32::MAX),
                    columns: self.sheet.columns,
                    rows: self.sheet.rows,
                })
            }
        }

        self.sequences
            .try_reserve(1)
            .map_err(|e| DrawError::Allocation(format!("animation sequence: {e:?}")))?;
        self.sequences.insert(name.to_string(), sequence);
        Ok(())
    }

    pub fn sequence(&self, name: &str) -> Result<&AnimationSequence> {
        self.sequences
            .get(name)
            .ok_or_else(|| DrawError::UnknownSequence(name.to_string()))
    }

    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::SurfaceSize;
    use crate::resources::ImageHandle;

    fn animation() -> Animation {
        let sheet = SpriteSheet::builder(ImageHandle::new(), SurfaceSize::new(128, 96))
            .grid(4, 3)
            .build()
            .unwrap();
        Animation::new(sheet)
    }

    #[test]
    fn sequences_must_fit_the_grid() {
        let mut anim = animation();
        anim.add_sequence("walk", 1, 0, Direction::HorizontalPos, 4).unwrap();
        anim.add_sequence("fall", 0, 3, Direction::VerticalNeg, 3).unwrap();

        assert!(matches!(
            anim.add_sequence("long", 0, 1, Direction::HorizontalPos, 4),
            Err(DrawError::SpriteCellOutOfRange { column: 4, .. })
        ));
        assert!(matches!(
            anim.add_sequence("far", 0, u32::MAX, Direction::HorizontalPos, 2),
            Err(DrawError::SpriteCellOutOfRange { column: u32::MAX, .. })
        ));
        assert!(matches!(
            anim.add_sequence("endless", 2, 1, Direction::VerticalPos, u32::MAX),
            Err(DrawError::SpriteCellOutOfRange { row: u32::MAX, .. })
        ));
        assert!(anim.add_sequence("empty", 0, 0, Direction::VerticalPos, 0).is_err());
        assert!(anim.add_sequence("", 0, 0, Direction::VerticalPos, 1).is_err());
        assert!(matches!(
            anim.add_sequence("walk", 0, 0, Direction::VerticalPos, 1),
            Err(DrawError::DuplicateSequence(_))
        ));

        let mut names: Vec<_> = anim.sequence_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["fall", "walk"]);
    }

    #[test]
    fn cells_follow_the_advancing_axis() {
        let mut anim = animation();
        anim.add_sequence("walk", 2, 1, Direction::HorizontalNeg, 3).unwrap();
        anim.add_sequence("climb", 0, 2, Direction::VerticalPos, 3).unwrap();

        let walk = anim.sequence("walk").unwrap();
        assert_eq!(walk.cell(0), (1, 2));
        assert_eq!(walk.cell(2), (3, 2));

        let climb = anim.sequence("climb").unwrap();
        assert_eq!(climb.cell(1), (2, 1));

        assert!(matches!(anim.sequence("run"), Err(DrawError::UnknownSequence(_))));
    }
}
