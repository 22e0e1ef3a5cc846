use std::sync::{Mutex, MutexGuard};

use crate::errors::{DrawError, Result};
use crate::render::Coord;

/// Pixel offset added to the coordinates of every job when it is dispatched. Clearing the screen
/// is not affected.
#[derive(Debug, Default)]
pub struct GlobalOffset {
    offset: Mutex<Coord>,
}

impl GlobalOffset {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Coord>> {
        self.offset.lock().map_err(|_| DrawError::Poisoned("global offset"))
    }

    pub fn get(&self) -> Result<Coord> {
        Ok(*self.lock()?)
    }

    pub fn x(&self) -> Result<i32> {
        Ok(self.lock()?.x)
    }

    pub fn y(&self) -> Result<i32> {
        Ok(self.lock()?.y)
    }

    pub fn set(&self, x: i32, y: i32) -> Result<()> {
        *self.lock()? = Coord::new(x, y);
        Ok(())
    }

    pub fn set_x(&self, x: i32) -> Result<()> {
        self.lock()?.x = x;
        Ok(())
    }

    pub fn set_y(&self, y: i32) -> Result<()> {
        self.lock()?.y = y;
        Ok(())
    }
}
