//! Sprite sheets and time-driven animation over them.

pub mod instance;
pub mod sequence;
pub mod spritesheet;

pub use instance::SequenceInstance;
pub use sequence::{Animation, AnimationSequence, Direction};
pub use spritesheet::{SpriteSheet, SpriteSheetBuilder};
