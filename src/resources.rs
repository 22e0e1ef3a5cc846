//! Long-lived rendering resources shared between producer threads and the render thread.

mod handle;
pub use handle::{FontHandle, ImageHandle};

pub mod font;
pub mod image;
pub mod locator;

pub use font::{FontRegistry, LoadedFont, ResizeOutcome, ResizeTarget};
pub use image::{ImageDrawInfo, ImageRegistry, LoadedImage};
pub use locator::ResourceLocator;
