//! Deferred 2D drawing with shared image and font registries.
//!
//! Producers on any thread submit jobs to a [`DrawContext`]; the thread holding the rendering
//! context draws them in order with [`DrawContext::update_screen`].

pub mod affinity;
pub mod animation;
pub mod config;
pub mod context;
pub mod errors;
pub mod offset;
pub mod render;
pub mod resources;

pub use config::DrawConfig;
pub use context::{DrawContext, UpdateOutcome};
pub use errors::{DrawError, ErrorKind, Result};
pub use render::palette::*;
pub use render::{Color, Coord, DrawJob, JobTicket, Rect};
