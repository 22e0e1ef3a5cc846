pub mod backend;

/// Drawing backends.
pub mod backends {
    pub mod null;
    pub mod recording;
}

mod color;
pub use color::*;

pub mod dispatch;

mod job;
pub use job::{Coord, DrawJob, Rect};

pub mod queue;
pub use queue::{JobQueue, JobTicket, QueuedJob};
