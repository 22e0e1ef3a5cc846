use std::sync::Arc;

use crate::animation::{Animation, AnimationSequence};
use crate::errors::{DrawError, Result};
use crate::render::Rect;
use crate::resources::ImageHandle;

/// Playback cursor over one sequence of an [`Animation`].
///
/// Time only moves through [`tick`](Self::tick), which takes the milliseconds elapsed since the
/// previous tick. Whole frame periods advance the frame; the remainder carries over to the next
/// tick.
#[derive(Debug, Clone)]
pub struct SequenceInstance {
    animation: Arc<Animation>,
    sequence: AnimationSequence,
    frame_period_ms: u32,
    /// Index into the sequence, `0..frames`
    current_frame: u32,
    elapsed_ms: u64,
}

impl SequenceInstance {
    pub fn new(animation: Arc<Animation>, sequence: &str, frame_period_ms: u32) -> Result<Self> {
        if frame_period_ms == 0 {
            return Err(DrawError::ZeroFramePeriod);
        }
        let sequence = animation.sequence(sequence)?.clone();

        Ok(Self {
            animation,
            sequence,
            frame_period_ms,
            current_frame: 0,
            elapsed_ms: 0,
        })
    }

    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    pub fn sequence(&self) -> &AnimationSequence {
        &self.sequence
    }

    pub fn image(&self) -> ImageHandle {
        self.animation.sheet().image
    }

    pub fn frame_period_ms(&self) -> u32 {
        self.frame_period_ms
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Time accumulated since the last frame change.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Back to the first cell of the sequence with no accumulated time.
    pub fn reset(&mut self) {
        self.current_frame = 0;
        self.elapsed_ms = 0;
    }

    /// Adds `delta_ms` and steps the frame once per whole period elapsed, wrapping around the
    /// sequence. Returns the number of periods consumed.
    pub fn tick(&mut self, delta_ms: u32) -> u64 {
        self.elapsed_ms += u64::from(delta_ms);

        let period = u64::from(self.frame_period_ms);
        let periods = self.elapsed_ms / period;
        if periods == 0 {
            return 0;
        }
        self.elapsed_ms -= periods * period;

        let frames = u64::from(self.sequence.frames);
        let step = periods % frames;
        let current = u64::from(self.current_frame);
        let next = if self.sequence.direction.is_reverse() {
            (current + frames - step) % frames
        } else {
            (current + step) % frames
        };
        // next < frames, which came from a u32
        self.current_frame = next as u32;

        periods
    }

    /// Grid cell `(column, row)` of the current frame.
    pub fn cell(&self) -> (u32, u32) {
        self.sequence.cell(self.current_frame)
    }

    /// Pixel rectangle of the current frame inside the sheet's image.
    pub fn source_rect(&self) -> Result<Rect> {
        let (column, row) = self.cell();
        self.animation.sheet().cell_rect(column, row)
    }
}
