use std::time::{Duration, Instant};

/// Caps how often a frame may be presented.
#[derive(Debug, Default)]
pub struct FrameLimiter {
    period: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FrameLimiter {
    /// A limiter allowing `fps` frames per second, or no limit at all for `None`.
    pub fn new(fps: Option<u32>) -> Self {
        Self {
            period: fps.map(|fps| Duration::from_secs(1) / fps.max(1)),
            last_frame: None,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Returns whether a frame may start at `now`, and if so remembers `now` as its start.
    pub fn try_start(&mut self, now: Instant) -> bool {
        let Some(period) = self.period else {
            return true;
        };
        if let Some(last) = self.last_frame {
            if now.saturating_duration_since(last) < period {
                return false;
            }
        }
        self.last_frame = Some(now);
        true
    }
}
