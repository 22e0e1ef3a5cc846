//! The shared FIFO of pending draw jobs.
//!
//! Any thread may [`submit`](JobQueue::submit); only the thread holding the rendering context
//! drains. Each push and each pop takes the lock on its own, so a producer never waits for more
//! than one append or one pop, however long the render thread spends drawing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{DrawError, Result};
use crate::render::DrawJob;

/// Position of a job in the global submission order. Tickets strictly increase across all
/// producer threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobTicket(pub u64);

#[derive(Debug)]
pub struct QueuedJob {
    pub ticket: JobTicket,
    pub job: DrawJob,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: VecDeque<QueuedJob>,
    next_ticket: u64,
}

#[derive(Debug, Default)]
pub struct JobQueue {
    inner: Mutex<Inner>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| DrawError::Poisoned("job queue"))
    }

    /// Appends `job` at the tail. Never blocks on rendering.
    pub fn submit(&self, job: DrawJob) -> Result<JobTicket> {
        let mut inner = self.lock()?;
        inner
            .jobs
            .try_reserve(1)
            .map_err(|e| DrawError::Allocation(format!("{} job: {e}", job.kind())))?;

        let ticket = JobTicket(inner.next_ticket);
        inner.next_ticket += 1;
        inner.jobs.push_back(QueuedJob { ticket, job });

        Ok(ticket)
    }

    pub fn has_pending(&self) -> Result<bool> {
        Ok(!self.lock()?.jobs.is_empty())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.jobs.len())
    }

    /// Removes the oldest job.
    pub fn pop(&self) -> Result<Option<QueuedJob>> {
        Ok(self.lock()?.jobs.pop_front())
    }

    /// Pops every job currently queued, oldest first. Jobs submitted while draining are picked
    /// up as well; each pop locks separately.
    pub fn drain_all(&self) -> Result<Vec<QueuedJob>> {
        let mut out = Vec::new();
        while let Some(job) = self.pop()? {
            out.push(job);
        }
        Ok(out)
    }
}
