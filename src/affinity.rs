//! Which thread may touch the rendering context.
//!
//! The context is not protected by a lock of its own. Instead exactly one thread at a time is
//! its owner, and every renderer-dependent call checks ownership first. Moving ownership to a
//! new thread rebuilds the renderer on that thread through the caller-provided rebind step.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::errors::{DrawError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AffinityState {
    /// No thread holds the rendering context.
    #[default]
    Unbound,
    Bound(ThreadId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The caller already held the context; nothing was rebuilt.
    AlreadyBound,
    /// The context moved to the caller from `previous`.
    Rebound { previous: Option<ThreadId> },
}

#[derive(Debug, Default)]
pub struct RenderAffinity {
    state: Mutex<AffinityState>,
}

/// Holds the affinity lock. While a guard that passed [`ensure_current`](Self::ensure_current)
/// is alive no other thread can take the context over.
pub struct AffinityGuard<'a> {
    state: MutexGuard<'a, AffinityState>,
}

impl RenderAffinity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> Result<AffinityGuard<'_>> {
        let state = self.state.lock().map_err(|_| DrawError::Poisoned("render affinity"))?;
        Ok(AffinityGuard { state })
    }

    pub fn state(&self) -> Result<AffinityState> {
        Ok(*self.lock()?.state)
    }

    pub fn is_current_thread(&self) -> Result<bool> {
        Ok(self.lock()?.is_current_thread())
    }

    /// Claims the rendering context for the calling thread. `rebind` runs only when ownership
    /// actually moves.
    pub fn bind_current_thread(
        &self,
        rebind: impl FnOnce(Option<ThreadId>) -> Result<()>,
    ) -> Result<BindOutcome> {
        self.lock()?.bind(rebind)
    }

    /// Drops ownership without rebuilding anything. Used at teardown.
    pub fn unbind(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = AffinityState::Unbound;
    }
}

impl AffinityGuard<'_> {
    pub fn state(&self) -> AffinityState {
        *self.state
    }

    pub fn is_current_thread(&self) -> bool {
        *self.state == AffinityState::Bound(thread::current().id())
    }

    pub fn ensure_current(&self) -> Result<()> {
        if self.is_current_thread() {
            Ok(())
        } else {
            Err(DrawError::NotRenderThread)
        }
    }

    /// See [`RenderAffinity::bind_current_thread`]. A failed rebind leaves the context unbound,
    /// since the previous owner has already lost it.
    pub fn bind(&mut self, rebind: impl FnOnce(Option<ThreadId>) -> Result<()>) -> Result<BindOutcome> {
        let me = thread::current().id();
        let previous = match *self.state {
            AffinityState::Bound(owner) if owner == me => return Ok(BindOutcome::AlreadyBound),
            AffinityState::Bound(owner) => Some(owner),
            AffinityState::Unbound => None,
        };

        log::debug!("moving rendering context from {previous:?} to {me:?}");
        *self.state = AffinityState::Unbound;
        rebind(previous)?;
        *self.state = AffinityState::Bound(me);

        Ok(BindOutcome::Rebound { previous })
    }
}
