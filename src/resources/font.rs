//! Registry of loaded fonts.
//!
//! Same lifetime rules as images: a font is destroyed once its reference count is zero and it is
//! pending free. On top of that the registry tracks the *current* font used for text jobs.
//! Changing the current font's size never mutates a font some queued job still references: an
//! unused font is resized in place, a used one is retired and replaced by a fresh face.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{DrawError, Result};
use crate::render::backend::BackendFont;
use crate::resources::FontHandle;

#[derive(Debug)]
pub struct LoadedFont {
    pub handle: FontHandle,
    /// File name of the font, e.g. `IBMPlexSans-Medium.ttf`
    pub name: String,
    pub path: PathBuf,
    pub font: BackendFont,
    pub size: u32,
    ref_count: usize,
    pending_free: bool,
}

impl LoadedFont {
    pub fn new(name: impl Into<String>, path: PathBuf, font: BackendFont, size: u32) -> Self {
        Self {
            handle: FontHandle::new(),
            name: name.into(),
            path,
            font,
            size,
            ref_count: 0,
            pending_free: false,
        }
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn is_pending_free(&self) -> bool {
        self.pending_free
    }
}

/// Result of [`FontRegistry::apply_resize`].
#[derive(Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// The font was unused and now points at the new face; the old face must be closed.
    InPlace { old: BackendFont },
    /// The font was in use. It is now pending free and `new` is the current font.
    Forked { new: FontHandle },
}

/// What [`FontRegistry::resize_target`] needs the backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeTarget {
    pub handle: FontHandle,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct FontState {
    fonts: Vec<LoadedFont>,
    current: Option<FontHandle>,
}

impl FontState {
    fn index_of(&self, handle: FontHandle) -> Result<usize> {
        self.fonts
            .iter()
            .position(|f| f.handle == handle)
            .ok_or(DrawError::InvalidFontHandle(handle))
    }

    fn current_index(&self) -> Result<usize> {
        let current = self.current.ok_or(DrawError::NoCurrentFont)?;
        self.index_of(current)
    }
}

#[derive(Debug, Default)]
pub struct FontRegistry {
    state: Mutex<FontState>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, FontState>> {
        self.state.lock().map_err(|_| DrawError::Poisoned("font registry"))
    }

    /// Appends a font. The first font ever inserted becomes the current one.
    pub fn insert(&self, font: LoadedFont) -> Result<FontHandle> {
        let mut state = self.lock()?;
        state
            .fonts
            .try_reserve(1)
            .map_err(|e| DrawError::Allocation(format!("font node: {e}")))?;

        let handle = font.handle;
        state.fonts.push(font);
        if state.current.is_none() {
            state.current = Some(handle);
        }
        Ok(handle)
    }

    pub fn contains(&self, handle: FontHandle) -> Result<bool> {
        Ok(self.lock()?.fonts.iter().any(|f| f.handle == handle))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.fonts.len())
    }

    pub fn ref_count(&self, handle: FontHandle) -> Result<usize> {
        let state = self.lock()?;
        let idx = state.index_of(handle)?;
        Ok(state.fonts[idx].ref_count)
    }

    pub fn current(&self) -> Result<FontHandle> {
        self.lock()?.current.ok_or(DrawError::NoCurrentFont)
    }

    pub fn current_size(&self) -> Result<u32> {
        let state = self.lock()?;
        let idx = state.current_index()?;
        Ok(state.fonts[idx].size)
    }

    pub fn current_name(&self) -> Result<String> {
        let state = self.lock()?;
        let idx = state.current_index()?;
        Ok(state.fonts[idx].name.clone())
    }

    /// Selects the first live font loaded from `name`.
    pub fn select_by_name(&self, name: &str) -> Result<FontHandle> {
        let mut state = self.lock()?;
        let handle = state
            .fonts
            .iter()
            .find(|f| f.name == name && !f.pending_free)
            .map(|f| f.handle)
            .ok_or_else(|| DrawError::UnknownFont(name.to_string()))?;
        state.current = Some(handle);
        Ok(handle)
    }

    pub fn select(&self, handle: FontHandle) -> Result<()> {
        let mut state = self.lock()?;
        let idx = state.index_of(handle)?;
        if state.fonts[idx].pending_free {
            return Err(DrawError::ResourcePendingFree(handle.to_string()));
        }
        state.current = Some(handle);
        Ok(())
    }

    /// Takes a reference on the current font and returns it.
    pub fn acquire_current(&self) -> Result<FontHandle> {
        let mut state = self.lock()?;
        let idx = state.current_index()?;
        let font = &mut state.fonts[idx];
        font.ref_count += 1;
        Ok(font.handle)
    }

    pub fn acquire(&self, handle: FontHandle) -> Result<()> {
        let mut state = self.lock()?;
        let idx = state.index_of(handle)?;
        let font = &mut state.fonts[idx];
        if font.pending_free {
            return Err(DrawError::ResourcePendingFree(handle.to_string()));
        }
        font.ref_count += 1;
        Ok(())
    }

    pub fn backend_font(&self, handle: FontHandle) -> Result<BackendFont> {
        let state = self.lock()?;
        let idx = state.index_of(handle)?;
        Ok(state.fonts[idx].font)
    }

    /// Gives back one reference, returning the unlinked font when it was the last reference to
    /// a font pending free.
    pub fn release(&self, handle: FontHandle) -> Result<Option<LoadedFont>> {
        let mut state = self.lock()?;
        let idx = state.index_of(handle)?;
        let font = &mut state.fonts[idx];
        if font.ref_count == 0 {
            return Err(DrawError::RefCountUnderflow(handle.to_string()));
        }
        font.ref_count -= 1;

        if font.ref_count == 0 && font.pending_free {
            log::debug!("{handle}: last reference released, destroying deferred font");
            return Ok(Some(state.fonts.remove(idx)));
        }
        Ok(None)
    }

    /// Frees a font that is not the current one; see [`ImageRegistry::request_free`] for the
    /// deferral rules.
    ///
    /// [`ImageRegistry::request_free`]: crate::resources::ImageRegistry::request_free
    pub fn request_free(&self, handle: FontHandle) -> Result<Option<LoadedFont>> {
        let mut state = self.lock()?;
        let idx = state.index_of(handle)?;
        if state.current == Some(handle) {
            return Err(DrawError::InvalidArgument(
                "cannot free the current font, select another one first".into(),
            ));
        }

        if state.fonts[idx].ref_count == 0 {
            return Ok(Some(state.fonts.remove(idx)));
        }
        state.fonts[idx].pending_free = true;
        Ok(None)
    }

    /// Returns what must be opened to give the current font `size`, or `None` when it already
    /// has that size.
    pub fn resize_target(&self, size: u32) -> Result<Option<ResizeTarget>> {
        let state = self.lock()?;
        let idx = state.current_index()?;
        let font = &state.fonts[idx];
        if font.size == size {
            return Ok(None);
        }
        Ok(Some(ResizeTarget {
            handle: font.handle,
            name: font.name.clone(),
            path: font.path.clone(),
        }))
    }

    /// Installs `opened` (the target's face at `size`) either in place or as a new current font.
    pub fn apply_resize(
        &self,
        target: &ResizeTarget,
        size: u32,
        opened: BackendFont,
    ) -> Result<ResizeOutcome> {
        let mut state = self.lock()?;
        let idx = state.index_of(target.handle)?;

        let font = &mut state.fonts[idx];
        if font.ref_count == 0 {
            let old = std::mem::replace(&mut font.font, opened);
            font.size = size;
            return Ok(ResizeOutcome::InPlace { old });
        }

        state
            .fonts
            .try_reserve(1)
            .map_err(|e| DrawError::Allocation(format!("font node: {e}")))?;
        state.fonts[idx].pending_free = true;

        let fork = LoadedFont::new(target.name.clone(), target.path.clone(), opened, size);
        let new = fork.handle;
        state.fonts.push(fork);
        state.current = Some(new);
        Ok(ResizeOutcome::Forked { new })
    }

    /// Unlinks every font regardless of reference counts. Used at teardown.
    pub fn take_all(&self) -> Vec<LoadedFont> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current = None;
        std::mem::take(&mut state.fonts)
    }
}
