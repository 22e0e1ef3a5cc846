//! Registry of loaded images.
//!
//! The registry owns every [`LoadedImage`]; callers and queued jobs only hold an
//! [`ImageHandle`] plus a reference count. An entry leaves the registry exactly once, when its
//! count is zero and it has been asked to be freed. The removed entry is handed back to the
//! caller, who destroys its texture with the backend. Nothing in here calls the backend except
//! [`ImageRegistry::recreate_textures`].

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{DrawError, Result};
use crate::render::backend::{Surface, SurfaceSize, TextureId};
use crate::resources::ImageHandle;

#[derive(Debug)]
pub struct LoadedImage {
    pub handle: ImageHandle,
    /// Path the image was loaded from
    pub path: PathBuf,
    /// Decoded pixels, kept so the texture can be rebuilt for a new renderer
    pub surface: Surface,
    pub texture: TextureId,
    /// Unscaled size in pixels
    pub size: SurfaceSize,
    pub scale: f32,
    ref_count: usize,
    pending_free: bool,
}

impl LoadedImage {
    pub fn new(path: PathBuf, surface: Surface, texture: TextureId, scale: f32) -> Self {
        let size = surface.size();
        Self {
            handle: ImageHandle::new(),
            path,
            surface,
            texture,
            size,
            scale,
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

    /// Size after applying the image's scale.
    pub fn scaled_size(&self) -> SurfaceSize {
        SurfaceSize::new(
            (self.size.width as f32 * self.scale) as u32,
            (self.size.height as f32 * self.scale) as u32,
        )
    }
}

/// What the render thread needs to draw an image, copied out of the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDrawInfo {
    pub texture: TextureId,
    pub size: SurfaceSize,
    pub scale: f32,
}

#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Mutex<Vec<LoadedImage>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LoadedImage>>> {
        self.images.lock().map_err(|_| DrawError::Poisoned("image registry"))
    }

    /// Adds a freshly loaded image with a reference count of zero.
    pub fn insert(&self, image: LoadedImage) -> Result<ImageHandle> {
        let mut images = self.lock()?;
        images
            .try_reserve(1)
            .map_err(|e| DrawError::Allocation(format!("image node: {e}")))?;

        let handle = image.handle;
        images.push(image);
        Ok(handle)
    }

    pub fn contains(&self, handle: ImageHandle) -> Result<bool> {
        Ok(self.lock()?.iter().any(|i| i.handle == handle))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn ref_count(&self, handle: ImageHandle) -> Result<usize> {
        self.with(handle, |i| i.ref_count)
    }

    /// Runs `f` on the entry for `handle` under the registry lock.
    pub fn with<R>(&self, handle: ImageHandle, f: impl FnOnce(&LoadedImage) -> R) -> Result<R> {
        let images = self.lock()?;
        let image = images
            .iter()
            .find(|i| i.handle == handle)
            .ok_or(DrawError::InvalidImageHandle(handle))?;
        Ok(f(image))
    }

    fn with_mut<R>(&self, handle: ImageHandle, f: impl FnOnce(&mut LoadedImage) -> R) -> Result<R> {
        let mut images = self.lock()?;
        let image = images
            .iter_mut()
            .find(|i| i.handle == handle)
            .ok_or(DrawError::InvalidImageHandle(handle))?;
        Ok(f(image))
    }

    pub fn draw_info(&self, handle: ImageHandle) -> Result<ImageDrawInfo> {
        self.with(handle, |i| ImageDrawInfo {
            texture: i.texture,
            size: i.size,
            scale: i.scale,
        })
    }

    pub fn set_scale(&self, handle: ImageHandle, scale: f32) -> Result<()> {
        self.with_mut(handle, |i| i.scale = scale)
    }

    /// Takes one reference. Images that were asked to be freed cannot be acquired again.
    pub fn acquire(&self, handle: ImageHandle) -> Result<()> {
        self.with_mut(handle, |i| {
            if i.pending_free {
                return Err(DrawError::ResourcePendingFree(handle.to_string()));
            }
            i.ref_count += 1;
            Ok(())
        })?
    }

    /// Gives back one reference. When this was the last one and the image is pending free, the
    /// entry is unlinked and returned so the caller can destroy it.
    pub fn release(&self, handle: ImageHandle) -> Result<Option<LoadedImage>> {
        let mut images = self.lock()?;
        let idx = images
            .iter()
            .position(|i| i.handle == handle)
            .ok_or(DrawError::InvalidImageHandle(handle))?;

        let image = &mut images[idx];
        if image.ref_count == 0 {
            return Err(DrawError::RefCountUnderflow(handle.to_string()));
        }
        image.ref_count -= 1;

        if image.ref_count == 0 && image.pending_free {
            log::debug!("{handle}: last reference released, destroying deferred image");
            return Ok(Some(images.remove(idx)));
        }
        Ok(None)
    }

    /// Unlinks and returns the image when nobody references it, otherwise marks it pending free
    /// and returns `None`; the final [`release`](Self::release) will hand it back instead.
    pub fn request_free(&self, handle: ImageHandle) -> Result<Option<LoadedImage>> {
        let mut images = self.lock()?;
        let idx = images
            .iter()
            .position(|i| i.handle == handle)
            .ok_or(DrawError::InvalidImageHandle(handle))?;

        if images[idx].ref_count == 0 {
            return Ok(Some(images.remove(idx)));
        }

        log::debug!(
            "{handle}: free requested with {} reference(s) outstanding, deferring",
            images[idx].ref_count
        );
        images[idx].pending_free = true;
        Ok(None)
    }

    /// Rebuilds every texture with `create`, for a renderer that was just recreated. Stops at the
    /// first failure.
    pub fn recreate_textures(
        &self,
        mut create: impl FnMut(&Surface) -> anyhow::Result<TextureId>,
    ) -> Result<usize> {
        let mut images = self.lock()?;
        for image in images.iter_mut() {
            image.texture = create(&image.surface).map_err(|e| {
                DrawError::backend(format!("recreating texture for {}", image.path.display()), e)
            })?;
        }
        Ok(images.len())
    }

    /// Unlinks every image regardless of reference counts. Used at teardown.
    pub fn take_all(&self) -> Vec<LoadedImage> {
        let mut images = self
            .images
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *images)
    }
}
