//! Image and font management on the context.
//!
//! Registries only do bookkeeping; everything that touches the backend (decoding, textures,
//! opening and closing faces) happens here, with the backend lock taken before any registry
//! lock.

use std::fs;
use std::path::{Path, PathBuf};

use crate::animation::{SpriteSheet, SpriteSheetBuilder};
use crate::context::draw::valid_scale;
use crate::context::DrawContext;
use crate::errors::{DrawError, Result};
use crate::render::backend::SurfaceSize;
use crate::resources::{FontHandle, ImageHandle, LoadedFont, LoadedImage, ResizeOutcome};

impl DrawContext {
    /// Loads an image into a texture. Must run on the render thread (or claims it when
    /// `auto_bind` is set).
    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<ImageHandle> {
        self.track("load_image", || self.load_image_scaled(path.as_ref(), 1.0))
    }

    /// Like [`load_image`](Self::load_image), with the image drawn at `scale`.
    pub fn load_scaled_image(&self, path: impl AsRef<Path>, scale: f32) -> Result<ImageHandle> {
        self.track("load_scaled_image", || self.load_image_scaled(path.as_ref(), scale))
    }

    /// Frees an image. If queued jobs or other holders still reference it, it is destroyed when
    /// the last of them lets go; until then it can no longer be acquired.
    pub fn free_image(&self, image: ImageHandle) -> Result<()> {
        self.track("free_image", || match self.images.request_free(image)? {
            Some(freed) => self.dispose_image(freed),
            None => Ok(()),
        })
    }

    /// Takes a reference on `image`, keeping it alive across a [`free_image`](Self::free_image).
    pub fn acquire_image(&self, image: ImageHandle) -> Result<()> {
        self.track("acquire_image", || self.images.acquire(image))
    }

    pub fn release_image(&self, image: ImageHandle) -> Result<()> {
        self.track("release_image", || self.put_image(image))
    }

    pub fn set_image_scale(&self, image: ImageHandle, scale: f32) -> Result<()> {
        self.track("set_image_scale", || {
            valid_scale(scale)?;
            self.images.set_scale(image, scale)
        })
    }

    pub fn image_scale(&self, image: ImageHandle) -> Result<f32> {
        self.track("image_scale", || self.images.with(image, |i| i.scale))
    }

    /// Size of a loaded image with its scale applied.
    pub fn image_size(&self, image: ImageHandle) -> Result<SurfaceSize> {
        self.track("image_size", || self.images.with(image, |i| i.scaled_size()))
    }

    /// Size of an image file, decoded but not loaded.
    pub fn image_file_size(&self, path: impl AsRef<Path>) -> Result<SurfaceSize> {
        self.track("image_file_size", || {
            let path = self.resolve(path.as_ref())?;
            let bytes = fs::read(&path)?;
            let surface = self
                .lock_backend()?
                .decode_image(&bytes)
                .map_err(|e| DrawError::backend(format!("decoding {}", path.display()), e))?;
            Ok(surface.size())
        })
    }

    /// Starts a sprite sheet over a loaded image. Cells are measured on the unscaled image.
    pub fn sprite_sheet(&self, image: ImageHandle) -> Result<SpriteSheetBuilder> {
        self.track("sprite_sheet", || {
            let size = self.images.with(image, |i| i.size)?;
            Ok(SpriteSheet::builder(image, size))
        })
    }

    /// Opens `name` from the font directory at `size` pixels (`0` means the default size). The
    /// first font loaded becomes the current one.
    pub fn load_font(&self, name: &str, size: u32) -> Result<FontHandle> {
        self.track("load_font", || {
            let size = match size {
                0 => self.config.default_font_size,
                size => size,
            };
            let path = self
                .locator
                .resolve_in(&self.config.font_directory(), name)
                .ok_or_else(|| DrawError::ResourceNotFound(name.to_string()))?;

            let face = self
                .lock_backend()?
                .open_font(&path, size)
                .map_err(|e| DrawError::backend(format!("opening font {}", path.display()), e))?;
            log::debug!("opened font {name} at size {size} from {}", path.display());

            self.fonts
                .insert(LoadedFont::new(name, path, face, size))
                .or_else(|e| {
                    self.lock_backend()?.close_font(face);
                    Err(e)
                })
        })
    }

    /// Makes the font loaded from `name` current.
    pub fn select_font_by_name(&self, name: &str) -> Result<FontHandle> {
        self.track("select_font_by_name", || self.fonts.select_by_name(name))
    }

    pub fn select_font(&self, font: FontHandle) -> Result<()> {
        self.track("select_font", || self.fonts.select(font))
    }

    /// Returns the current font with a reference taken on it. Give it back with
    /// [`release_font`](Self::release_font).
    pub fn current_font(&self) -> Result<FontHandle> {
        self.track("current_font", || self.fonts.acquire_current())
    }

    pub fn release_font(&self, font: FontHandle) -> Result<()> {
        self.track("release_font", || self.put_font(font))
    }

    /// Frees a font that is not current, deferred while it is referenced.
    pub fn free_font(&self, font: FontHandle) -> Result<()> {
        self.track("free_font", || match self.fonts.request_free(font)? {
            Some(freed) => self.dispose_font(freed),
            None => Ok(()),
        })
    }

    pub fn current_font_size(&self) -> Result<u32> {
        self.track("current_font_size", || self.fonts.current_size())
    }

    pub fn current_font_name(&self) -> Result<String> {
        self.track("current_font_name", || self.fonts.current_name())
    }

    /// Changes the size of the current font. Text already queued keeps its old size: a font that
    /// is still referenced is left alone and a new face becomes current instead.
    pub fn set_font_size(&self, size: u32) -> Result<()> {
        self.track("set_font_size", || {
            if size == 0 {
                return Err(DrawError::InvalidArgument("font size must be at least 1".into()));
            }
            let Some(target) = self.fonts.resize_target(size)? else {
                return Ok(());
            };

            let opened = self
                .lock_backend()?
                .open_font(&target.path, size)
                .map_err(|e| DrawError::backend(format!("opening font {}", target.path.display()), e))?;

            match self.fonts.apply_resize(&target, size, opened) {
                Ok(ResizeOutcome::InPlace { old }) => {
                    log::debug!("{}: resized in place to {size}", target.handle);
                    self.lock_backend()?.close_font(old);
                }
                Ok(ResizeOutcome::Forked { new }) => {
                    log::debug!("{}: in use, switched to {new} at size {size}", target.handle);
                }
                Err(e) => {
                    self.lock_backend()?.close_font(opened);
                    return Err(e);
                }
            }
            Ok(())
        })
    }

    /// Pixel size of `text` rendered with the current font.
    pub fn text_size(&self, text: &str) -> Result<SurfaceSize> {
        self.track("text_size", || self.measure_text(text))
    }

    pub(super) fn measure_text(&self, text: &str) -> Result<SurfaceSize> {
        let font = self.fonts.acquire_current()?;
        let measured = self.fonts.backend_font(font).and_then(|face| {
            self.lock_backend()?
                .text_size(face, text)
                .map_err(|e| DrawError::backend("measuring text", e))
        });
        self.put_font(font)?;
        measured
    }

    pub(super) fn resolve(&self, path: &Path) -> Result<PathBuf> {
        self.locator
            .resolve(path)
            .ok_or_else(|| DrawError::ResourceNotFound(path.display().to_string()))
    }

    fn load_image_scaled(&self, path: &Path, scale: f32) -> Result<ImageHandle> {
        valid_scale(scale)?;
        let path = self.resolve(path)?;
        let bytes = fs::read(&path)?;

        let mut affinity = self.affinity.lock()?;
        if self.config.auto_bind {
            self.bind_locked(&mut affinity)?;
        }
        affinity.ensure_current()?;

        let mut backend = self.lock_backend()?;
        let surface = backend
            .decode_image(&bytes)
            .map_err(|e| DrawError::backend(format!("decoding {}", path.display()), e))?;
        let texture = backend
            .create_texture(&surface)
            .map_err(|e| DrawError::backend(format!("creating texture for {}", path.display()), e))?;

        log::debug!("loaded image {} ({}x{})", path.display(), surface.width, surface.height);
        self.images
            .insert(LoadedImage::new(path, surface, texture, scale))
            .inspect_err(|_| backend.destroy_texture(texture))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::fixture::Fixture;
    use crate::errors::DrawError;
    use crate::render::backend::{Primitive, SurfaceSize};
    use crate::render::backends::recording::BackendCall;
    use std::thread;

    fn destroyed(fx: &Fixture) -> usize {
        fx.recorder.count(|c| matches!(c, BackendCall::DestroyTexture(_)))
    }

    fn closed(fx: &Fixture) -> usize {
        fx.recorder.count(|c| matches!(c, BackendCall::CloseFont(_)))
    }

    #[test]
    fn load_and_free_image() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();
        assert_eq!(fx.ctx.image_size(image).unwrap(), SurfaceSize::new(4, 2));
        assert_eq!(fx.ctx.image_scale(image).unwrap(), 1.0);

        fx.ctx.free_image(image).unwrap();
        assert_eq!(destroyed(&fx), 1);
        assert!(matches!(fx.ctx.free_image(image), Err(DrawError::InvalidImageHandle(_))));
        assert!(fx.ctx.last_error().unwrap().contains("Invalid image handle"));
    }

    #[test]
    fn missing_or_broken_images() {
        let fx = Fixture::new();
        assert!(matches!(fx.ctx.load_image("nope.png"), Err(DrawError::ResourceNotFound(_))));

        std::fs::write(fx.dir.path().join("img/broken.png"), b"garbage").unwrap();
        let err = fx.ctx.load_image("broken.png").unwrap_err();
        assert!(matches!(err, DrawError::Backend { .. }));
        assert_eq!(fx.ctx.images.len().unwrap(), 0);
    }

    #[test]
    fn scale_applies_to_size_and_drawing() {
        let fx = Fixture::new();
        let image = fx.ctx.load_scaled_image("tile.png", 0.5).unwrap();
        assert_eq!(fx.ctx.image_size(image).unwrap(), SurfaceSize::new(2, 1));

        fx.ctx.set_image_scale(image, 3.0).unwrap();
        assert!(fx.ctx.set_image_scale(image, -1.0).is_err());
        assert_eq!(fx.ctx.image_size(image).unwrap(), SurfaceSize::new(12, 6));

        fx.ctx.draw_image(image, 0, 0).unwrap();
        fx.recorder.clear();
        fx.ctx.update_screen().unwrap();
        assert!(matches!(
            fx.recorder.draws()[0],
            Primitive::Texture { dst: crate::Rect { w: 12, h: 6, .. }, .. }
        ));

        // sheets measure the unscaled image
        let sheet = fx.ctx.sprite_sheet(image).unwrap().grid(2, 1).build().unwrap();
        assert_eq!((sheet.sprite_width, sheet.sprite_height), (2, 2));
    }

    #[test]
    fn image_file_size_does_not_load() {
        let fx = Fixture::new();
        assert_eq!(fx.ctx.image_file_size("sheet.png").unwrap(), SurfaceSize::new(32, 8));
        assert_eq!(fx.ctx.images.len().unwrap(), 0);
        assert_eq!(fx.recorder.count(|c| matches!(c, BackendCall::CreateTexture(_))), 0);
    }

    #[test]
    fn held_image_outlives_free() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();
        fx.ctx.acquire_image(image).unwrap();

        fx.ctx.free_image(image).unwrap();
        assert_eq!(destroyed(&fx), 0);
        assert!(matches!(fx.ctx.acquire_image(image), Err(DrawError::ResourcePendingFree(_))));

        fx.ctx.release_image(image).unwrap();
        assert_eq!(destroyed(&fx), 1);
        assert!(matches!(fx.ctx.release_image(image), Err(DrawError::InvalidImageHandle(_))));
    }

    #[test]
    fn release_without_acquire_underflows() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();
        assert!(matches!(fx.ctx.release_image(image), Err(DrawError::RefCountUnderflow(_))));
    }

    #[test]
    fn loading_off_the_render_thread_needs_auto_bind() {
        let fx = Fixture::with_config(|c| c.auto_bind = false);
        thread::scope(|s| {
            s.spawn(|| {
                assert!(matches!(fx.ctx.load_image("tile.png"), Err(DrawError::NotRenderThread)));
            });
        });
        assert_eq!(fx.ctx.images.len().unwrap(), 0);
    }

    #[test]
    fn fonts_load_select_and_free() {
        let fx = Fixture::new();
        let default = fx.ctx.fonts.current().unwrap();
        let other = fx.ctx.load_font("Other.ttf", 0).unwrap();

        // loading does not select
        assert_eq!(fx.ctx.current_font_name().unwrap(), "IBMPlexSans-Medium.ttf");
        assert_eq!(fx.ctx.select_font_by_name("Other.ttf").unwrap(), other);
        assert_eq!(fx.ctx.current_font_size().unwrap(), 15);
        assert!(matches!(fx.ctx.select_font_by_name("Nope.ttf"), Err(DrawError::UnknownFont(_))));

        assert!(matches!(fx.ctx.free_font(other), Err(DrawError::InvalidArgument(_))));
        fx.ctx.select_font(default).unwrap();
        fx.ctx.free_font(other).unwrap();
        assert_eq!(closed(&fx), 1);
        assert!(matches!(fx.ctx.select_font(other), Err(DrawError::InvalidFontHandle(_))));

        assert!(matches!(fx.ctx.load_font("Missing.ttf", 12), Err(DrawError::ResourceNotFound(_))));
    }

    #[test]
    fn current_font_holds_a_reference() {
        let fx = Fixture::new();
        let other = fx.ctx.load_font("Other.ttf", 20).unwrap();
        fx.ctx.select_font(other).unwrap();
        let held = fx.ctx.current_font().unwrap();
        assert_eq!(held, other);

        fx.ctx.select_font_by_name("IBMPlexSans-Medium.ttf").unwrap();
        fx.ctx.free_font(other).unwrap();
        assert_eq!(closed(&fx), 0);

        fx.ctx.release_font(held).unwrap();
        assert_eq!(closed(&fx), 1);
    }

    #[test]
    fn unused_font_resizes_in_place() {
        let fx = Fixture::new();
        let font = fx.ctx.fonts.current().unwrap();
        let old = fx.ctx.fonts.backend_font(font).unwrap();

        fx.ctx.set_font_size(15).unwrap();
        assert_eq!(closed(&fx), 0);

        fx.ctx.set_font_size(20).unwrap();
        assert_eq!(fx.ctx.fonts.current().unwrap(), font);
        assert_eq!(fx.ctx.current_font_size().unwrap(), 20);
        assert!(fx.recorder.calls().contains(&BackendCall::CloseFont(old)));
        assert_eq!(fx.ctx.fonts.len().unwrap(), 1);
        assert!(fx.ctx.set_font_size(0).is_err());
    }

    #[test]
    fn resizing_a_queued_font_forks_it() {
        let fx = Fixture::new();
        let original = fx.ctx.fonts.current().unwrap();
        let original_face = fx.ctx.fonts.backend_font(original).unwrap();

        fx.ctx.draw_text("before", 0, 0, crate::BLACK).unwrap();
        fx.ctx.set_font_size(30).unwrap();
        fx.ctx.draw_text("after", 0, 0, crate::BLACK).unwrap();

        let forked = fx.ctx.fonts.current().unwrap();
        assert_ne!(forked, original);
        assert_eq!(fx.ctx.fonts.len().unwrap(), 2);
        assert_eq!(fx.ctx.current_font_size().unwrap(), 30);
        assert_eq!(closed(&fx), 0);

        fx.recorder.clear();
        fx.ctx.update_screen().unwrap();

        let draws = fx.recorder.draws();
        assert!(matches!(&draws[0], Primitive::Text { font, text, .. } if *font == original_face && text == "before"));
        assert!(matches!(&draws[1], Primitive::Text { font, .. } if *font != original_face));
        assert_eq!(fx.recorder.calls().iter().filter(|c| **c == BackendCall::CloseFont(original_face)).count(), 1);
        assert_eq!(fx.ctx.fonts.len().unwrap(), 1);
        assert_eq!(fx.ctx.current_font_name().unwrap(), "IBMPlexSans-Medium.ttf");
    }

    #[test]
    fn text_size_uses_current_font() {
        let fx = Fixture::new();
        assert_eq!(fx.ctx.text_size("ab").unwrap(), SurfaceSize::new(15, 15));
        fx.ctx.set_font_size(40).unwrap();
        assert_eq!(fx.ctx.text_size("ab").unwrap(), SurfaceSize::new(40, 40));
        // measuring leaves no reference behind
        assert_eq!(fx.ctx.fonts.ref_count(fx.ctx.fonts.current().unwrap()).unwrap(), 0);
    }
}
