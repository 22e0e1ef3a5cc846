//! The drawing context.
//!
//! [`DrawContext`] owns the job queue, the resource registries, the global offset and the
//! backend. It is `Sync`: producer threads share it (usually behind an `Arc`) and submit jobs,
//! while whichever thread holds the rendering context drains them with
//! [`update_screen`](DrawContext::update_screen).
//!
//! Locks are always taken in the order affinity, backend, image/font registry. The queue, the
//! offset, the retired list, the frame limiter and the last-error slot are leaves: nothing else
//! is locked while one of them is held.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::affinity::{AffinityGuard, BindOutcome, RenderAffinity};
use crate::config::DrawConfig;
use crate::errors::{DrawError, LastError, Result};
use crate::offset::GlobalOffset;
use crate::render::backend::DrawBackend;
use crate::render::dispatch::DispatchTarget;
use crate::render::{DrawJob, JobQueue};
use crate::resources::{FontHandle, FontRegistry, ImageHandle, ImageRegistry, LoadedFont, LoadedImage, ResourceLocator};

mod draw;
mod limiter;
mod resources;

#[cfg(test)]
mod fixture;

pub use limiter::FrameLimiter;

/// What a call to [`DrawContext::update_screen`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// `jobs` jobs were drawn and the frame was presented.
    Presented { jobs: usize },
    /// The queue was empty; nothing was presented.
    NothingToDraw,
    /// The previous frame is too recent for the configured frame limit. Jobs stay queued.
    Throttled,
}

pub struct DrawContext {
    config: DrawConfig,
    locator: ResourceLocator,
    affinity: RenderAffinity,
    backend: Mutex<Box<dyn DrawBackend>>,
    images: ImageRegistry,
    fonts: FontRegistry,
    queue: JobQueue,
    offset: GlobalOffset,
    /// Images freed away from the render thread, destroyed by the next `update_screen`
    retired: Mutex<Vec<LoadedImage>>,
    limiter: Mutex<FrameLimiter>,
    last_error: LastError,
}

impl DrawContext {
    /// Creates a context, loads and selects the default font and binds the calling thread.
    ///
    /// ```no_run
    /// # use gfx_draw::{DrawConfig, DrawContext};
    /// let backend = gfx_draw::render::backends::null::NullBackend::new().unwrap();
    /// let ctx = DrawContext::new(DrawConfig::default(), Box::new(backend)).unwrap();
    /// ```
    pub fn new(config: DrawConfig, backend: Box<dyn DrawBackend>) -> Result<Self> {
        if config.fps_limit == Some(0) {
            return Err(DrawError::InvalidArgument("frame limit must be at least 1 fps".into()));
        }
        log::debug!(
            "creating draw context '{}' ({}x{}) on {} backend",
            config.window_title,
            config.screen_width,
            config.screen_height,
            backend.name()
        );

        let ctx = Self {
            locator: ResourceLocator::new(&config.resources_dir),
            affinity: RenderAffinity::new(),
            backend: Mutex::new(backend),
            images: ImageRegistry::new(),
            fonts: FontRegistry::new(),
            queue: JobQueue::new(),
            offset: GlobalOffset::new(),
            retired: Mutex::new(Vec::new()),
            limiter: Mutex::new(FrameLimiter::new(config.fps_limit)),
            last_error: LastError::new(),
            config,
        };

        let default_font = ctx.config.default_font.clone();
        ctx.load_font(&default_font, ctx.config.default_font_size)?;
        ctx.bind_current_thread()?;

        Ok(ctx)
    }

    pub fn config(&self) -> &DrawConfig {
        &self.config
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Message of the most recent failed call, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.get()
    }

    pub fn pending_jobs(&self) -> Result<usize> {
        self.track("pending_jobs", || self.queue.len())
    }

    /// Makes the calling thread the owner of the rendering context. When ownership moves, the
    /// renderer is rebuilt on this thread and every loaded image gets a new texture.
    pub fn bind_current_thread(&self) -> Result<BindOutcome> {
        self.track("bind_current_thread", || {
            let mut affinity = self.affinity.lock()?;
            self.bind_locked(&mut affinity)
        })
    }

    pub fn is_render_thread(&self) -> Result<bool> {
        self.affinity.is_current_thread()
    }

    /// Draws every queued job in submission order and presents the frame.
    ///
    /// With `auto_bind` the calling thread first takes over the rendering context; otherwise a
    /// caller that does not own it gets [`DrawError::NotRenderThread`]. Either way no job is
    /// consumed unless the caller owns the context. A failing job aborts the pass: jobs drawn
    /// so far stay drawn, the rest stay queued for the next call.
    pub fn update_screen(&self) -> Result<UpdateOutcome> {
        self.track("update_screen", || {
            let mut affinity = self.affinity.lock()?;
            if self.config.auto_bind {
                self.bind_locked(&mut affinity)?;
            }
            affinity.ensure_current()?;

            let mut backend = self.lock_backend()?;
            self.destroy_retired(&mut **backend)?;

            if !self.queue.has_pending()? {
                return Ok(UpdateOutcome::NothingToDraw);
            }
            if !self.lock_limiter()?.try_start(Instant::now()) {
                return Ok(UpdateOutcome::Throttled);
            }

            let mut drawn = 0;
            loop {
                let offset = self.offset.get()?;
                let Some(queued) = self.queue.pop()? else {
                    break;
                };

                let result = DispatchTarget {
                    backend: &mut **backend,
                    images: &self.images,
                    fonts: &self.fonts,
                }
                .dispatch(&queued.job, offset);
                let released = self.release_job_refs(&queued.job, &mut **backend);

                result?;
                released?;
                drawn += 1;
            }

            backend
                .present()
                .map_err(|e| DrawError::backend("presenting frame", e))?;
            Ok(UpdateOutcome::Presented { jobs: drawn })
        })
    }

    /// Runs `f`, logging and remembering its error if it fails.
    fn track<T>(&self, op: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().inspect_err(|e| {
            log::error!("{op} failed: {e}");
            self.last_error.set(e);
        })
    }

    fn lock_backend(&self) -> Result<MutexGuard<'_, Box<dyn DrawBackend>>> {
        self.backend.lock().map_err(|_| DrawError::Poisoned("backend"))
    }

    fn lock_limiter(&self) -> Result<MutexGuard<'_, FrameLimiter>> {
        self.limiter.lock().map_err(|_| DrawError::Poisoned("frame limiter"))
    }

    fn bind_locked(&self, affinity: &mut AffinityGuard<'_>) -> Result<BindOutcome> {
        affinity.bind(|previous| {
            let mut backend = self.lock_backend()?;
            backend.make_current().map_err(DrawError::Bind)?;
            backend.recreate_renderer().map_err(DrawError::Bind)?;

            // retired textures died with the old renderer
            let stale = std::mem::take(&mut *self.retired.lock().map_err(|_| DrawError::Poisoned("retired images"))?);
            if !stale.is_empty() {
                log::debug!("dropping {} image(s) retired under the previous renderer", stale.len());
            }

            let rebuilt = self
                .images
                .recreate_textures(|surface| backend.create_texture(surface))
                .map_err(|e| DrawError::Bind(e.into()))?;
            log::debug!("rendering context taken over from {previous:?}, {rebuilt} texture(s) rebuilt");
            Ok(())
        })
    }

    /// Gives back the references `job` took at submission, destroying whatever that frees.
    fn release_job_refs(&self, job: &DrawJob, backend: &mut dyn DrawBackend) -> Result<()> {
        if let Some(image) = job.image_ref() {
            if let Some(freed) = self.images.release(image)? {
                backend.destroy_texture(freed.texture);
            }
        }
        if let Some(font) = job.font_ref() {
            if let Some(freed) = self.fonts.release(font)? {
                backend.close_font(freed.font);
            }
        }
        Ok(())
    }

    fn destroy_retired(&self, backend: &mut dyn DrawBackend) -> Result<()> {
        let retired = std::mem::take(&mut *self.retired.lock().map_err(|_| DrawError::Poisoned("retired images"))?);
        for image in retired {
            log::debug!("{}: destroying retired image {}", image.handle, image.path.display());
            backend.destroy_texture(image.texture);
        }
        Ok(())
    }

    /// Destroys an image that just left the registry. Textures belong to the render thread, so
    /// anywhere else the image is parked until the next `update_screen`.
    fn dispose_image(&self, image: LoadedImage) -> Result<()> {
        let affinity = self.affinity.lock()?;
        if affinity.is_current_thread() {
            log::debug!("{}: destroying image {}", image.handle, image.path.display());
            self.lock_backend()?.destroy_texture(image.texture);
        } else {
            log::debug!("{}: retiring image freed off the render thread", image.handle);
            self.retired
                .lock()
                .map_err(|_| DrawError::Poisoned("retired images"))?
                .push(image);
        }
        Ok(())
    }

    fn dispose_font(&self, font: LoadedFont) -> Result<()> {
        log::debug!("{}: closing font {} at size {}", font.handle, font.name, font.size);
        self.lock_backend()?.close_font(font.font);
        Ok(())
    }

    fn put_image(&self, image: ImageHandle) -> Result<()> {
        match self.images.release(image)? {
            Some(freed) => self.dispose_image(freed),
            None => Ok(()),
        }
    }

    fn put_font(&self, font: FontHandle) -> Result<()> {
        match self.fonts.release(font)? {
            Some(freed) => self.dispose_font(freed),
            None => Ok(()),
        }
    }
}

impl Drop for DrawContext {
    /// Undrawn jobs give back their references, then every remaining image and font is
    /// destroyed, whatever its reference count.
    fn drop(&mut self) {
        let backend = self.backend.get_mut().unwrap_or_else(PoisonError::into_inner);

        let mut discarded = 0;
        while let Ok(Some(queued)) = self.queue.pop() {
            discarded += 1;
            if let Some(Ok(Some(freed))) = queued.job.image_ref().map(|h| self.images.release(h)) {
                backend.destroy_texture(freed.texture);
            }
            if let Some(Ok(Some(freed))) = queued.job.font_ref().map(|h| self.fonts.release(h)) {
                backend.close_font(freed.font);
            }
        }
        if discarded > 0 {
            log::warn!("draw context dropped with {discarded} undrawn job(s)");
        }

        let retired = std::mem::take(self.retired.get_mut().unwrap_or_else(PoisonError::into_inner));
        for image in retired.into_iter().chain(self.images.take_all()) {
            if image.ref_count() > 0 {
                log::warn!("{}: destroyed with {} reference(s) outstanding", image.handle, image.ref_count());
            }
            backend.destroy_texture(image.texture);
        }
        for font in self.fonts.take_all() {
            backend.close_font(font.font);
        }

        self.affinity.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::Fixture;
    use super::*;
    use crate::affinity::AffinityState;
    use crate::render::backend::Primitive;
    use crate::render::backends::recording::BackendCall;
    use crate::render::{Color, Coord, Rect};
    use crate::ErrorKind;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_loads_default_font_and_binds() {
        let fx = Fixture::new();
        let calls = fx.recorder.calls();

        assert!(calls.iter().any(|c| matches!(c, BackendCall::OpenFont { size: 15, .. })));
        assert!(calls.contains(&BackendCall::MakeCurrent(thread::current().id())));
        assert!(fx.ctx.is_render_thread().unwrap());
        assert_eq!(fx.ctx.current_font_size().unwrap(), 15);
        assert_eq!(fx.ctx.current_font_name().unwrap(), "IBMPlexSans-Medium.ttf");
    }

    #[test]
    fn missing_default_font_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = DrawConfig {
            resources_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let (backend, _recorder) = crate::render::backends::recording::RecordingBackend::new();
        let err = DrawContext::new(config, Box::new(backend)).err().unwrap();
        assert!(matches!(err, DrawError::ResourceNotFound(_)));
    }

    #[test]
    fn draws_in_submission_order_and_presents() {
        let fx = Fixture::new();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::NothingToDraw);

        fx.recorder.clear();
        fx.ctx.clear(crate::WHITE).unwrap();
        fx.ctx.draw_circle(10, 10, 5, crate::RED).unwrap();
        fx.ctx.draw_box(1, 2, 3, 4, crate::BLUE).unwrap();
        assert_eq!(fx.ctx.pending_jobs().unwrap(), 3);

        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 3 });
        assert_eq!(fx.ctx.pending_jobs().unwrap(), 0);

        let names: Vec<_> = fx.recorder.draws().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["clear", "circle", "rect"]);
        assert_eq!(fx.recorder.calls().last(), Some(&BackendCall::Present));
    }

    #[test]
    fn global_offset_applies_to_both_axes() {
        let fx = Fixture::new();
        fx.ctx.set_global_offset(100, 50).unwrap();

        fx.ctx.clear(crate::BLACK).unwrap();
        fx.ctx.draw_ellipse(1, 2, 3, 4, crate::RED).unwrap();
        fx.ctx.draw_arrow(0, 0, 10, 0, 2, 1, crate::RED).unwrap();
        fx.recorder.clear();
        fx.ctx.update_screen().unwrap();

        let draws = fx.recorder.draws();
        assert_eq!(draws[0], Primitive::Clear { color: Color::from_rgb(crate::BLACK) });
        assert_eq!(
            draws[1],
            Primitive::Ellipse { x: 101, y: 52, rx: 3, ry: 4, color: Color::from_rgb(crate::RED) }
        );
        // shaft plus two barbs, all shifted
        assert_eq!(
            draws[2],
            Primitive::Line { x1: 100, y1: 50, x2: 110, y2: 50, thickness: 1, color: Color::from_rgb(crate::RED) }
        );
        assert_eq!(draws.len(), 5);
        assert!(draws[3..].iter().all(|p| matches!(p, Primitive::Line { x2: 110, y2: 50, .. })));
    }

    #[test]
    fn extreme_arrow_does_not_break_later_frames() {
        let fx = Fixture::new();
        fx.ctx.draw_arrow(i32::MIN, 0, i32::MAX, 0, 5, 1, crate::RED).unwrap();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });

        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });
    }

    #[test]
    fn empty_update_does_not_use_up_the_frame_slot() {
        let fx = Fixture::with_config(|c| c.fps_limit = Some(1));
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::NothingToDraw);

        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });
    }

    #[test]
    fn offset_is_read_per_job() {
        let fx = Fixture::new();
        fx.ctx.draw_circle(0, 0, 1, crate::RED).unwrap();
        fx.ctx.set_global_x_offset(7).unwrap();
        fx.recorder.clear();
        fx.ctx.update_screen().unwrap();
        assert!(matches!(fx.recorder.draws()[0], Primitive::Circle { x: 7, y: 0, .. }));
        assert_eq!(fx.ctx.global_offset().unwrap(), Coord::new(7, 0));
    }

    #[test]
    fn second_bind_does_not_rebuild() {
        let fx = Fixture::new();
        fx.recorder.clear();
        assert_eq!(fx.ctx.bind_current_thread().unwrap(), BindOutcome::AlreadyBound);
        assert_eq!(fx.ctx.bind_current_thread().unwrap(), BindOutcome::AlreadyBound);
        assert_eq!(fx.recorder.count(|c| matches!(c, BackendCall::RecreateRenderer(_))), 0);
    }

    #[test]
    fn non_owner_cannot_drain_without_auto_bind() {
        let fx = Fixture::with_config(|c| c.auto_bind = false);
        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        fx.ctx.draw_line(0, 0, 5, 5, 2, crate::RED).unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                let err = fx.ctx.update_screen().unwrap_err();
                assert!(matches!(err, DrawError::NotRenderThread));
                assert_eq!(err.kind(), ErrorKind::Affinity);
            });
        });

        assert_eq!(fx.ctx.pending_jobs().unwrap(), 2);
        assert!(fx.ctx.last_error().unwrap().contains("rendering context"));
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 2 });
    }

    #[test]
    fn auto_bind_moves_context_and_rebuilds_textures() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();
        fx.ctx.draw_image(image, 0, 0).unwrap();
        fx.recorder.clear();

        let worker = thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });
                thread::current().id()
            })
            .join()
            .unwrap()
        });

        let calls = fx.recorder.calls();
        assert_eq!(calls[0], BackendCall::MakeCurrent(worker));
        assert_eq!(calls[1], BackendCall::RecreateRenderer(worker));
        assert!(matches!(calls[2], BackendCall::CreateTexture(_)));
        assert!(!fx.ctx.is_render_thread().unwrap());

        // and back
        assert!(matches!(fx.ctx.bind_current_thread().unwrap(), BindOutcome::Rebound { previous: Some(t) } if t == worker));
    }

    #[test]
    fn failed_rebind_consumes_nothing() {
        let fx = Fixture::new();
        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        fx.recorder.fail_make_current(true);

        thread::scope(|s| {
            s.spawn(|| {
                let err = fx.ctx.update_screen().unwrap_err();
                assert!(matches!(err, DrawError::Bind(_)));
            });
        });
        assert_eq!(fx.ctx.pending_jobs().unwrap(), 1);
        assert_eq!(fx.ctx.affinity.state().unwrap(), AffinityState::Unbound);

        fx.recorder.heal();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });
    }

    #[test]
    fn backend_failure_keeps_the_rest_queued() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();

        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        fx.ctx.draw_image(image, 0, 0).unwrap();
        fx.ctx.draw_circle(2, 2, 2, crate::RED).unwrap();
        assert_eq!(fx.ctx.images.ref_count(image).unwrap(), 1);

        fx.recorder.fail_draws_after(1);
        let err = fx.ctx.update_screen().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);

        // the failed image job still gave its reference back
        assert_eq!(fx.ctx.images.ref_count(image).unwrap(), 0);
        assert_eq!(fx.ctx.pending_jobs().unwrap(), 1);

        fx.recorder.heal();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });
    }

    #[test]
    fn freeing_a_queued_image_waits_for_dispatch() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();
        fx.ctx.draw_image(image, 3, 4).unwrap();
        fx.ctx.free_image(image).unwrap();

        let destroyed = |fx: &Fixture| fx.recorder.count(|c| matches!(c, BackendCall::DestroyTexture(_)));
        assert_eq!(destroyed(&fx), 0);
        assert!(matches!(fx.ctx.draw_image(image, 0, 0), Err(DrawError::ResourcePendingFree(_))));

        fx.ctx.update_screen().unwrap();
        assert!(fx
            .recorder
            .draws()
            .iter()
            .any(|p| matches!(p, Primitive::Texture { dst: Rect { x: 3, y: 4, w: 4, h: 2 }, .. })));
        assert_eq!(destroyed(&fx), 1);
        assert!(matches!(fx.ctx.image_size(image), Err(DrawError::InvalidImageHandle(_))));
    }

    #[test]
    fn images_freed_elsewhere_are_destroyed_by_render_thread() {
        let fx = Fixture::new();
        let image = fx.ctx.load_image("tile.png").unwrap();

        thread::scope(|s| {
            s.spawn(|| fx.ctx.free_image(image).unwrap());
        });
        assert_eq!(fx.recorder.count(|c| matches!(c, BackendCall::DestroyTexture(_))), 0);

        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::NothingToDraw);
        assert_eq!(fx.recorder.count(|c| matches!(c, BackendCall::DestroyTexture(_))), 1);
    }

    #[test]
    fn frame_limit_throttles_without_draining() {
        let fx = Fixture::with_config(|c| c.fps_limit = Some(1));
        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 1 });

        fx.ctx.draw_circle(1, 1, 1, crate::RED).unwrap();
        assert_eq!(fx.ctx.update_screen().unwrap(), UpdateOutcome::Throttled);
        assert_eq!(fx.ctx.pending_jobs().unwrap(), 1);
    }

    #[test]
    fn concurrent_producers_keep_their_order() {
        let fx = Fixture::new();
        let ctx = Arc::new(fx.ctx);

        thread::scope(|s| {
            for t in 0..4 {
                let ctx = Arc::clone(&ctx);
                s.spawn(move || {
                    for i in 0..100 {
                        ctx.draw_circle(t, i, 1, crate::RED).unwrap();
                    }
                });
            }
        });

        fx.recorder.clear();
        assert_eq!(ctx.update_screen().unwrap(), UpdateOutcome::Presented { jobs: 400 });

        let mut last = [-1; 4];
        for p in fx.recorder.draws() {
            let Primitive::Circle { x, y, .. } = p else {
                panic!("unexpected primitive");
            };
            assert!(y > last[x as usize]);
            last[x as usize] = y;
        }
    }

    #[test]
    fn drop_destroys_everything_once() {
        let fx = Fixture::new();
        let recorder = fx.recorder.clone();
        let a = fx.ctx.load_image("tile.png").unwrap();
        let _b = fx.ctx.load_image("tile.png").unwrap();
        fx.ctx.draw_image(a, 0, 0).unwrap();
        fx.ctx.draw_text("bye", 0, 0, crate::BLACK).unwrap();
        drop(fx);

        assert_eq!(recorder.count(|c| matches!(c, BackendCall::DestroyTexture(_))), 2);
        assert_eq!(recorder.count(|c| matches!(c, BackendCall::CloseFont(_))), 1);
    }
}
