use gfx_draw::animation::{Animation, Direction, SequenceInstance};
use gfx_draw::render::backends::null::NullBackend;
use gfx_draw::{Coord, DrawConfig, DrawContext, DrawError, UpdateOutcome};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), DrawError> {
    env_logger::init();

    // Configuration comes from an optional JSON file given as the first argument. Anything it
    // does not mention keeps its default, so `{ "resources_dir": "/path/to/resources" }` is
    // usually all that is needed.
    let config = match std::env::args().nth(1) {
        Some(path) => DrawConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => DrawConfig {
            fps_limit: Some(50),
            ..Default::default()
        },
    };

    // The null backend does not put anything on screen, but it decodes images and parses fonts
    // for real, so the resources directory must contain the default font.
    let backend = NullBackend::new().expect("null backend");
    let ctx = Arc::new(DrawContext::new(config, Box::new(backend))?);

    // A couple of producer threads submitting jobs while the main thread renders.
    let producers: Vec<_> = (0..2)
        .map(|id| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || -> Result<(), DrawError> {
                for frame in 0..20 {
                    ctx.draw_circle(100 + id * 200, 100 + frame * 5, 10, gfx_draw::RED)?;
                    ctx.draw_poly(
                        &[Coord::new(0, 0), Coord::new(20, 0), Coord::new(10, 15)],
                        gfx_draw::TUM_BLUE,
                    )?;
                    ctx.draw_text(&format!("producer {id}, frame {frame}"), 10, 10 + id * 20, gfx_draw::BLACK)?;
                    thread::sleep(Duration::from_millis(10));
                }
                Ok(())
            })
        })
        .collect();

    // Animate a sprite sheet if the resources contain one.
    let mut walker = match ctx.load_image("sprites.png") {
        Ok(image) => {
            let sheet = ctx.sprite_sheet(image)?.grid(4, 1).build()?;
            let mut animation = Animation::new(sheet);
            animation.add_sequence("walk", 0, 0, Direction::HorizontalPos, 4)?;
            Some(SequenceInstance::new(Arc::new(animation), "walk", 100)?)
        }
        Err(e) => {
            log::info!("no sprite sheet to animate: {e}");
            None
        }
    };

    let mut frames = 0;
    while producers.iter().any(|p| !p.is_finished()) || ctx.pending_jobs()? > 0 {
        ctx.clear(gfx_draw::WHITE)?;
        if let Some(walker) = walker.as_mut() {
            ctx.draw_animation_frame(walker, 20, 300, 200)?;
        }

        match ctx.update_screen()? {
            UpdateOutcome::Presented { jobs } => {
                frames += 1;
                log::debug!("frame {frames}: {jobs} job(s)");
            }
            UpdateOutcome::NothingToDraw | UpdateOutcome::Throttled => {}
        }
        thread::sleep(Duration::from_millis(20));
    }

    for producer in producers {
        producer.join().expect("producer panicked")?;
    }
    println!("Presented {frames} frame(s)");
    Ok(())
}
