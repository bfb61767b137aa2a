//! # Clustered Shading Demo
//!
//! A few thousand moving point lights over a field of cubes and spheres.
//!
//! Controls:
//! - `Tab`: switch between forward and deferred shading
//! - `Up` / `Down`: add or remove 100 active lights
//! - `Left` / `Right`: orbit the camera
//! - `C`: log a summary of the cluster buffer
//! - `Escape`: quit

use clap::Parser;
use clustered_shading::{
    ClusterReadback, ClusterSummary, Engine, EngineConfig, RendererKind, Scene,
};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

const LIGHT_STEP: u32 = 100;
const ORBIT_STEP: f32 = 0.05;

#[derive(Parser, Debug)]
#[command(name = "clustered-demo", about = "Clustered forward and deferred shading demo")]
struct Args {
    /// Shading path: forward or deferred
    #[arg(long, default_value = "forward")]
    renderer: RendererKind,

    /// Initial number of active lights
    #[arg(long, default_value_t = 500)]
    lights: u32,

    /// Disable vsync
    #[arg(long)]
    no_vsync: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = EngineConfig {
        renderer: args.renderer,
        vsync: !args.no_vsync,
        ..Default::default()
    };
    config.lights.initial_active = args.lights.min(config.lights.capacity);
    let num_clusters = config.grid.num_clusters();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let scene = Scene::demo();
    let mut engine = Engine::new(Arc::clone(&window), config, &scene)?;
    log::info!(
        "{} renderer, {} active lights",
        engine.renderer_kind(),
        engine.active_light_count()
    );

    let start = Instant::now();
    let mut readback: Option<ClusterReadback> = None;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(size) => {
                    if let Err(e) = engine.resize(size.width, size.height) {
                        log::error!("Resize failed: {}", e);
                        elwt.exit();
                    }
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => match logical_key {
                    Key::Named(NamedKey::Escape) => elwt.exit(),
                    Key::Named(NamedKey::Tab) => {
                        let kind = engine.renderer_kind().toggled();
                        if let Err(e) = engine.set_renderer(kind) {
                            log::error!("Renderer switch failed: {}", e);
                        }
                    }
                    Key::Named(NamedKey::ArrowUp) => {
                        let count = engine.active_light_count().saturating_add(LIGHT_STEP);
                        let count = engine.set_active_light_count(count);
                        log::info!("Active lights: {}", count);
                    }
                    Key::Named(NamedKey::ArrowDown) => {
                        let count = engine.active_light_count().saturating_sub(LIGHT_STEP);
                        let count = engine.set_active_light_count(count);
                        log::info!("Active lights: {}", count);
                    }
                    Key::Named(NamedKey::ArrowLeft) => engine.camera_mut().orbit(-ORBIT_STEP),
                    Key::Named(NamedKey::ArrowRight) => engine.camera_mut().orbit(ORBIT_STEP),
                    Key::Character(c) if c.as_str().eq_ignore_ascii_case("c") => {
                        if readback.is_none() {
                            match engine.inspect_clusters(num_clusters) {
                                Ok(pending) => readback = Some(pending),
                                Err(e) => log::warn!("Cluster readback failed: {}", e),
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            },
            Event::AboutToWait => {
                engine.advance_lights(start.elapsed().as_secs_f32());
                if let Err(e) = engine.draw() {
                    log::error!("Frame failed: {}", e);
                    elwt.exit();
                    return;
                }

                engine.poll(false);
                if let Some(pending) = readback.as_mut() {
                    match pending.try_snapshots() {
                        Some(Ok(snapshots)) => {
                            let max = engine.config().grid.max_lights_per_cluster;
                            log::info!("{}", ClusterSummary::from_snapshots(&snapshots, max));
                            readback = None;
                        }
                        Some(Err(e)) => {
                            log::warn!("Cluster readback failed: {}", e);
                            readback = None;
                        }
                        None => {}
                    }
                }

                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
