//! Shared setup for the integration tests.

#![allow(dead_code)]

use clustered_shading::backend::{TextureFormat, WgpuBackend};
use clustered_shading::{
    ClusterGridConfig, EngineConfig, LightStoreConfig, Projection, RendererKind, Scene,
};
use glam::{UVec3, Vec3};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Headless wgpu backend, or `None` when the machine has no usable adapter.
pub fn headless_backend(width: u32, height: u32, format: TextureFormat) -> Option<WgpuBackend> {
    init_logging();
    match WgpuBackend::new_headless(width, height, format) {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("No GPU adapter available ({}), skipping", e);
            None
        }
    }
}

/// Small configuration that keeps readbacks cheap
pub fn small_config(renderer: RendererKind, active_lights: u32) -> EngineConfig {
    EngineConfig {
        renderer,
        grid: ClusterGridConfig::new(UVec3::new(8, 6, 12), 64),
        lights: LightStoreConfig {
            capacity: 256,
            initial_active: active_lights,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Demo scene viewed from slightly closer, so most clusters see geometry
pub fn close_scene() -> Scene {
    let mut scene = Scene::demo();
    scene.camera.position = Vec3::new(0.0, 5.0, 12.0);
    scene.camera.projection = Projection::perspective(50.0, 1.0, 0.5, 60.0);
    scene
}

/// Max absolute difference between two float images, ignoring alpha
pub fn max_rgb_difference(a: &[f32], b: &[f32]) -> f32 {
    a.chunks(4)
        .zip(b.chunks(4))
        .flat_map(|(pa, pb)| (0..3).map(move |c| (pa[c] - pb[c]).abs()))
        .fold(0.0, f32::max)
}
