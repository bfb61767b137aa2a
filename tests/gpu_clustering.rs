//! Clustering, motion and shading on a real device.
//!
//! Each test runs against a headless wgpu backend and is skipped when the
//! machine has no adapter.
//!
//! ```bash
//! RUST_LOG=debug cargo test --test gpu_clustering -- --nocapture
//! ```

mod common;

use clustered_shading::backend::{GraphicsBackend, TextureFormat, WgpuBackend};
use clustered_shading::cluster::reference::cluster_lights;
use clustered_shading::cluster::ClusterSnapshot;
use clustered_shading::lights::{GpuLight, LIGHT_HEADER_SIZE, LIGHT_STRIDE};
use clustered_shading::{
    Camera, ClusterGridConfig, ClusterSummary, Engine, LightStoreConfig, Projection, RendererKind,
};
use glam::{UVec3, Vec3};
use rstest::rstest;
use std::collections::BTreeSet;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn gpu_engine(
    kind: RendererKind,
    active_lights: u32,
    format: TextureFormat,
) -> Option<Engine<WgpuBackend>> {
    let backend = common::headless_backend(WIDTH, HEIGHT, format)?;
    let config = common::small_config(kind, active_lights);
    Some(Engine::from_backend(backend, config, &common::close_scene()).unwrap())
}

fn read_clusters(engine: &mut Engine<WgpuBackend>) -> Vec<ClusterSnapshot> {
    let all = engine.config().grid.num_clusters();
    let readback = engine.inspect_clusters(all).unwrap();
    readback.wait(engine.backend_mut()).unwrap()
}

fn read_lights(engine: &mut Engine<WgpuBackend>) -> Vec<GpuLight> {
    let count = engine.active_light_count() as u64;
    let buffer = engine.stage().lights.buffer();
    let backend = engine.backend_mut();
    let pending = backend
        .read_buffer(buffer, LIGHT_HEADER_SIZE, count * LIGHT_STRIDE)
        .unwrap();
    let bytes = loop {
        if let Some(result) = pending.try_take() {
            break result.unwrap();
        }
        backend.poll(true);
    };
    bytes
        .chunks_exact(LIGHT_STRIDE as usize)
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

fn read_image(engine: &mut Engine<WgpuBackend>) -> Vec<f32> {
    engine
        .backend_mut()
        .read_target()
        .unwrap()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Device results may differ from the host only for lights whose sphere
/// grazes the cluster bounds.
fn assert_clusters_match(
    engine: &Engine<WgpuBackend>,
    device: &[ClusterSnapshot],
    positions: &[Vec3],
) {
    let stage = engine.stage();
    let camera = *stage.camera_buffer.current();
    let config = engine.config().grid;
    let radius = stage.lights.radius();
    let host = cluster_lights(&config, &camera, positions, radius);
    assert_eq!(device.len(), host.len());

    for (gpu, cpu) in device.iter().zip(&host) {
        assert_eq!(gpu.index, cpu.index);
        assert!(gpu.count <= config.max_lights_per_cluster);
        if cpu.count == config.max_lights_per_cluster {
            assert_eq!(gpu.count, cpu.count, "cluster {} should saturate", cpu.index);
            continue;
        }

        let gpu_set: BTreeSet<u32> = gpu.indices.iter().copied().collect();
        let cpu_set: BTreeSet<u32> = cpu.indices.iter().copied().collect();
        for light in gpu_set.symmetric_difference(&cpu_set) {
            let world = positions[*light as usize];
            let view = (camera.view * world.extend(1.0)).truncate();
            let distance = cpu.aabb.distance_squared(view).sqrt();
            assert!(
                (distance - radius).abs() < 1e-2,
                "light {} disagrees on cluster {} at distance {}",
                light,
                cpu.index,
                distance
            );
        }
    }
}

#[rstest]
#[case::one(1, 0.0)]
#[case::some(64, 1.25)]
#[case::all(256, 7.5)]
fn test_device_clusters_match_host_reference(#[case] active: u32, #[case] time: f32) {
    let Some(mut engine) = gpu_engine(RendererKind::Forward, active, TextureFormat::Rgba8Unorm)
    else {
        return;
    };

    engine.advance_lights(time);
    engine.draw().unwrap();

    let device = read_clusters(&mut engine);
    let positions = engine.stage().lights.positions_at(time);
    assert_clusters_match(&engine, &device, &positions);

    let summary = ClusterSummary::from_snapshots(&device, engine.config().grid.max_lights_per_cluster);
    log::info!("{}", summary);
    assert!(summary.non_empty > 0);
}

/// One light pinned at the origin with radius 5, seen from (0, 0, 10)
/// through a 4x4x4 grid. The sphere covers view depths 5 to 15, all inside
/// slice 2, so exactly the 16 clusters of that slice hold it.
#[rstest]
fn test_single_light_end_to_end_on_device() {
    let Some(backend) = common::headless_backend(128, 128, TextureFormat::Rgba8Unorm) else {
        return;
    };
    let mut config = common::small_config(RendererKind::Forward, 1);
    config.grid = ClusterGridConfig::new(UVec3::new(4, 4, 4), 4);
    config.lights = LightStoreConfig {
        capacity: 1,
        initial_active: 1,
        radius: 5.0,
        bounds_min: Vec3::ZERO,
        bounds_max: Vec3::ZERO,
        ..Default::default()
    };
    let mut scene = common::close_scene();
    scene.camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
    scene.camera.projection = Projection::perspective(60.0, 1.0, 0.1, 100.0);
    let mut engine = Engine::from_backend(backend, config, &scene).unwrap();

    engine.advance_lights(0.0);
    engine.draw().unwrap();
    let clusters = read_clusters(&mut engine);
    assert_eq!(clusters.len(), 64);

    let positions = engine.stage().lights.positions_at(0.0);
    assert_eq!(positions, vec![Vec3::ZERO]);
    assert_clusters_match(&engine, &clusters, &positions);

    let dims = engine.config().grid.dims;
    for cluster in &clusters {
        let coord = cluster.coord(dims);
        if coord.z == 2 {
            assert_eq!(cluster.count, 1, "cluster {:?}", coord);
            assert_eq!(cluster.indices, vec![0]);
        } else {
            assert_eq!(cluster.count, 0, "cluster {:?}", coord);
        }
    }

    engine.set_active_light_count(0);
    engine.draw().unwrap();
    assert!(read_clusters(&mut engine).iter().all(|c| c.count == 0));
}

#[rstest]
fn test_clusters_reset_every_frame() {
    let Some(mut engine) = gpu_engine(RendererKind::Forward, 256, TextureFormat::Rgba8Unorm) else {
        return;
    };
    engine.advance_lights(0.5);
    engine.draw().unwrap();
    assert!(read_clusters(&mut engine).iter().any(|c| c.count > 0));

    engine.set_active_light_count(0);
    engine.draw().unwrap();
    let clusters = read_clusters(&mut engine);
    assert!(clusters.iter().all(|c| c.count == 0 && c.indices.is_empty()));
}

#[rstest]
fn test_saturated_clusters_keep_valid_indices() {
    let Some(backend) = common::headless_backend(WIDTH, HEIGHT, TextureFormat::Rgba8Unorm) else {
        return;
    };
    let mut config = common::small_config(RendererKind::Forward, 256);
    config.grid.max_lights_per_cluster = 4;
    let mut engine = Engine::from_backend(backend, config, &common::close_scene()).unwrap();

    engine.advance_lights(3.0);
    engine.draw().unwrap();
    let clusters = read_clusters(&mut engine);

    let summary = ClusterSummary::from_snapshots(&clusters, 4);
    assert!(summary.saturated > 0);
    assert_eq!(summary.max_count, 4);
    for cluster in &clusters {
        assert!(cluster.count <= 4);
        let distinct: BTreeSet<u32> = cluster.indices.iter().copied().collect();
        assert_eq!(distinct.len(), cluster.indices.len());
        assert!(cluster.indices.iter().all(|&i| i < 256));
    }

    let positions = engine.stage().lights.positions_at(3.0);
    assert_clusters_match(&engine, &clusters, &positions);
}

#[rstest]
#[case(0.0)]
#[case(0.75)]
#[case(42.0)]
fn test_device_motion_matches_host(#[case] time: f32) {
    let Some(mut engine) = gpu_engine(RendererKind::Forward, 200, TextureFormat::Rgba8Unorm) else {
        return;
    };
    engine.advance_lights(time);
    let device = read_lights(&mut engine);
    let host = engine.stage().lights.positions_at(time);
    let uploaded = engine.stage().lights.lights()[..200].to_vec();

    assert_eq!(device.len(), host.len());
    for ((gpu, cpu), original) in device.iter().zip(&host).zip(&uploaded) {
        assert!(
            gpu.world_position().distance(*cpu) < 1e-3,
            "device {:?} host {:?}",
            gpu.world_position(),
            cpu
        );
        assert_eq!(gpu.seed(), original.seed());
        assert_eq!(gpu.phase(), original.phase());
        assert_eq!(gpu.color, original.color);
    }
}

#[rstest]
fn test_motion_replays_identically() {
    let Some(mut engine) = gpu_engine(RendererKind::Forward, 128, TextureFormat::Rgba8Unorm) else {
        return;
    };
    engine.advance_lights(2.0);
    let first = read_lights(&mut engine);
    engine.advance_lights(9.0);
    engine.advance_lights(2.0);
    let replay = read_lights(&mut engine);
    assert_eq!(first, replay);
}

#[rstest]
#[case(0.0, 64)]
#[case(4.0, 256)]
fn test_forward_and_deferred_agree(#[case] time: f32, #[case] active: u32) {
    let Some(mut engine) = gpu_engine(RendererKind::Forward, active, TextureFormat::Rgba32Float)
    else {
        return;
    };
    engine.advance_lights(time);
    engine.draw().unwrap();
    let forward = read_image(&mut engine);

    engine.set_renderer(RendererKind::Deferred).unwrap();
    engine.draw().unwrap();
    let deferred = read_image(&mut engine);

    assert_eq!(forward.len(), (WIDTH * HEIGHT * 4) as usize);
    assert_eq!(forward.len(), deferred.len());
    let lit = forward.chunks(4).filter(|p| p[0] + p[1] + p[2] > 0.1).count();
    assert!(lit > 0, "forward image is black");

    // G-buffer normals and albedo are half floats
    for (i, (f, d)) in forward.iter().zip(&deferred).enumerate() {
        let tolerance = 1e-2 * f.abs().max(1.0);
        assert!(
            (f - d).abs() <= tolerance,
            "pixel {} channel {}: forward {} deferred {}",
            i / 4,
            i % 4,
            f,
            d
        );
    }
    log::info!(
        "max difference {}",
        common::max_rgb_difference(&forward, &deferred)
    );
}
