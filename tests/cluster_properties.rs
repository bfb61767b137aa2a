//! Host-side properties of the cluster grid and the reference clusterer.
//!
//! These run without a GPU. The clustering kernel is checked against the
//! same reference in `gpu_clustering.rs`.

use clustered_shading::cluster::reference::{cluster_lights, encode_clusters};
use clustered_shading::cluster::{Aabb, ClusterGrid, ClusterGridConfig, ClusterLayout};
use clustered_shading::scene::CameraUniforms;
use clustered_shading::{Camera, Projection};
use glam::{UVec3, Vec2, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rstest::rstest;

fn camera_uniforms(position: Vec3, fov: f32, near: f32, far: f32, size: (u32, u32)) -> CameraUniforms {
    let mut camera = Camera::new(position, Vec3::ZERO);
    camera.projection = Projection::perspective(fov, size.0 as f32 / size.1 as f32, near, far);
    camera.uniforms(size.0, size.1)
}

#[rstest]
#[case::single_slice(1, 0.1, 100.0)]
#[case::small(4, 0.1, 100.0)]
#[case::default_depth(24, 0.1, 100.0)]
#[case::narrow(16, 1.0, 4.0)]
fn test_slice_round_trip(#[case] slices: u32, #[case] near: f32, #[case] far: f32) {
    let camera = camera_uniforms(Vec3::new(0.0, 0.0, 10.0), 60.0, near, far, (64, 64));
    let grid = ClusterGrid::new(UVec3::new(4, 4, slices), &camera);

    for k in 0..slices {
        let range = grid.slice_depth_range(k);
        let middle = (range.start * range.end).sqrt();
        assert_eq!(grid.depth_to_slice(range.start), k, "start of slice {}", k);
        assert_eq!(grid.depth_to_slice(middle), k, "middle of slice {}", k);
        if k + 1 < slices {
            assert_eq!(grid.depth_to_slice(range.end), k + 1, "end of slice {}", k);
        }
    }
}

#[rstest]
fn test_depth_outside_range_clamps() {
    let camera = camera_uniforms(Vec3::new(0.0, 0.0, 10.0), 60.0, 0.5, 50.0, (64, 64));
    let grid = ClusterGrid::new(UVec3::new(4, 4, 8), &camera);

    assert_eq!(grid.depth_to_slice(0.0), 0);
    assert_eq!(grid.depth_to_slice(-3.0), 0);
    assert_eq!(grid.depth_to_slice(50.0), 7);
    assert_eq!(grid.depth_to_slice(1e6), 7);
}

#[rstest]
fn test_slices_tile_the_depth_range() {
    let camera = camera_uniforms(Vec3::new(0.0, 0.0, 10.0), 60.0, 0.1, 100.0, (64, 64));
    let grid = ClusterGrid::new(UVec3::new(4, 4, 24), &camera);

    assert_eq!(grid.slice_depth_range(0).start, 0.1);
    assert_eq!(grid.slice_depth_range(23).end, 100.0);
    for k in 0..23 {
        assert_eq!(grid.slice_depth_range(k).end, grid.slice_depth_range(k + 1).start);
    }
}

/// Every visible point reconstructed from a pixel and a depth lies inside
/// the AABB of the cluster it maps to.
#[rstest]
#[case::square(UVec3::new(4, 4, 4), (128, 128))]
#[case::default_grid(UVec3::new(16, 9, 24), (1280, 720))]
#[case::odd(UVec3::new(5, 3, 7), (333, 200))]
fn test_fragment_lies_in_its_cluster_aabb(#[case] dims: UVec3, #[case] size: (u32, u32)) {
    let camera = camera_uniforms(Vec3::new(2.0, 3.0, 12.0), 55.0, 0.3, 80.0, size);
    let grid = ClusterGrid::new(dims, &camera);
    let inv_viewport = Vec2::new(camera.viewport.z, camera.viewport.w);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..2000 {
        let frag_xy = Vec2::new(
            rng.gen_range(0.0..size.0 as f32),
            rng.gen_range(0.0..size.1 as f32),
        );
        let view_depth: f32 = rng.gen_range(0.3..80.0);
        let clip = camera.proj * Vec4::new(0.0, 0.0, -view_depth, 1.0);
        let device_depth = clip.z / clip.w;

        let cluster = grid.fragment_cluster(frag_xy, device_depth, inv_viewport);
        assert!(cluster.cmplt(dims).all());

        let uv = frag_xy * inv_viewport;
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let point = camera.inv_proj * Vec4::new(ndc.x, ndc.y, device_depth, 1.0);
        let point = point.truncate() / point.w;

        let aabb = grid.cluster_aabb(cluster);
        let tolerance = 1e-3 * view_depth;
        assert!(
            aabb.distance_squared(point) <= tolerance * tolerance,
            "point {:?} outside cluster {:?} bounds {:?}",
            point,
            cluster,
            aabb
        );
    }
}

#[rstest]
#[case::inside(Vec3::new(0.5, 0.5, 0.5), true)]
#[case::touching_face(Vec3::new(3.0, 0.5, 0.5), true)]
#[case::beyond_face(Vec3::new(3.001, 0.5, 0.5), false)]
#[case::touching_below(Vec3::new(0.5, -2.0, 0.5), true)]
#[case::beyond_corner(Vec3::new(2.5, 2.5, 0.5), false)]
fn test_sphere_boundary_is_inclusive(#[case] center: Vec3, #[case] expected: bool) {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
    assert_eq!(aabb.intersects_sphere(center, 2.0), expected);
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(7)]
fn test_capacity_clamp(#[case] capacity: u32) {
    let config = ClusterGridConfig::new(UVec3::new(4, 4, 4), capacity);
    let camera = camera_uniforms(Vec3::new(0.0, 0.0, 10.0), 60.0, 0.1, 100.0, (64, 64));
    let positions = vec![Vec3::ZERO; 12];

    let clusters = cluster_lights(&config, &camera, &positions, 5.0);
    let mut saturated = 0;
    for cluster in &clusters {
        assert!(cluster.count <= capacity);
        if cluster.count > 0 {
            assert_eq!(cluster.count, capacity);
            assert_eq!(cluster.indices, (0..capacity).collect::<Vec<_>>());
            saturated += 1;
        }
    }
    assert!(saturated > 0);

    let layout = ClusterLayout::new(config.num_clusters(), capacity);
    let bytes = encode_clusters(&config, &clusters);
    assert_eq!(bytes.len() as u64, layout.buffer_size());
    for cluster in &clusters {
        let decoded = layout.decode(&bytes, cluster.index).unwrap();
        assert_eq!(decoded.count, cluster.count);
        assert_eq!(decoded.indices, cluster.indices);
    }
}

#[rstest]
fn test_encode_never_writes_into_the_next_record() {
    let layout = ClusterLayout::new(3, 4);
    let mut bytes = vec![0u8; layout.buffer_size() as usize];
    let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));

    layout.encode(&mut bytes, 2, &aabb, &[9, 9, 9]);
    layout.encode(&mut bytes, 1, &aabb, &(0..20).collect::<Vec<_>>());

    let middle = layout.decode(&bytes, 1).unwrap();
    assert_eq!(middle.count, 4);
    assert_eq!(middle.indices, vec![0, 1, 2, 3]);
    let last = layout.decode(&bytes, 2).unwrap();
    assert_eq!(last.count, 3);
    assert_eq!(last.indices, vec![9, 9, 9]);
    assert_eq!(layout.decode(&bytes, 0).unwrap().count, 0);
}

/// One light at the origin with radius 5, seen from (0, 0, 10) through a
/// 4x4x4 grid. With near 0.1 and far 100 the sphere spans view depths 5 to
/// 15, which fall inside slice 2 (3.16 to 17.8), and every tile of that
/// slice reaches within 5 units of the center.
#[rstest]
fn test_single_light_end_to_end() {
    let config = ClusterGridConfig::new(UVec3::new(4, 4, 4), 4);
    let camera = camera_uniforms(Vec3::new(0.0, 0.0, 10.0), 60.0, 0.1, 100.0, (256, 256));
    let grid = ClusterGrid::new(config.dims, &camera);

    let clusters = cluster_lights(&config, &camera, &[Vec3::ZERO], 5.0);
    assert_eq!(clusters.len(), 64);

    let center = Vec3::new(0.0, 0.0, -10.0);
    for cluster in &clusters {
        let coord = cluster.coord(config.dims);
        let expected = grid.cluster_aabb(coord).intersects_sphere(center, 5.0);
        if expected {
            assert_eq!(cluster.count, 1, "cluster {:?}", coord);
            assert_eq!(cluster.indices, vec![0]);
        } else {
            assert_eq!(cluster.count, 0, "cluster {:?}", coord);
        }
        assert_eq!(expected, coord.z == 2, "cluster {:?}", coord);
    }
}
