//! Host reference for the clustering kernel.
//!
//! Produces the same records as `clustering.wgsl` for the same camera and
//! light positions, in the same byte layout. Used to validate the device
//! output and by tools that want cluster contents without a GPU.

use super::grid::{ClusterGrid, ClusterGridConfig};
use super::layout::{ClusterLayout, ClusterSnapshot};
use crate::scene::CameraUniforms;
use glam::Vec3;

/// Assign world-space light positions to clusters.
///
/// Light `i` of `positions` is tested against every cluster in ascending
/// order, and each cluster stops accepting lights once it holds
/// `max_lights_per_cluster` of them.
pub fn cluster_lights(
    config: &ClusterGridConfig,
    camera: &CameraUniforms,
    positions: &[Vec3],
    radius: f32,
) -> Vec<ClusterSnapshot> {
    let grid = ClusterGrid::new(config.dims, camera);
    let capacity = config.max_lights_per_cluster as usize;
    let view_positions: Vec<Vec3> = positions
        .iter()
        .map(|p| (camera.view * p.extend(1.0)).truncate())
        .collect();

    grid.iter_coords()
        .map(|coord| {
            let aabb = grid.cluster_aabb(coord);
            let indices: Vec<u32> = view_positions
                .iter()
                .enumerate()
                .filter(|(_, center)| aabb.intersects_sphere(**center, radius))
                .map(|(i, _)| i as u32)
                .take(capacity)
                .collect();
            ClusterSnapshot {
                index: grid.linear_index(coord),
                count: indices.len() as u32,
                aabb,
                indices,
            }
        })
        .collect()
}

/// Encode snapshots into a cluster buffer image.
pub fn encode_clusters(config: &ClusterGridConfig, clusters: &[ClusterSnapshot]) -> Vec<u8> {
    let layout = ClusterLayout::new(config.num_clusters(), config.max_lights_per_cluster);
    let mut bytes = vec![0u8; layout.buffer_size() as usize];
    for cluster in clusters {
        layout.encode(&mut bytes, cluster.index, &cluster.aabb, &cluster.indices);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Camera, Projection};
    use glam::UVec3;

    fn camera() -> CameraUniforms {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        camera.projection = Projection::perspective(60.0, 1.0, 0.1, 100.0);
        camera.uniforms(256, 256)
    }

    #[test]
    fn test_no_lights_gives_empty_clusters() {
        let config = ClusterGridConfig::new(UVec3::new(4, 4, 4), 8);
        let clusters = cluster_lights(&config, &camera(), &[], 5.0);
        assert_eq!(clusters.len(), 64);
        assert!(clusters.iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_capacity_keeps_lowest_indices() {
        let config = ClusterGridConfig::new(UVec3::new(2, 2, 2), 3);
        let positions = vec![Vec3::ZERO; 10];
        let clusters = cluster_lights(&config, &camera(), &positions, 50.0);
        for cluster in &clusters {
            assert_eq!(cluster.count, 3);
            assert_eq!(cluster.indices, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_encoded_image_decodes_back() {
        let config = ClusterGridConfig::new(UVec3::new(3, 2, 2), 4);
        let clusters = cluster_lights(&config, &camera(), &[Vec3::ZERO, Vec3::X], 5.0);
        let bytes = encode_clusters(&config, &clusters);
        let layout = ClusterLayout::new(config.num_clusters(), 4);
        assert_eq!(layout.decode_all(&bytes, config.num_clusters()), clusters);
    }
}
