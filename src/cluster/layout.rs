//! Byte layout of the cluster buffer.
//!
//! Each cluster record is
//!
//! ```text
//! offset 0   num_lights: u32 (+ 12 bytes padding)
//! offset 16  aabb_min:   vec4<f32>
//! offset 32  aabb_max:   vec4<f32>
//! offset 48  light_indices: [u32; max_lights_per_cluster]
//! ```
//!
//! padded to a multiple of 16 bytes, which is the array stride WGSL gives
//! `array<Cluster>`. Records are stored in linear cluster order.

use super::grid::Aabb;
use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

/// Fixed-size head of a cluster record
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ClusterHeader {
    pub num_lights: u32,
    pub _pad: [u32; 3],
    pub aabb_min: [f32; 4],
    pub aabb_max: [f32; 4],
}

pub const CLUSTER_HEADER_SIZE: u64 = std::mem::size_of::<ClusterHeader>() as u64;

/// Stride and offsets of cluster records for one grid configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLayout {
    pub num_clusters: u32,
    pub max_lights_per_cluster: u32,
}

impl ClusterLayout {
    pub fn new(num_clusters: u32, max_lights_per_cluster: u32) -> Self {
        Self {
            num_clusters,
            max_lights_per_cluster,
        }
    }

    pub fn stride(&self) -> u64 {
        let indices = 4 * self.max_lights_per_cluster as u64;
        CLUSTER_HEADER_SIZE + indices.div_ceil(16) * 16
    }

    pub fn buffer_size(&self) -> u64 {
        self.stride() * self.num_clusters as u64
    }

    pub fn record_offset(&self, index: u32) -> u64 {
        self.stride() * index as u64
    }

    pub fn indices_offset(&self, index: u32) -> u64 {
        self.record_offset(index) + CLUSTER_HEADER_SIZE
    }

    /// Decode record `index` out of `bytes`, which must start at record 0.
    /// Returns `None` when `bytes` is too short to hold the record.
    pub fn decode(&self, bytes: &[u8], index: u32) -> Option<ClusterSnapshot> {
        let start = self.record_offset(index) as usize;
        let end = start + self.stride() as usize;
        let record = bytes.get(start..end)?;

        let header: ClusterHeader =
            bytemuck::pod_read_unaligned(&record[..CLUSTER_HEADER_SIZE as usize]);
        let listed = header.num_lights.min(self.max_lights_per_cluster) as usize;
        let indices = record[CLUSTER_HEADER_SIZE as usize..]
            .chunks_exact(4)
            .take(listed)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Some(ClusterSnapshot {
            index,
            count: header.num_lights,
            aabb: Aabb::new(
                Vec3::from_slice(&header.aabb_min[..3]),
                Vec3::from_slice(&header.aabb_max[..3]),
            ),
            indices,
        })
    }

    /// Decode the first `count` records
    pub fn decode_all(&self, bytes: &[u8], count: u32) -> Vec<ClusterSnapshot> {
        (0..count.min(self.num_clusters))
            .map_while(|index| self.decode(bytes, index))
            .collect()
    }

    /// Write one record into a buffer image of [`ClusterLayout::buffer_size`]
    /// bytes. Indices past the per-cluster capacity are dropped.
    pub fn encode(&self, bytes: &mut [u8], index: u32, aabb: &Aabb, indices: &[u32]) {
        let listed = &indices[..indices.len().min(self.max_lights_per_cluster as usize)];
        let header = ClusterHeader {
            num_lights: listed.len() as u32,
            _pad: [0; 3],
            aabb_min: aabb.min.extend(1.0).to_array(),
            aabb_max: aabb.max.extend(1.0).to_array(),
        };

        let start = self.record_offset(index) as usize;
        let head_end = start + CLUSTER_HEADER_SIZE as usize;
        bytes[start..head_end].copy_from_slice(bytemuck::bytes_of(&header));
        bytes[head_end..head_end + listed.len() * 4].copy_from_slice(bytemuck::cast_slice(listed));
    }
}

/// Host copy of one cluster record
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub index: u32,
    /// Count as stored, before clamping to the capacity
    pub count: u32,
    pub aabb: Aabb,
    pub indices: Vec<u32>,
}

impl ClusterSnapshot {
    pub fn coord(&self, dims: UVec3) -> UVec3 {
        UVec3::new(
            self.index % dims.x,
            (self.index / dims.x) % dims.y,
            self.index / (dims.x * dims.y),
        )
    }

    pub fn contains_light(&self, light: u32) -> bool {
        self.indices.contains(&light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_matches_wgsl_offsets() {
        assert_eq!(CLUSTER_HEADER_SIZE, 48);
        assert_eq!(std::mem::offset_of!(ClusterHeader, aabb_min), 16);
        assert_eq!(std::mem::offset_of!(ClusterHeader, aabb_max), 32);
    }

    #[test]
    fn test_stride_rounds_to_sixteen() {
        assert_eq!(ClusterLayout::new(1, 256).stride(), 48 + 1024);
        assert_eq!(ClusterLayout::new(1, 4).stride(), 64);
        assert_eq!(ClusterLayout::new(1, 5).stride(), 80);
        assert_eq!(ClusterLayout::new(1, 1).stride(), 64);
        assert_eq!(ClusterLayout::new(10, 8).buffer_size(), 10 * 80);
    }

    #[test]
    fn test_encode_then_decode_clamps_to_capacity() {
        let layout = ClusterLayout::new(3, 4);
        let mut bytes = vec![0u8; layout.buffer_size() as usize];
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        layout.encode(&mut bytes, 1, &aabb, &[9, 8, 7, 6, 5, 4]);

        let snapshot = layout.decode(&bytes, 1).unwrap();
        assert_eq!(snapshot.count, 4);
        assert_eq!(snapshot.indices, vec![9, 8, 7, 6]);
        assert_eq!(snapshot.aabb, aabb);

        let empty = layout.decode(&bytes, 0).unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.indices.is_empty());
    }

    #[test]
    fn test_decode_short_buffer() {
        let layout = ClusterLayout::new(4, 4);
        let bytes = vec![0u8; layout.stride() as usize * 2];
        assert!(layout.decode(&bytes, 1).is_some());
        assert!(layout.decode(&bytes, 2).is_none());
        assert_eq!(layout.decode_all(&bytes, 4).len(), 2);
    }

    #[test]
    fn test_snapshot_coord() {
        let snapshot = ClusterSnapshot {
            index: 1 + 2 * 4 + 3 * 12,
            count: 0,
            aabb: Aabb::new(Vec3::ZERO, Vec3::ZERO),
            indices: Vec::new(),
        };
        assert_eq!(snapshot.coord(UVec3::new(4, 3, 5)), UVec3::new(1, 2, 3));
    }
}
