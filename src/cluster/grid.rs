//! Cluster grid geometry.
//!
//! Host-side mirror of `shaders/cluster_grid.wgsl`. Every function here
//! performs the same `f32` operations in the same order as its WGSL
//! counterpart, so host tools can predict which cluster the device will
//! pick for a depth or fragment.

use crate::backend::{BackendError, BackendResult};
use crate::scene::CameraUniforms;
use glam::{Mat4, UVec2, UVec3, Vec2, Vec3, Vec4};
use std::ops::Range;

/// Grid dimensions and per-cluster capacity. Fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterGridConfig {
    /// Tiles across, tiles down, depth slices
    pub dims: UVec3,
    pub max_lights_per_cluster: u32,
}

impl Default for ClusterGridConfig {
    fn default() -> Self {
        Self {
            dims: UVec3::new(16, 9, 24),
            max_lights_per_cluster: 256,
        }
    }
}

impl ClusterGridConfig {
    pub fn new(dims: UVec3, max_lights_per_cluster: u32) -> Self {
        Self {
            dims,
            max_lights_per_cluster,
        }
    }

    pub fn num_clusters(&self) -> u32 {
        self.dims.x * self.dims.y * self.dims.z
    }

    pub fn validate(&self) -> BackendResult<()> {
        if self.dims.cmpeq(UVec3::ZERO).any() {
            return Err(BackendError::InvalidConfig(format!(
                "cluster grid dimensions must be non-zero, got {}",
                self.dims
            )));
        }
        if self.max_lights_per_cluster == 0 {
            return Err(BackendError::InvalidConfig(
                "max_lights_per_cluster must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Axis-aligned box in view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Squared distance from `point` to the closest point of the box.
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        let closest = point.clamp(self.min, self.max);
        let offset = point - closest;
        offset.dot(offset)
    }

    /// Sphere overlap. A sphere that just touches the box counts as
    /// overlapping (`<=`), matching the clustering kernel.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_squared(center) <= radius * radius
    }
}

/// The grid laid over one camera's frustum
#[derive(Debug, Clone)]
pub struct ClusterGrid {
    dims: UVec3,
    near: f32,
    far: f32,
    inv_proj: Mat4,
}

impl ClusterGrid {
    pub fn new(dims: UVec3, camera: &CameraUniforms) -> Self {
        Self {
            dims,
            near: camera.near_far.x,
            far: camera.near_far.y,
            inv_proj: camera.inv_proj,
        }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn num_clusters(&self) -> u32 {
        self.dims.x * self.dims.y * self.dims.z
    }

    pub fn linear_index(&self, cluster: UVec3) -> u32 {
        cluster.x + cluster.y * self.dims.x + cluster.z * self.dims.x * self.dims.y
    }

    pub fn coord_of(&self, index: u32) -> UVec3 {
        let per_slice = self.dims.x * self.dims.y;
        UVec3::new(
            index % self.dims.x,
            (index % per_slice) / self.dims.x,
            index / per_slice,
        )
    }

    pub fn iter_coords(&self) -> impl Iterator<Item = UVec3> + '_ {
        (0..self.num_clusters()).map(|i| self.coord_of(i))
    }

    /// View-space depth where `slice` begins. Slice `dims.z` begins at far.
    pub fn slice_near_depth(&self, slice: u32) -> f32 {
        self.near * (self.far / self.near).powf(slice as f32 / self.dims.z as f32)
    }

    /// Depth range covered by `slice`, half-open. The first slice starts
    /// exactly at near and the last one ends exactly at far.
    pub fn slice_depth_range(&self, slice: u32) -> Range<f32> {
        let start = if slice == 0 {
            self.near
        } else {
            self.slice_near_depth(slice)
        };
        let end = if slice + 1 >= self.dims.z {
            self.far
        } else {
            self.slice_near_depth(slice + 1)
        };
        start..end
    }

    /// Logarithmic slice of a view-space depth. Depths outside
    /// `[near, far]` clamp to the first or last slice.
    pub fn depth_to_slice(&self, view_depth: f32) -> u32 {
        let depth = view_depth.clamp(self.near, self.far);
        let last = self.dims.z as i32 - 1;
        let estimate = ((depth / self.near).ln() / (self.far / self.near).ln() * self.dims.z as f32)
            .floor() as i32;
        let mut slice = estimate.clamp(0, last);
        if slice > 0 && depth < self.slice_near_depth(slice as u32) {
            slice -= 1;
        }
        if slice < last && depth >= self.slice_near_depth(slice as u32 + 1) {
            slice += 1;
        }
        slice as u32
    }

    /// NDC rectangle of a screen tile as (min, max). Tile row 0 is the top
    /// of the viewport.
    pub fn tile_ndc_bounds(&self, tile: UVec2) -> (Vec2, Vec2) {
        let size = Vec2::new(2.0 / self.dims.x as f32, 2.0 / self.dims.y as f32);
        let left = -1.0 + tile.x as f32 * size.x;
        let top = 1.0 - tile.y as f32 * size.y;
        (
            Vec2::new(left, top - size.y),
            Vec2::new(left + size.x, top),
        )
    }

    /// Direction through an NDC point, scaled so that its view-space z is -1.
    pub fn ndc_to_view_ray(&self, ndc: Vec2) -> Vec3 {
        let clip = self.inv_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let point = clip.truncate() / clip.w;
        point / -point.z
    }

    /// View-space bounds of a cluster: its tile's corner rays cut at the
    /// slice's near and far planes.
    pub fn cluster_aabb(&self, cluster: UVec3) -> Aabb {
        let (lo, hi) = self.tile_ndc_bounds(cluster.truncate());
        let depths = self.slice_depth_range(cluster.z);
        let corners = [
            Vec2::new(lo.x, lo.y),
            Vec2::new(hi.x, lo.y),
            Vec2::new(lo.x, hi.y),
            Vec2::new(hi.x, hi.y),
        ];

        let mut aabb = Aabb::new(Vec3::splat(1e30), Vec3::splat(-1e30));
        for corner in corners {
            let ray = self.ndc_to_view_ray(corner);
            let a = ray * depths.start;
            let b = ray * depths.end;
            aabb.min = aabb.min.min(a.min(b));
            aabb.max = aabb.max.max(a.max(b));
        }
        aabb
    }

    /// Positive view-space depth of a device depth value at the center of
    /// the screen.
    pub fn view_depth_from_device(&self, device_depth: f32) -> f32 {
        self.view_depth_at(Vec2::ZERO, device_depth)
    }

    fn view_depth_at(&self, ndc: Vec2, device_depth: f32) -> f32 {
        let view = self.inv_proj * Vec4::new(ndc.x, ndc.y, device_depth, 1.0);
        -view.z / view.w
    }

    /// Screen tile of a framebuffer position. `inv_viewport` is the
    /// reciprocal viewport size, as stored in the camera uniform.
    pub fn pixel_to_tile(&self, frag_xy: Vec2, inv_viewport: Vec2) -> UVec2 {
        let uv = frag_xy * inv_viewport;
        UVec2::new(
            ((uv.x.max(0.0) * self.dims.x as f32) as u32).min(self.dims.x - 1),
            ((uv.y.max(0.0) * self.dims.y as f32) as u32).min(self.dims.y - 1),
        )
    }

    /// Cluster of a fragment from its framebuffer position and device depth.
    pub fn fragment_cluster(&self, frag_xy: Vec2, device_depth: f32, inv_viewport: Vec2) -> UVec3 {
        let uv = frag_xy * inv_viewport;
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let tile = self.pixel_to_tile(frag_xy, inv_viewport);
        let slice = self.depth_to_slice(self.view_depth_at(ndc, device_depth));
        tile.extend(slice)
    }
}
