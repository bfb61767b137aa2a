//! Host mirror of `lighting.wgsl`.
//!
//! The forward and deferred paths share one lighting function on the
//! device. This module evaluates it on the host, which lets tests check
//! that both paths agree and gives tools a way to predict a pixel's color
//! from a cluster readback.

use crate::backend::{BackendError, BackendResult};
use crate::cluster::{ClusterGrid, ClusterSnapshot};
use crate::lights::GpuLight;
use glam::{Vec2, Vec3, Vec4};

/// Floor of the squared distance in the attenuation denominator
pub const MIN_DISTANCE_SQUARED: f32 = 1e-4;

/// Color written where no geometry was rasterized
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Shading configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingConfig {
    /// Uniform ambient term added to every light sum
    pub ambient: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self { ambient: 0.02 }
    }
}

impl ShadingConfig {
    pub fn validate(&self) -> BackendResult<()> {
        if !(self.ambient >= 0.0) {
            return Err(BackendError::InvalidConfig(format!(
                "ambient must be non-negative, got {}",
                self.ambient
            )));
        }
        Ok(())
    }
}

/// Smooth range falloff, zero at and beyond `radius`
pub fn range_attenuation(dist: f32, radius: f32) -> f32 {
    let ratio = dist / radius;
    let ratio2 = ratio * ratio;
    let falloff = (1.0 - ratio2 * ratio2).clamp(0.0, 1.0);
    falloff / (dist * dist).max(MIN_DISTANCE_SQUARED)
}

pub fn light_contribution(light: &GpuLight, radius: f32, position: Vec3, normal: Vec3) -> Vec3 {
    let to_light = light.world_position() - position;
    let dist = to_light.length();
    let direction = to_light / dist.max(1e-4);
    let lambert = normal.dot(direction).max(0.0);
    light.radiance() * lambert * range_attenuation(dist, radius)
}

/// Everything the lighting function needs about one fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentInput {
    /// Framebuffer position of the pixel center
    pub frag_xy: Vec2,
    pub device_depth: f32,
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
}

/// Light a fragment with the lights listed for its cluster.
///
/// `clusters` is indexed by linear cluster index, as returned by the
/// reference clusterer or a full readback.
pub fn shade_clustered(
    grid: &ClusterGrid,
    inv_viewport: Vec2,
    clusters: &[ClusterSnapshot],
    lights: &[GpuLight],
    radius: f32,
    ambient: f32,
    fragment: &FragmentInput,
) -> Vec3 {
    let coord = grid.fragment_cluster(fragment.frag_xy, fragment.device_depth, inv_viewport);
    let radiance = clusters
        .get(grid.linear_index(coord) as usize)
        .map(|cluster| {
            cluster
                .indices
                .iter()
                .filter_map(|&i| lights.get(i as usize))
                .map(|light| light_contribution(light, radius, fragment.position, fragment.normal))
                .sum::<Vec3>()
        })
        .unwrap_or(Vec3::ZERO);
    fragment.albedo * (Vec3::splat(ambient) + radiance)
}

/// One G-buffer texel as the G-buffer pass writes it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GBufferTexel {
    pub position: Vec4,
    pub normal: Vec4,
    pub albedo: Vec4,
    pub depth: f32,
}

impl GBufferTexel {
    /// Texel left behind by the G-buffer clear
    pub fn cleared() -> Self {
        Self {
            position: Vec4::ZERO,
            normal: Vec4::ZERO,
            albedo: Vec4::ZERO,
            depth: 1.0,
        }
    }

    pub fn encode(fragment: &FragmentInput) -> Self {
        Self {
            position: fragment.position.extend(1.0),
            normal: fragment.normal.normalize_or_zero().extend(0.0),
            albedo: fragment.albedo.extend(1.0),
            depth: fragment.device_depth,
        }
    }

    /// Fragment seen by the resolve pass at `frag_xy`, or `None` where the
    /// resolve writes the clear color.
    pub fn decode(&self, frag_xy: Vec2) -> Option<FragmentInput> {
        if self.depth >= 1.0 {
            return None;
        }
        Some(FragmentInput {
            frag_xy,
            device_depth: self.depth,
            position: self.position.truncate(),
            normal: self.normal.truncate().normalize_or_zero(),
            albedo: self.albedo.truncate(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_reaches_zero_at_radius() {
        assert_eq!(range_attenuation(2.0, 2.0), 0.0);
        assert_eq!(range_attenuation(3.0, 2.0), 0.0);
        assert!(range_attenuation(1.0, 2.0) > 0.0);
        // Near zero distance the denominator floors at MIN_DISTANCE_SQUARED.
        assert_eq!(range_attenuation(0.0, 2.0), 1.0 / MIN_DISTANCE_SQUARED);
    }

    #[test]
    fn test_back_facing_light_contributes_nothing() {
        let light = GpuLight::new(Vec3::new(0.0, -1.0, 0.0), 0.0, Vec3::ONE, 0.0);
        let c = light_contribution(&light, 5.0, Vec3::ZERO, Vec3::Y);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn test_gbuffer_texel_round_trip() {
        let fragment = FragmentInput {
            frag_xy: Vec2::new(3.5, 7.5),
            device_depth: 0.9,
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Y,
            albedo: Vec3::new(0.5, 0.25, 1.0),
        };
        let texel = GBufferTexel::encode(&fragment);
        assert_eq!(texel.decode(fragment.frag_xy), Some(fragment));
        assert_eq!(GBufferTexel::cleared().decode(fragment.frag_xy), None);
    }

    #[test]
    fn test_ambient_validation() {
        assert!(ShadingConfig::default().validate().is_ok());
        assert!(ShadingConfig { ambient: -0.1 }.validate().is_err());
    }
}
