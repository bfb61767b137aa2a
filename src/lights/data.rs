//! Packed light layout shared with `common.wgsl`

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Bytes before the first light: the active count plus padding
pub const LIGHT_HEADER_SIZE: u64 = std::mem::size_of::<LightSetHeader>() as u64;

/// Bytes per light
pub const LIGHT_STRIDE: u64 = std::mem::size_of::<GpuLight>() as u64;

/// Header of the light buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LightSetHeader {
    pub num_lights: u32,
    pub _pad: [u32; 3],
}

impl LightSetHeader {
    pub fn new(num_lights: u32) -> Self {
        Self {
            num_lights,
            _pad: [0; 3],
        }
    }
}

/// One light as the shaders see it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz = world position, w = motion seed
    pub position: Vec4,
    /// rgb = radiance, w = motion phase
    pub color: Vec4,
}

impl GpuLight {
    pub fn new(position: Vec3, seed: f32, color: Vec3, phase: f32) -> Self {
        Self {
            position: position.extend(seed),
            color: color.extend(phase),
        }
    }

    pub fn world_position(&self) -> Vec3 {
        self.position.truncate()
    }

    pub fn radiance(&self) -> Vec3 {
        self.color.truncate()
    }

    pub fn seed(&self) -> f32 {
        self.position.w
    }

    pub fn phase(&self) -> f32 {
        self.color.w
    }
}

/// Total size of a light buffer holding `capacity` lights
pub fn light_buffer_size(capacity: u32) -> u64 {
    LIGHT_HEADER_SIZE + LIGHT_STRIDE * capacity as u64
}

/// Byte offset of light `index`
pub fn light_offset(index: u32) -> u64 {
    LIGHT_HEADER_SIZE + LIGHT_STRIDE * index as u64
}

/// Saturated, bright color for a hue in `[0, 1)`.
///
/// HSV to RGB at full value, then blended 80% of the way from white, which
/// keeps every light pastel-bright regardless of hue.
pub fn hue_to_rgb(hue: f32) -> Vec3 {
    let channel = |n: f32| {
        let k = (n + hue * 6.0).rem_euclid(6.0);
        1.0 - k.min(4.0 - k).min(1.0).max(0.0)
    };
    Vec3::ONE.lerp(Vec3::new(channel(5.0), channel(3.0), channel(1.0)), 0.8)
}
