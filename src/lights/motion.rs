//! Deterministic light motion.
//!
//! Positions are a pure function of a light's seed, its phase and the
//! current time: a bounded vertical bounce plus a lateral drift around a
//! home point derived from the seed. `move_lights.wgsl` evaluates the same
//! function on the device.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// Invocations per workgroup of the motion kernel
pub const MOVE_LIGHTS_WORKGROUP_SIZE: u32 = 128;

pub const BOUNCE_SPEED: f32 = 0.8;
pub const DRIFT_SPEED: f32 = 0.3;
pub const DRIFT_AMPLITUDE: f32 = 1.5;

/// Box the lights move within
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightMotion {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl LightMotion {
    pub fn new(bounds_min: Vec3, bounds_max: Vec3) -> Self {
        Self {
            bounds_min,
            bounds_max,
        }
    }

    /// Position of a light with `seed` and `phase` at `time` seconds.
    /// `seed` is expected in `[0, 1)`.
    pub fn position_at(&self, seed: f32, phase: f32, time: f32) -> Vec3 {
        let (lo, hi) = (self.bounds_min, self.bounds_max);
        let extent = hi - lo;
        let home = Vec2::new(seed, (seed * 97.0).fract());
        let bounce = (time * BOUNCE_SPEED + phase).sin().abs();
        let drift = Vec2::new(
            (time * DRIFT_SPEED + phase).sin(),
            (time * DRIFT_SPEED + 2.0 * phase).cos(),
        ) * DRIFT_AMPLITUDE;

        let lo_xz = Vec2::new(lo.x, lo.z);
        let hi_xz = Vec2::new(hi.x, hi.z);
        let xz = (lo_xz + Vec2::new(extent.x, extent.z) * home + drift).clamp(lo_xz, hi_xz);
        Vec3::new(xz.x, lo.y + extent.y * bounce, xz.y)
    }

    pub fn uniforms(&self, time: f32) -> MotionUniforms {
        MotionUniforms {
            time,
            _padding: [0.0; 3],
            bounds_min: self.bounds_min.extend(0.0),
            bounds_max: self.bounds_max.extend(0.0),
        }
    }
}

/// Uniform block of the motion kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionUniforms {
    pub time: f32,
    pub _padding: [f32; 3],
    pub bounds_min: Vec4,
    pub bounds_max: Vec4,
}
