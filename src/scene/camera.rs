//! Camera and its uniform block

use crate::backend::{BackendResult, BufferDescriptor, BufferHandle, BufferUsage, GraphicsBackend};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Perspective projection. Clustering slices the frustum logarithmically in
/// view depth, which only makes sense for a perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 6.0, 18.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit around the target by `yaw` radians about the up axis.
    pub fn orbit(&mut self, yaw: f32) {
        let offset = self.position - self.target;
        self.position = self.target + glam::Quat::from_axis_angle(self.up, yaw) * offset;
    }

    /// Build the uniform block for a `width` x `height` viewport
    pub fn uniforms(&self, width: u32, height: u32) -> CameraUniforms {
        let view = self.view_matrix();
        let proj = self.projection_matrix();
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);

        CameraUniforms {
            view,
            proj,
            view_proj: proj * view,
            inv_view: view.inverse(),
            inv_proj: proj.inverse(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(self.projection.near, self.projection.far, 0.0, 0.0),
            viewport: Vec4::new(w, h, 1.0 / w, 1.0 / h),
        }
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.projection.set_aspect(width / height.max(1.0));
    }
}

/// Camera uniform block as laid out in `common.wgsl`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub position: Vec4,
    /// x = near, y = far
    pub near_far: Vec4,
    /// xy = size in pixels, zw = reciprocal size
    pub viewport: Vec4,
}

/// Uniform buffer holding the current [`CameraUniforms`]
pub struct CameraBuffer {
    buffer: BufferHandle,
    current: CameraUniforms,
}

impl CameraBuffer {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        camera: &Camera,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let current = camera.uniforms(width, height);
        let buffer = backend.create_buffer_init(
            &BufferDescriptor::new(
                "Camera Uniforms",
                std::mem::size_of::<CameraUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            ),
            bytemuck::bytes_of(&current),
        )?;
        Ok(Self { buffer, current })
    }

    /// Rebuild the block and queue the write
    pub fn update(&mut self, backend: &mut dyn GraphicsBackend, camera: &Camera, width: u32, height: u32) {
        self.current = camera.uniforms(width, height);
        backend.write_buffer(self.buffer, 0, bytemuck::bytes_of(&self.current));
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn current(&self) -> &CameraUniforms {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 368);
    }

    #[test]
    fn test_viewport_reciprocal() {
        let uniforms = Camera::default().uniforms(800, 400);
        assert_eq!(uniforms.viewport, Vec4::new(800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0));
        assert_eq!(uniforms.near_far.x, 0.1);
        assert_eq!(uniforms.near_far.y, 100.0);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::new(Vec3::new(0.0, 2.0, 10.0), Vec3::ZERO);
        let before = camera.position.distance(camera.target);
        camera.orbit(1.2);
        assert!((camera.position.distance(camera.target) - before).abs() < 1e-4);
    }
}
