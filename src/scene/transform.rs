//! Object transforms

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    pub fn with_rotation_y(mut self, angle: f32) -> Self {
        self.rotation = Quat::from_rotation_y(angle);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Inverse transpose of the model matrix
    pub fn normal_matrix(&self) -> Mat4 {
        self.matrix().inverse().transpose()
    }

    pub fn uniform_data(&self) -> ModelUniforms {
        ModelUniforms {
            model: self.matrix(),
            normal_matrix: self.normal_matrix(),
        }
    }
}

/// Group 1 uniform block of the geometry shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniforms {
    pub model: Mat4,
    pub normal_matrix: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_matrix_under_non_uniform_scale() {
        let transform = Transform::from_position_scale(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 1.0, 1.0));
        // A 45 degree normal on the XY diagonal tilts toward Y once X is stretched.
        let n = transform.normal_matrix().transform_vector3(Vec3::new(1.0, 1.0, 0.0)).normalize();
        assert!(n.y > n.x);
        let p = transform.matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
    }
}
