//! Surface materials

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Diffuse material. The clustered lighting model only reads the albedo.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Vec4::ONE,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    pub fn diffuse(name: &str, color: Vec3) -> Self {
        Self::new(name).with_base_color(color.extend(1.0))
    }

    pub fn uniform_data(&self) -> MaterialUniforms {
        MaterialUniforms {
            base_color: self.base_color,
        }
    }
}

/// Group 2 uniform block of the geometry shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: Vec4,
}
