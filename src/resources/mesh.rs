//! Procedural meshes for the demo scene

use crate::backend::Vertex;
use glam::{Vec2, Vec3};

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Append a quad spanned by `u` and `v` around `center`, wound
    /// counter-clockwise when seen from `normal`.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3, normal: Vec3) {
        let base = self.vertices.len() as u32;
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        for (su, sv) in corners {
            self.vertices.push(Vertex {
                position: center + u * su + v * sv,
                normal,
                uv: Vec2::new((su + 1.0) * 0.5, (1.0 - sv) * 0.5),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Unit cube centered at the origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");
        for normal in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z] {
            let up = if normal.y.abs() > 0.5 { Vec3::Z } else { Vec3::Y };
            let u = up.cross(normal) * 0.5;
            let v = normal.cross(u);
            mesh.push_quad(normal * 0.5, u, v, normal);
        }
        mesh
    }

    /// UV sphere of diameter 1
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let mut mesh = Mesh::new("sphere");
        let (segments, rings) = (segments.max(3), rings.max(2));

        for ring in 0..=rings {
            let phi = ring as f32 / rings as f32 * std::f32::consts::PI;
            for segment in 0..=segments {
                let theta = segment as f32 / segments as f32 * std::f32::consts::TAU;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.vertices.push(Vertex {
                    position: normal * 0.5,
                    normal,
                    uv: Vec2::new(segment as f32 / segments as f32, ring as f32 / rings as f32),
                });
            }
        }

        let row = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * row + segment;
                let b = a + row;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh
    }

    /// Flat plane on XZ facing +Y
    pub fn plane(width: f32, depth: f32) -> Self {
        let mut mesh = Mesh::new("plane");
        mesh.push_quad(
            Vec3::ZERO,
            Vec3::X * (width * 0.5),
            -Vec3::Z * (depth * 0.5),
            Vec3::Y,
        );
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle must face along its vertices' normals.
    fn assert_outward_winding(mesh: &Mesh) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.vertices[tri[i] as usize]);
            let face = (b.position - a.position).cross(c.position - a.position);
            if face.length_squared() < 1e-10 {
                continue;
            }
            let normal = a.normal + b.normal + c.normal;
            assert!(face.dot(normal) > 0.0, "{} has an inward triangle", mesh.name);
        }
    }

    #[test]
    fn test_cube() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.vertices.iter().all(|v| v.position.abs().max_element() == 0.5));
        assert_outward_winding(&cube);
    }

    #[test]
    fn test_sphere() {
        let sphere = Mesh::sphere(16, 8);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
        assert!(sphere
            .vertices
            .iter()
            .all(|v| (v.position.length() - 0.5).abs() < 1e-5));
        assert_outward_winding(&sphere);
    }

    #[test]
    fn test_plane() {
        let plane = Mesh::plane(4.0, 2.0);
        assert_eq!(plane.index_count(), 6);
        assert_outward_winding(&plane);
    }
}
