//! Scene content: camera, objects, and their GPU draw list

mod camera;
mod draw_list;
mod transform;

pub use camera::*;
pub use draw_list::*;
pub use transform::*;

use crate::resources::{Material, Mesh};
use glam::Vec3;

/// A renderable object in the scene
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub mesh_id: usize,
    pub material_id: usize,
    pub transform: Transform,
}

impl RenderObject {
    pub fn new(mesh_id: usize, material_id: usize) -> Self {
        Self {
            mesh_id,
            material_id,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Camera plus static geometry. Lights live in the light store.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub objects: Vec<RenderObject>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_object(&mut self, object: RenderObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Floor with a grid of pillars and spheres, sized to the default light
    /// bounds.
    pub fn demo() -> Self {
        let mut scene = Scene::new(Camera::default());

        let plane = scene.add_mesh(Mesh::plane(30.0, 30.0));
        let cube = scene.add_mesh(Mesh::cube());
        let sphere = scene.add_mesh(Mesh::sphere(24, 12));

        let floor = scene.add_material(Material::diffuse("floor", Vec3::splat(0.8)));
        let stone = scene.add_material(Material::diffuse("stone", Vec3::new(0.7, 0.65, 0.6)));
        let ivory = scene.add_material(Material::diffuse("ivory", Vec3::new(0.95, 0.93, 0.85)));

        scene.add_object(RenderObject::new(plane, floor));
        for i in -3..=3 {
            for j in -3..=3 {
                let position = Vec3::new(i as f32 * 4.0, 0.0, j as f32 * 4.0);
                let object = if (i + j) % 2 == 0 {
                    RenderObject::new(cube, stone).with_transform(
                        Transform::from_position_scale(
                            position + Vec3::Y * 1.5,
                            Vec3::new(0.8, 3.0, 0.8),
                        )
                        .with_rotation_y((i * 7 + j) as f32 * 0.3),
                    )
                } else {
                    RenderObject::new(sphere, ivory).with_transform(
                        Transform::from_position_scale(position + Vec3::Y * 0.75, Vec3::splat(1.5)),
                    )
                };
                scene.add_object(object);
            }
        }
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_references_are_valid() {
        let scene = Scene::demo();
        assert_eq!(scene.objects.len(), 1 + 49);
        for object in &scene.objects {
            assert!(object.mesh_id < scene.meshes.len());
            assert!(object.material_id < scene.materials.len());
        }
    }
}
