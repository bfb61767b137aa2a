//! GPU-resident form of a [`Scene`]

use super::Scene;
use crate::backend::*;

/// One indexed draw with its per-object bind groups
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub model_bind_group: BindGroupHandle,
    pub material_bind_group: BindGroupHandle,
}

/// Uploaded scene geometry, ready to record.
///
/// Geometry pipelines bind the model block at group 1 and the material
/// block at group 2, using the layouts owned here.
pub struct DrawList {
    items: Vec<DrawItem>,
    model_layout: BindGroupLayoutHandle,
    material_layout: BindGroupLayoutHandle,
}

impl DrawList {
    pub fn upload(backend: &mut dyn GraphicsBackend, scene: &Scene) -> BackendResult<Self> {
        let model_layout = backend.create_bind_group_layout(
            "Model",
            &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX,
                ty: BindingType::UniformBuffer,
            }],
        )?;
        let material_layout = backend.create_bind_group_layout(
            "Material",
            &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::UniformBuffer,
            }],
        )?;

        let mut mesh_buffers = Vec::with_capacity(scene.meshes.len());
        for mesh in &scene.meshes {
            let vertex_buffer = backend.create_buffer_init(
                &BufferDescriptor::new(
                    &format!("{} vertices", mesh.name),
                    mesh.vertex_bytes().len() as u64,
                    BufferUsage::VERTEX,
                ),
                mesh.vertex_bytes(),
            )?;
            let index_buffer = backend.create_buffer_init(
                &BufferDescriptor::new(
                    &format!("{} indices", mesh.name),
                    mesh.index_bytes().len() as u64,
                    BufferUsage::INDEX,
                ),
                mesh.index_bytes(),
            )?;
            mesh_buffers.push((vertex_buffer, index_buffer, mesh.index_count()));
        }

        let mut material_groups = Vec::with_capacity(scene.materials.len());
        for material in &scene.materials {
            let buffer = backend.create_buffer_init(
                &BufferDescriptor::new(
                    &format!("{} material", material.name),
                    std::mem::size_of::<crate::resources::MaterialUniforms>() as u64,
                    BufferUsage::UNIFORM,
                ),
                bytemuck::bytes_of(&material.uniform_data()),
            )?;
            material_groups.push(backend.create_bind_group(
                &material.name,
                material_layout,
                &[(0, BindGroupEntry::buffer(buffer))],
            )?);
        }

        let mut items = Vec::with_capacity(scene.objects.len());
        for (index, object) in scene.objects.iter().enumerate() {
            let (vertex_buffer, index_buffer, index_count) =
                *mesh_buffers.get(object.mesh_id).ok_or_else(|| {
                    BackendError::InvalidConfig(format!(
                        "object {} references missing mesh {}",
                        index, object.mesh_id
                    ))
                })?;
            let material_bind_group = *material_groups.get(object.material_id).ok_or_else(|| {
                BackendError::InvalidConfig(format!(
                    "object {} references missing material {}",
                    index, object.material_id
                ))
            })?;

            let model_buffer = backend.create_buffer_init(
                &BufferDescriptor::new(
                    "Model Uniforms",
                    std::mem::size_of::<super::ModelUniforms>() as u64,
                    BufferUsage::UNIFORM,
                ),
                bytemuck::bytes_of(&object.transform.uniform_data()),
            )?;
            let model_bind_group = backend.create_bind_group(
                "Model",
                model_layout,
                &[(0, BindGroupEntry::buffer(model_buffer))],
            )?;

            items.push(DrawItem {
                vertex_buffer,
                index_buffer,
                index_count,
                model_bind_group,
                material_bind_group,
            });
        }

        log::debug!(
            "Uploaded {} meshes, {} materials, {} draws",
            scene.meshes.len(),
            scene.materials.len(),
            items.len()
        );

        Ok(Self {
            items,
            model_layout,
            material_layout,
        })
    }

    /// Record every draw into the open render pass. The pipeline and group 0
    /// must already be bound.
    pub fn record(&self, backend: &mut dyn GraphicsBackend) {
        for item in &self.items {
            backend.set_bind_group(1, item.model_bind_group);
            backend.set_bind_group(2, item.material_bind_group);
            backend.set_vertex_buffer(0, item.vertex_buffer, 0);
            backend.set_index_buffer(item.index_buffer, 0, IndexFormat::Uint32);
            backend.draw_indexed(0..item.index_count, 0, 0..1);
        }
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn model_layout(&self) -> BindGroupLayoutHandle {
        self.model_layout
    }

    pub fn material_layout(&self) -> BindGroupLayoutHandle {
        self.material_layout
    }
}
