//! Group 0 shared by the shading pipelines

use crate::backend::*;

/// Camera, light set and cluster set as one bind group.
///
/// The forward, G-buffer and resolve pipelines all use this layout at
/// group 0, so one bind group serves every shading pass.
#[derive(Debug, Clone, Copy)]
pub struct SceneBindings {
    pub layout: BindGroupLayoutHandle,
    pub bind_group: BindGroupHandle,
}

impl SceneBindings {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        camera_buffer: BufferHandle,
        light_buffer: BufferHandle,
        cluster_buffer: BufferHandle,
    ) -> BackendResult<Self> {
        let layout = backend.create_bind_group_layout(
            "Scene Bindings",
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                    ty: BindingType::UniformBuffer,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: BindingType::StorageBuffer { read_only: true },
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: BindingType::StorageBuffer { read_only: true },
                },
            ],
        )?;
        let bind_group = backend.create_bind_group(
            "Scene Bindings",
            layout,
            &[
                (0, BindGroupEntry::buffer(camera_buffer)),
                (1, BindGroupEntry::buffer(light_buffer)),
                (2, BindGroupEntry::buffer(cluster_buffer)),
            ],
        )?;
        Ok(Self { layout, bind_group })
    }
}
