//! Render graph executor

use super::graph::*;
use super::pass::*;
use super::resource::*;
use crate::backend::*;
use crate::scene::DrawList;
use std::collections::HashMap;

/// Allocates graph textures and records passes in compiled order
#[derive(Default)]
pub struct RenderGraphExecutor {
    allocated_textures: HashMap<ResourceId, TextureHandle>,
    texture_views: HashMap<ResourceId, TextureViewHandle>,
    external_names: HashMap<ResourceId, String>,
}

impl RenderGraphExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a per-frame resource such as the output image
    pub fn set_external_view(&mut self, resource: ResourceId, view: TextureViewHandle) {
        self.texture_views.insert(resource, view);
    }

    /// Create every graph texture, then let passes build objects that refer
    /// to them. Already allocated resources are kept.
    pub fn allocate_resources(
        &mut self,
        graph: &mut RenderGraph,
        backend: &mut dyn GraphicsBackend,
    ) -> BackendResult<()> {
        let (width, height) = graph.screen_size();
        for resource in graph.resources() {
            match resource {
                VirtualResource::Texture(texture) => {
                    if !self.allocated_textures.contains_key(&texture.id) {
                        let handle = backend.create_texture(&texture.descriptor(width, height))?;
                        let view = backend.create_texture_view(handle)?;
                        log::debug!("Allocated graph texture `{}` {}x{}", texture.name, width, height);
                        self.allocated_textures.insert(texture.id, handle);
                        self.texture_views.insert(texture.id, view);
                    }
                }
                VirtualResource::Buffer(_) => {}
                VirtualResource::External { id, name } => {
                    self.external_names.insert(*id, name.clone());
                }
            }
        }

        let mut ctx = PassPrepareContext {
            backend,
            textures: &self.texture_views,
        };
        for pass in graph.passes_mut() {
            pass.prepare(&mut ctx)?;
        }
        Ok(())
    }

    /// Record every pass into the backend's open command batch
    pub fn execute(
        &self,
        graph: &RenderGraph,
        compiled: &CompiledGraph,
        backend: &mut dyn GraphicsBackend,
        draw_list: &DrawList,
    ) -> Result<(), RenderGraphError> {
        for (id, name) in &self.external_names {
            if !self.texture_views.contains_key(id) {
                return Err(RenderGraphError::MissingExternal(name.clone()));
            }
        }

        let (width, height) = graph.screen_size();
        for &pass_id in &compiled.pass_order {
            if let Some(pass) = graph.get_pass(pass_id) {
                let mut ctx = PassExecuteContext {
                    backend: &mut *backend,
                    draw_list,
                    width,
                    height,
                    resource_textures: &self.texture_views,
                };
                pass.execute(&mut ctx);
            }
        }
        Ok(())
    }

    /// Destroy graph-owned textures. Imported buffers are left alone.
    pub fn cleanup(&mut self, backend: &mut dyn GraphicsBackend) {
        for (_, handle) in self.allocated_textures.drain() {
            backend.destroy_texture(handle);
        }
        self.texture_views.clear();
        self.external_names.clear();
    }
}
