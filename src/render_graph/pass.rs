//! Render pass definitions for the render graph

use super::{RenderGraphError, ResourceAccess, ResourceId, ResourceUsage, TextureSize, VirtualResource, VirtualTexture};
use crate::backend::*;
use crate::scene::DrawList;
use std::any::Any;
use std::collections::HashMap;

/// Unique identifier for a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

/// Context for declaring pass resources
pub struct PassSetupContext<'a> {
    pub(crate) resources: &'a mut Vec<VirtualResource>,
    pub(crate) inputs: &'a mut Vec<ResourceAccess>,
    pub(crate) outputs: &'a mut Vec<ResourceAccess>,
    pub(crate) next_resource_id: &'a mut u32,
    pub(crate) screen_width: u32,
    pub(crate) screen_height: u32,
}

impl<'a> PassSetupContext<'a> {
    /// Declare a graph-owned texture
    pub fn create_texture(
        &mut self,
        name: &str,
        size: TextureSize,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> ResourceId {
        let id = ResourceId(*self.next_resource_id);
        *self.next_resource_id += 1;

        self.resources.push(VirtualResource::Texture(VirtualTexture {
            id,
            name: name.to_string(),
            size,
            format,
            usage,
        }));
        id
    }

    /// Declare that this pass reads from a resource
    pub fn read(&mut self, resource: ResourceId, usage: ResourceUsage) {
        self.inputs.push(ResourceAccess { resource, usage });
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: ResourceId, usage: ResourceUsage) {
        self.outputs.push(ResourceAccess { resource, usage });
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }
}

/// Context for creating per-allocation objects, such as bind groups over
/// graph textures. Runs after the executor allocates resources.
pub struct PassPrepareContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub(crate) textures: &'a HashMap<ResourceId, TextureViewHandle>,
}

impl<'a> PassPrepareContext<'a> {
    pub fn get_texture(&self, resource: ResourceId) -> Result<TextureViewHandle, RenderGraphError> {
        self.textures
            .get(&resource)
            .copied()
            .ok_or(RenderGraphError::UnknownResource(resource.0))
    }
}

/// Context for recording a pass
pub struct PassExecuteContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub draw_list: &'a DrawList,
    pub width: u32,
    pub height: u32,
    pub(crate) resource_textures: &'a HashMap<ResourceId, TextureViewHandle>,
}

impl<'a> PassExecuteContext<'a> {
    pub fn get_texture(&self, resource: ResourceId) -> Option<TextureViewHandle> {
        self.resource_textures.get(&resource).copied()
    }
}

/// Trait for render passes
pub trait RenderPass: Send + Sync {
    fn name(&self) -> &str;

    /// Declare resources and dependencies
    fn setup(&mut self, ctx: &mut PassSetupContext);

    /// Create objects that depend on allocated graph resources
    fn prepare(&mut self, _ctx: &mut PassPrepareContext) -> BackendResult<()> {
        Ok(())
    }

    /// Record commands
    fn execute(&self, ctx: &mut PassExecuteContext);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    Graphics,
    Compute,
}

/// Metadata about a pass in the graph
#[derive(Debug)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub pass_type: PassType,
    pub inputs: Vec<ResourceAccess>,
    pub outputs: Vec<ResourceAccess>,
}

impl PassNode {
    pub fn reads_resource(&self, resource: ResourceId) -> bool {
        self.inputs.iter().any(|a| a.resource == resource)
    }

    pub fn writes_resource(&self, resource: ResourceId) -> bool {
        self.outputs.iter().any(|a| a.resource == resource)
    }

    pub(crate) fn accesses(&self) -> impl Iterator<Item = &ResourceAccess> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}
