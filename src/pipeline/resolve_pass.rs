//! Deferred resolve: clustered lighting over the G-buffer

use super::gbuffer_pass::GBufferTargets;
use super::{GraphResources, ShadingPipelines};
use crate::backend::*;
use crate::render_graph::*;
use crate::shading::CLEAR_COLOR;
use std::any::Any;

/// Fullscreen pass that lights every covered pixel with the same function
/// the forward pass uses. Pixels the G-buffer pass never touched keep the
/// clear color.
pub struct ResolvePass {
    pipeline: RenderPipelineHandle,
    scene_bind_group: BindGroupHandle,
    gbuffer_layout: BindGroupLayoutHandle,
    gbuffer_bind_group: Option<BindGroupHandle>,
    resources: GraphResources,
    gbuffer: GBufferTargets,
}

impl ResolvePass {
    pub fn new(pipelines: &ShadingPipelines, resources: GraphResources, gbuffer: GBufferTargets) -> Self {
        Self {
            pipeline: pipelines.resolve,
            scene_bind_group: pipelines.scene.bind_group,
            gbuffer_layout: pipelines.gbuffer_layout,
            gbuffer_bind_group: None,
            resources,
            gbuffer,
        }
    }
}

impl RenderPass for ResolvePass {
    fn name(&self) -> &str {
        "Deferred Resolve"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        ctx.read(self.gbuffer.position, ResourceUsage::TextureRead);
        ctx.read(self.gbuffer.normal, ResourceUsage::TextureRead);
        ctx.read(self.gbuffer.albedo, ResourceUsage::TextureRead);
        ctx.read(self.resources.camera, ResourceUsage::UniformBuffer);
        ctx.read(self.resources.lights, ResourceUsage::StorageBufferRead);
        ctx.read(self.resources.clusters, ResourceUsage::StorageBufferRead);
        ctx.write(self.resources.output, ResourceUsage::RenderTarget);
    }

    fn prepare(&mut self, ctx: &mut PassPrepareContext) -> BackendResult<()> {
        let entries = [
            (0, BindGroupEntry::Texture(ctx.get_texture(self.gbuffer.position)?)),
            (1, BindGroupEntry::Texture(ctx.get_texture(self.gbuffer.normal)?)),
            (2, BindGroupEntry::Texture(ctx.get_texture(self.gbuffer.albedo)?)),
        ];
        self.gbuffer_bind_group =
            Some(ctx.backend.create_bind_group("G-Buffer Textures", self.gbuffer_layout, &entries)?);
        Ok(())
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        let (Some(output_view), Some(gbuffer_bind_group)) =
            (ctx.get_texture(self.resources.output), self.gbuffer_bind_group)
        else {
            log::warn!("Deferred resolve skipped: G-buffer is not bound");
            return;
        };

        let backend = &mut *ctx.backend;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Deferred Resolve".into()),
            color_attachments: vec![ColorAttachment {
                view: output_view,
                load_op: LoadOp::Clear(CLEAR_COLOR),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });
        backend.set_render_pipeline(self.pipeline);
        backend.set_bind_group(0, self.scene_bind_group);
        backend.set_bind_group(1, gbuffer_bind_group);
        backend.draw(0..3, 0..1);
        backend.end_render_pass();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
