//! Forward clustered shading

use super::{GraphResources, ShadingPipelines, DEPTH_CLEAR};
use crate::backend::*;
use crate::render_graph::*;
use crate::shading::CLEAR_COLOR;
use std::any::Any;

/// Draws the scene straight to the output, lighting each fragment with
/// the lights of its cluster.
pub struct ForwardPass {
    pipeline: RenderPipelineHandle,
    scene_bind_group: BindGroupHandle,
    resources: GraphResources,
    depth: Option<ResourceId>,
}

impl ForwardPass {
    pub fn new(pipelines: &ShadingPipelines, resources: GraphResources) -> Self {
        Self {
            pipeline: pipelines.forward,
            scene_bind_group: pipelines.scene.bind_group,
            resources,
            depth: None,
        }
    }

    pub fn depth_texture(&self) -> Option<ResourceId> {
        self.depth
    }
}

impl RenderPass for ForwardPass {
    fn name(&self) -> &str {
        "Forward Shading"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        let depth = ctx.create_texture(
            "forward_depth",
            TextureSize::default(),
            TextureFormat::Depth32Float,
            TextureUsage::RENDER_ATTACHMENT,
        );
        self.depth = Some(depth);

        ctx.read(self.resources.camera, ResourceUsage::UniformBuffer);
        ctx.read(self.resources.lights, ResourceUsage::StorageBufferRead);
        ctx.read(self.resources.clusters, ResourceUsage::StorageBufferRead);
        ctx.write(depth, ResourceUsage::DepthStencilWrite);
        ctx.write(self.resources.output, ResourceUsage::RenderTarget);
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        let output_view = ctx.get_texture(self.resources.output);
        let depth_view = self.depth.and_then(|id| ctx.get_texture(id));
        let (Some(output_view), Some(depth_view)) = (output_view, depth_view) else {
            log::warn!("Forward pass skipped: targets are not allocated");
            return;
        };

        let backend = &mut *ctx.backend;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Forward Shading".into()),
            color_attachments: vec![ColorAttachment {
                view: output_view,
                load_op: LoadOp::Clear(CLEAR_COLOR),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth_view,
                depth_load_op: LoadOp::Clear(DEPTH_CLEAR),
                depth_store_op: StoreOp::Discard,
            }),
        });
        backend.set_render_pipeline(self.pipeline);
        backend.set_bind_group(0, self.scene_bind_group);
        ctx.draw_list.record(backend);
        backend.end_render_pass();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
