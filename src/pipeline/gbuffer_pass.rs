//! G-buffer generation for deferred shading
//!
//! Writes per-pixel surface attributes, no lighting:
//! - world position (`Rgba32Float`), device depth in `w`
//! - world normal (`Rgba16Float`)
//! - albedo (`Rgba16Float`), alpha 0 where nothing was drawn
//!
//! The depth attachment is only used for the depth test. Loading a depth
//! texture in a shader is not available on GL adapters.

use super::{GraphResources, ShadingPipelines, DEPTH_CLEAR};
use crate::backend::*;
use crate::render_graph::*;
use std::any::Any;

pub const GBUFFER_POSITION_FORMAT: TextureFormat = TextureFormat::Rgba32Float;
pub const GBUFFER_NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub const GBUFFER_ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub const GBUFFER_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Graph resources of the G-buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferTargets {
    pub position: ResourceId,
    pub normal: ResourceId,
    pub albedo: ResourceId,
    pub depth: ResourceId,
}

pub struct GBufferPass {
    pipeline: RenderPipelineHandle,
    scene_bind_group: BindGroupHandle,
    camera: ResourceId,
    targets: Option<GBufferTargets>,
}

impl GBufferPass {
    pub fn new(pipelines: &ShadingPipelines, resources: GraphResources) -> Self {
        Self {
            pipeline: pipelines.gbuffer,
            scene_bind_group: pipelines.scene.bind_group,
            camera: resources.camera,
            targets: None,
        }
    }

    /// Set once the pass has been added to a graph
    pub fn targets(&self) -> Option<GBufferTargets> {
        self.targets
    }
}

impl RenderPass for GBufferPass {
    fn name(&self) -> &str {
        "G-Buffer"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        let size = TextureSize::default();
        let targets = GBufferTargets {
            position: ctx.create_texture("gbuffer_position", size, GBUFFER_POSITION_FORMAT, usage),
            normal: ctx.create_texture("gbuffer_normal", size, GBUFFER_NORMAL_FORMAT, usage),
            albedo: ctx.create_texture("gbuffer_albedo", size, GBUFFER_ALBEDO_FORMAT, usage),
            depth: ctx.create_texture(
                "gbuffer_depth",
                size,
                GBUFFER_DEPTH_FORMAT,
                TextureUsage::RENDER_ATTACHMENT,
            ),
        };

        ctx.read(self.camera, ResourceUsage::UniformBuffer);
        ctx.write(targets.position, ResourceUsage::RenderTarget);
        ctx.write(targets.normal, ResourceUsage::RenderTarget);
        ctx.write(targets.albedo, ResourceUsage::RenderTarget);
        ctx.write(targets.depth, ResourceUsage::DepthStencilWrite);
        self.targets = Some(targets);
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        let Some(targets) = self.targets else {
            return;
        };
        let views = (
            ctx.get_texture(targets.position),
            ctx.get_texture(targets.normal),
            ctx.get_texture(targets.albedo),
            ctx.get_texture(targets.depth),
        );
        let (Some(position), Some(normal), Some(albedo), Some(depth)) = views else {
            log::warn!("G-buffer pass skipped: targets are not allocated");
            return;
        };

        let clear = |view| ColorAttachment {
            view,
            load_op: LoadOp::Clear([0.0; 4]),
            store_op: StoreOp::Store,
        };

        let backend = &mut *ctx.backend;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("G-Buffer".into()),
            color_attachments: vec![clear(position), clear(normal), clear(albedo)],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth,
                depth_load_op: LoadOp::Clear(DEPTH_CLEAR),
                depth_store_op: StoreOp::Store,
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
