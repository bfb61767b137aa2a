//! Shading pipelines and render graph assembly
//!
//! Two renderers share one clustering pass and one lighting function:
//! - Forward: clustering, then geometry shaded directly into the output
//! - Deferred: clustering, G-buffer, then a fullscreen resolve

pub mod clustering_pass;
pub mod forward_pass;
pub mod gbuffer_pass;
pub mod resolve_pass;
pub mod scene_bindings;

pub use clustering_pass::ClusteringPass;
pub use forward_pass::ForwardPass;
pub use gbuffer_pass::{GBufferPass, GBufferTargets};
pub use resolve_pass::ResolvePass;
pub use scene_bindings::SceneBindings;

use crate::backend::*;
use crate::render_graph::*;
use crate::shaders::{compose, programs, ShaderConstants};
use crate::stage::Stage;
use std::fmt;
use std::str::FromStr;

/// Depth clear value, the far plane
pub(crate) const DEPTH_CLEAR: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Which shading path draws the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererKind {
    #[default]
    Forward,
    Deferred,
}

impl RendererKind {
    pub fn toggled(self) -> Self {
        match self {
            RendererKind::Forward => RendererKind::Deferred,
            RendererKind::Deferred => RendererKind::Forward,
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererKind::Forward => write!(f, "forward"),
            RendererKind::Deferred => write!(f, "deferred"),
        }
    }
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(RendererKind::Forward),
            "deferred" => Ok(RendererKind::Deferred),
            other => Err(format!("unknown renderer `{}`, expected forward or deferred", other)),
        }
    }
}

/// Graph ids of the buffers every graph imports, plus the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphResources {
    pub camera: ResourceId,
    pub lights: ResourceId,
    pub clusters: ResourceId,
    pub output: ResourceId,
}

/// Render pipelines of both shading paths. Built once; graphs are rebuilt
/// on resize and renderer switches, pipelines are not.
#[derive(Debug, Clone, Copy)]
pub struct ShadingPipelines {
    pub scene: SceneBindings,
    pub forward: RenderPipelineHandle,
    pub gbuffer: RenderPipelineHandle,
    pub resolve: RenderPipelineHandle,
    pub gbuffer_layout: BindGroupLayoutHandle,
}

impl ShadingPipelines {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        stage: &Stage,
        constants: &ShaderConstants,
    ) -> BackendResult<Self> {
        let scene = SceneBindings::new(
            backend,
            stage.camera_buffer.buffer(),
            stage.lights.buffer(),
            stage.clusters.cluster_buffer(),
        )?;
        let geometry_layouts = vec![
            scene.layout,
            stage.draw_list.model_layout(),
            stage.draw_list.material_layout(),
        ];
        let output_format = backend.output_format();
        let depth = Some(DepthStencilState {
            format: gbuffer_pass::GBUFFER_DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
        });

        let forward = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Forward Shading".into()),
            shader: compose(programs::FORWARD_PROGRAM, constants)?,
            fragment: true,
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: geometry_layouts.clone(),
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: depth.clone(),
            color_targets: vec![output_format.into()],
        })?;

        let gbuffer = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("G-Buffer".into()),
            shader: compose(programs::GBUFFER_PROGRAM, constants)?,
            fragment: true,
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: geometry_layouts,
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: depth,
            color_targets: vec![
                gbuffer_pass::GBUFFER_POSITION_FORMAT.into(),
                gbuffer_pass::GBUFFER_NORMAL_FORMAT.into(),
                gbuffer_pass::GBUFFER_ALBEDO_FORMAT.into(),
            ],
        })?;

        let unfilterable = BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: false },
        };
        let gbuffer_layout = backend.create_bind_group_layout(
            "G-Buffer Textures",
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: unfilterable.clone(),
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: unfilterable.clone(),
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: unfilterable,
                },
            ],
        )?;

        let resolve = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Deferred Resolve".into()),
            shader: compose(programs::RESOLVE_PROGRAM, constants)?,
            fragment: true,
            vertex_layouts: Vec::new(),
            bind_group_layouts: vec![scene.layout, gbuffer_layout],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![output_format.into()],
        })?;

        log::debug!("Created forward, G-buffer and resolve pipelines");
        Ok(Self {
            scene,
            forward,
            gbuffer,
            resolve,
            gbuffer_layout,
        })
    }
}

/// Assemble the graph for `kind`. The clustering pass is always added
/// first and is the only writer of the cluster buffer.
pub fn build_graph(
    kind: RendererKind,
    stage: &Stage,
    pipelines: &ShadingPipelines,
    width: u32,
    height: u32,
) -> (RenderGraph, GraphResources) {
    let mut graph = RenderGraph::new(width, height);
    let resources = GraphResources {
        output: graph.register_external("output"),
        camera: graph.import_buffer("camera"),
        lights: graph.import_buffer("lights"),
        clusters: graph.import_buffer("clusters"),
    };

    graph.add_pass(
        ClusteringPass::new(
            stage.clusters.dispatch(),
            resources.camera,
            resources.lights,
            resources.clusters,
        ),
        PassType::Compute,
    );

    match kind {
        RendererKind::Forward => {
            graph.add_pass(ForwardPass::new(pipelines, resources), PassType::Graphics);
        }
        RendererKind::Deferred => {
            let gbuffer = graph.add_pass(GBufferPass::new(pipelines, resources), PassType::Graphics);
            if let Some(targets) = graph.pass_as::<GBufferPass>(gbuffer).and_then(GBufferPass::targets) {
                graph.add_pass(ResolvePass::new(pipelines, resources, targets), PassType::Graphics);
            }
        }
    }

    (graph, resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_kind_parsing() {
        assert_eq!("forward".parse::<RendererKind>(), Ok(RendererKind::Forward));
        assert_eq!("Deferred".parse::<RendererKind>(), Ok(RendererKind::Deferred));
        assert!("tiled".parse::<RendererKind>().is_err());
        assert_eq!(RendererKind::Forward.toggled(), RendererKind::Deferred);
        assert_eq!(RendererKind::Deferred.to_string(), "deferred");
    }
}
