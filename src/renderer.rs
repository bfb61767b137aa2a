//! Frame renderer over the render graph

use crate::backend::{BackendResult, GraphicsBackend};
use crate::pipeline::{build_graph, GraphResources, RendererKind, ShadingPipelines};
use crate::render_graph::{CompiledGraph, RenderGraph, RenderGraphExecutor};
use crate::stage::Stage;

/// Draws frames with either shading path.
///
/// Pipelines are created once. The graph, and with it the G-buffer and
/// depth textures, is rebuilt only when the output size or the renderer
/// kind changes.
pub struct ClusteredRenderer {
    kind: RendererKind,
    pipelines: ShadingPipelines,
    graph: RenderGraph,
    compiled: CompiledGraph,
    resources: GraphResources,
    executor: RenderGraphExecutor,
}

impl ClusteredRenderer {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        stage: &Stage,
        kind: RendererKind,
    ) -> BackendResult<Self> {
        let pipelines = ShadingPipelines::new(backend, stage, &stage.constants)?;
        let (width, height) = backend.surface_size();
        let (graph, compiled, resources, executor) =
            Self::assemble(backend, stage, &pipelines, kind, width, height)?;
        log::info!("Renderer: {} ({}x{})", kind, width, height);

        Ok(Self {
            kind,
            pipelines,
            graph,
            compiled,
            resources,
            executor,
        })
    }

    fn assemble(
        backend: &mut dyn GraphicsBackend,
        stage: &Stage,
        pipelines: &ShadingPipelines,
        kind: RendererKind,
        width: u32,
        height: u32,
    ) -> BackendResult<(RenderGraph, CompiledGraph, GraphResources, RenderGraphExecutor)> {
        let (mut graph, resources) = build_graph(kind, stage, pipelines, width, height);
        let compiled = graph.compile()?;
        let mut executor = RenderGraphExecutor::new();
        executor.allocate_resources(&mut graph, backend)?;
        Ok((graph, compiled, resources, executor))
    }

    /// Rebuild the graph for a new size or shading path. The camera aspect
    /// follows the size so the projection matches the cluster tiling.
    fn rebuild(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        stage: &mut Stage,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        stage.camera.set_aspect(width as f32, height as f32);
        self.executor.cleanup(backend);
        let (graph, compiled, resources, executor) =
            Self::assemble(backend, stage, &self.pipelines, self.kind, width, height)?;
        self.graph = graph;
        self.compiled = compiled;
        self.resources = resources;
        self.executor = executor;
        Ok(())
    }

    /// Write the camera, run clustering and the shading path, present.
    pub fn draw(&mut self, backend: &mut dyn GraphicsBackend, stage: &mut Stage) -> BackendResult<()> {
        let (width, height) = backend.surface_size();
        if self.graph.screen_size() != (width, height) {
            self.rebuild(backend, stage, width, height)?;
        }
        stage.update_camera(backend, width, height);

        let frame = backend.begin_frame()?;
        self.executor.set_external_view(self.resources.output, frame.output_view);
        let recorded = self
            .executor
            .execute(&self.graph, &self.compiled, backend, &stage.draw_list);
        backend.end_frame()?;
        recorded?;
        Ok(())
    }

    /// Switch shading path. A no-op when `kind` is already active.
    pub fn set_kind(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        stage: &mut Stage,
        kind: RendererKind,
    ) -> BackendResult<()> {
        if kind == self.kind {
            return Ok(());
        }
        self.kind = kind;
        let (width, height) = self.graph.screen_size();
        self.rebuild(backend, stage, width, height)?;
        log::info!("Renderer switched to {}", kind);
        Ok(())
    }

    /// Rebuild size-dependent resources if the size changed
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        stage: &mut Stage,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        if self.graph.screen_size() == (width, height) {
            return Ok(());
        }
        self.rebuild(backend, stage, width, height)
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn pipelines(&self) -> &ShadingPipelines {
        &self.pipelines
    }
}
