//! Main engine orchestrator

use crate::backend::{BackendError, BackendResult, GraphicsBackend, WgpuBackend};
use crate::cluster::ClusterReadback;
use crate::pipeline::RendererKind;
use crate::renderer::ClusteredRenderer;
use crate::scene::{Camera, Scene};
use crate::stage::Stage;
use crate::EngineConfig;
use std::sync::Arc;

/// Owns the backend, the shared GPU state and the renderer.
///
/// A frame is `advance_lights` followed by `draw`. Light motion is submitted
/// in its own batch, so the frame's clustering pass sees the moved lights.
pub struct Engine<B: GraphicsBackend = WgpuBackend> {
    backend: B,
    stage: Stage,
    renderer: ClusteredRenderer,
    config: EngineConfig,
}

impl Engine<WgpuBackend> {
    /// Create an engine drawing into `window`
    pub fn new(window: Arc<winit::window::Window>, config: EngineConfig, scene: &Scene) -> BackendResult<Self> {
        let backend = WgpuBackend::new(window, config.vsync)?;
        Self::from_backend(backend, config, scene)
    }
}

impl<B: GraphicsBackend> Engine<B> {
    pub fn from_backend(mut backend: B, config: EngineConfig, scene: &Scene) -> BackendResult<Self> {
        let stage = Stage::new(
            &mut backend,
            scene,
            config.grid,
            config.lights.clone(),
            config.shading.clone(),
        )?;
        let renderer = ClusteredRenderer::new(&mut backend, &stage, config.renderer)?;
        Ok(Self {
            backend,
            stage,
            renderer,
            config,
        })
    }

    /// Clamp and store the number of shaded lights. Returns the stored value.
    pub fn set_active_light_count(&mut self, count: u32) -> u32 {
        self.stage.lights.set_active_count(&mut self.backend, count)
    }

    pub fn active_light_count(&self) -> u32 {
        self.stage.lights.active_count()
    }

    /// Move the lights to their positions at `time` seconds
    pub fn advance_lights(&mut self, time: f32) {
        self.stage.lights.advance(&mut self.backend, time);
    }

    /// Render one frame. A lost surface skips the frame; the backend has
    /// already reconfigured it for the next one.
    pub fn draw(&mut self) -> BackendResult<()> {
        match self.renderer.draw(&mut self.backend, &mut self.stage) {
            Err(BackendError::SurfaceLost) => {
                log::warn!("Surface lost, skipping frame");
                Ok(())
            }
            other => other,
        }
    }

    pub fn set_renderer(&mut self, kind: RendererKind) -> BackendResult<()> {
        self.config.renderer = kind;
        self.renderer.set_kind(&mut self.backend, &mut self.stage, kind)
    }

    pub fn renderer_kind(&self) -> RendererKind {
        self.renderer.kind()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.backend.resize(width, height);
        let (width, height) = self.backend.surface_size();
        self.renderer.resize(&mut self.backend, &mut self.stage, width, height)
    }

    /// Start a non-blocking copy of the first `first_n` cluster records
    pub fn inspect_clusters(&mut self, first_n: u32) -> BackendResult<ClusterReadback> {
        self.stage.clusters.inspect(&mut self.backend, first_n)
    }

    /// Drive pending readbacks
    pub fn poll(&mut self, wait: bool) {
        self.backend.poll(wait);
    }

    pub fn camera(&self) -> &Camera {
        &self.stage.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.stage.camera
    }

    pub fn renderer(&self) -> &ClusteredRenderer {
        &self.renderer
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
