//! Clustered Shading - GPU clustered light assignment with forward and
//! deferred shading
//!
//! The view frustum is split into a grid of clusters (screen tiles times
//! logarithmic depth slices). Every frame a compute kernel lists, for each
//! cluster, the point lights whose spheres overlap it. Shading then walks
//! only that list for each pixel.
//!
//! # Features
//! - Light store with seeded colors and deterministic, GPU-driven motion
//! - Cluster grid math mirrored on the host for validation
//! - Forward and deferred renderers sharing one lighting function
//! - Render graph with deterministic pass ordering
//! - Non-blocking cluster readback for diagnostics
//! - Headless wgpu backend and a recording backend for tests

pub mod backend;
pub mod cluster;
pub mod engine;
pub mod lights;
pub mod pipeline;
pub mod render_graph;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shaders;
pub mod shading;
pub mod stage;

pub use backend::{BackendError, BackendResult, GraphicsBackend, RecordingBackend, WgpuBackend};
pub use cluster::{ClusterGridConfig, ClusterReadback, ClusterSnapshot, ClusterSummary};
pub use engine::Engine;
pub use lights::LightStoreConfig;
pub use pipeline::RendererKind;
pub use renderer::ClusteredRenderer;
pub use scene::{Camera, Projection, Scene};
pub use shading::ShadingConfig;

/// Configuration for initializing the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Shading path used for the first frame
    pub renderer: RendererKind,
    pub grid: ClusterGridConfig,
    pub lights: LightStoreConfig,
    pub shading: ShadingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Clustered Shading".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            renderer: RendererKind::Forward,
            grid: ClusterGridConfig::default(),
            lights: LightStoreConfig::default(),
            shading: ShadingConfig::default(),
        }
    }
}
