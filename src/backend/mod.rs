//! Backend abstraction layer
//!
//! Provides the handle-based [`GraphicsBackend`] trait, a wgpu implementation,
//! and a recording implementation used by tests and tooling.

pub mod recording;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use recording::{RecordedCommand, RecordedPipeline, RecordingBackend};
pub use traits::*;
pub use types::*;
pub use wgpu_backend::WgpuBackend;
